//! Zoom and pan mathematics.
//!
//! Three coordinate spaces are involved:
//! - **image space**: pixels of the loaded raster, where annotations live;
//! - **canvas space**: logical pixels of the drawing surface;
//! - **screen space**: host window coordinates; the canvas sits at some
//!   [`ScreenRect`] within it.
//!
//! `canvas = image * zoom + pan`. All operations return a new [`Viewport`].

use weldmark_canvas::CanvasTransform;

use crate::constants::zoom;
use crate::model::Point;

/// Zoom bounds and step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    /// Multiplier applied by zoom in/out.
    pub step: f32,
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: zoom::MIN,
            max: zoom::MAX,
            step: zoom::STEP,
        }
    }
}

/// On-screen rectangle of the canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether a screen point falls inside the rectangle.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Represents pan/zoom state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Viewport {
    pub fn new(zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        Self { zoom, pan_x, pan_y }
    }

    /// zoom=1, no pan.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    pub fn image_to_canvas(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan_x, p.y * self.zoom + self.pan_y)
    }

    /// Inverse of [`Viewport::image_to_canvas`]. Returns the origin for a zero zoom.
    pub fn canvas_to_image(&self, p: Point) -> Point {
        if self.zoom == 0.0 {
            return Point::default();
        }
        Point::new((p.x - self.pan_x) / self.zoom, (p.y - self.pan_y) / self.zoom)
    }

    /// Subtract the canvas origin from a screen position.
    pub fn screen_to_canvas(x: f32, y: f32, bounds: &ScreenRect) -> Point {
        Point::new(x - bounds.x, y - bounds.y)
    }

    pub fn screen_to_image(&self, x: f32, y: f32, bounds: &ScreenRect) -> Point {
        self.canvas_to_image(Self::screen_to_canvas(x, y, bounds))
    }

    /// Zoom keeping the image point under `anchor` (canvas space) fixed.
    ///
    /// The new zoom is clamped to `limits` first.
    pub fn zoom_about(&self, anchor: Point, new_zoom: f32, limits: &ZoomLimits) -> Viewport {
        let new_zoom = limits.clamp(new_zoom);
        let img = self.canvas_to_image(anchor);
        Viewport {
            zoom: new_zoom,
            pan_x: anchor.x - img.x * new_zoom,
            pan_y: anchor.y - img.y * new_zoom,
        }
    }

    /// Zoom in by one step about `anchor`.
    pub fn zoom_in(&self, anchor: Point, limits: &ZoomLimits) -> Viewport {
        self.zoom_about(anchor, self.zoom * limits.step, limits)
    }

    /// Zoom out by one step about `anchor`.
    pub fn zoom_out(&self, anchor: Point, limits: &ZoomLimits) -> Viewport {
        self.zoom_about(anchor, self.zoom / limits.step, limits)
    }

    /// Apply a pan delta.
    pub fn pan_by(&self, dx: f32, dy: f32) -> Viewport {
        Viewport::new(self.zoom, self.pan_x + dx, self.pan_y + dy)
    }

    /// Replace the pan offset.
    pub fn with_pan(&self, pan_x: f32, pan_y: f32) -> Viewport {
        Viewport::new(self.zoom, pan_x, pan_y)
    }

    /// Scale the image to `margin` of the canvas and center it.
    ///
    /// Returns `self` unchanged when any dimension is zero.
    pub fn fit(&self, image_size: (f32, f32), canvas_size: (f32, f32), margin: f32) -> Viewport {
        let (iw, ih) = image_size;
        let (cw, ch) = canvas_size;
        if iw <= 0.0 || ih <= 0.0 || cw <= 0.0 || ch <= 0.0 {
            return *self;
        }
        let zoom = (cw / iw).min(ch / ih) * margin;
        if !zoom.is_finite() || zoom <= 0.0 {
            return *self;
        }
        Viewport {
            zoom,
            pan_x: (cw - iw * zoom) / 2.0,
            pan_y: (ch - ih * zoom) / 2.0,
        }
    }

    /// Zoom rounded to an integer percentage.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round().max(0.0) as u32
    }

    /// Transform from image space to canvas space for draw commands.
    pub fn canvas_transform(&self) -> CanvasTransform {
        CanvasTransform::new(self.zoom, self.pan_x, self.pan_y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}

/// Parse a numeric zoom entry in percent into a zoom factor.
///
/// Accepts finite values in `(0, 1000]`; a trailing `%` is tolerated.
pub fn parse_zoom_percent(text: &str) -> Option<f32> {
    let value: f32 = text.trim().trim_end_matches('%').trim().parse().ok()?;
    if value.is_finite() && value > 0.0 && value <= zoom::MAX_PERCENT_INPUT {
        Some(value / 100.0)
    } else {
        None
    }
}
