//! The owned raster render target.

use tiny_skia::{
    FillRule, FilterQuality, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
};

use crate::error::{CanvasError, Result};
use crate::{CanvasTransform, Color, DrawCommand, LabelFont, StrokeStyle};

/// A pixel surface sized in logical pixels and backed by
/// `logical * scale_factor` physical pixels.
///
/// The surface is the only place pixels are written. It is allocated on
/// creation, re-allocated on [`Surface::resize`] and released on drop.
#[derive(Debug)]
pub struct Surface {
    pixmap: Pixmap,
    logical_width: f32,
    logical_height: f32,
    scale_factor: f32,
}

impl Surface {
    /// Allocate a surface for a logical size and device pixel ratio.
    pub fn new(logical_width: f32, logical_height: f32, scale_factor: f32) -> Result<Self> {
        let scale_factor = sanitize_scale(scale_factor);
        let (width, height) = physical_size(logical_width, logical_height, scale_factor);
        let pixmap = Pixmap::new(width, height).ok_or(CanvasError::Allocation { width, height })?;

        log::debug!(
            "Allocated surface {}x{} (logical {:.1}x{:.1} @ {:.2}x)",
            width,
            height,
            logical_width,
            logical_height,
            scale_factor
        );

        Ok(Self {
            pixmap,
            logical_width: logical_width.max(0.0),
            logical_height: logical_height.max(0.0),
            scale_factor,
        })
    }

    /// Allocate a 1:1 surface with an exact pixel size.
    pub fn with_pixel_size(width: u32, height: u32) -> Result<Self> {
        Self::new(width as f32, height as f32, 1.0)
    }

    /// Re-allocate the backing store. Contents are discarded.
    pub fn resize(&mut self, logical_width: f32, logical_height: f32, scale_factor: f32) -> Result<()> {
        *self = Self::new(logical_width, logical_height, scale_factor)?;
        Ok(())
    }

    pub fn logical_size(&self) -> (f32, f32) {
        (self.logical_width, self.logical_height)
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    /// Physical width in pixels.
    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    /// Physical height in pixels.
    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Read back a pixel (straight alpha).
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let px = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(px.red(), px.green(), px.blue(), px.alpha()))
    }

    /// Execute a display list. Commands are in logical pixels; the device
    /// scale factor is applied here.
    pub fn execute(&mut self, commands: &[DrawCommand], font: &LabelFont) {
        for command in commands {
            self.execute_one(command, font);
        }
    }

    fn execute_one(&mut self, command: &DrawCommand, font: &LabelFont) {
        let scale_factor = self.scale_factor;
        let device = move |t: &CanvasTransform| t.then_scale(scale_factor);

        match command {
            DrawCommand::Clear { color } => {
                self.pixmap.fill(color.to_skia());
            }
            DrawCommand::Image { handle, transform } => {
                let paint = PixmapPaint {
                    quality: FilterQuality::Bilinear,
                    ..PixmapPaint::default()
                };
                let ts = device(transform).to_skia();
                self.pixmap
                    .draw_pixmap(0, 0, handle.pixmap().as_ref(), &paint, ts, None);
            }
            DrawCommand::Path {
                points,
                closed,
                fill,
                stroke,
                transform,
            } => {
                let Some(path) = build_path(points, *closed) else {
                    return;
                };
                let ts = device(transform).to_skia();
                if let Some(color) = fill {
                    self.pixmap
                        .fill_path(&path, &solid(*color), FillRule::EvenOdd, ts, None);
                }
                if let Some(style) = stroke {
                    self.pixmap
                        .stroke_path(&path, &solid(style.color), &stroke_of(style), ts, None);
                }
            }
            DrawCommand::Circle {
                center,
                radius,
                fill,
                stroke,
                transform,
            } => {
                let Some(path) = PathBuilder::from_circle(center.0, center.1, *radius) else {
                    return;
                };
                let ts = device(transform).to_skia();
                if let Some(color) = fill {
                    self.pixmap
                        .fill_path(&path, &solid(*color), FillRule::Winding, ts, None);
                }
                if let Some(style) = stroke {
                    self.pixmap
                        .stroke_path(&path, &solid(style.color), &stroke_of(style), ts, None);
                }
            }
            DrawCommand::Line {
                from,
                to,
                stroke,
                transform,
            } => {
                let Some(path) = build_path(&[*from, *to], false) else {
                    return;
                };
                let ts = device(transform).to_skia();
                self.pixmap
                    .stroke_path(&path, &solid(stroke.color), &stroke_of(stroke), ts, None);
            }
            DrawCommand::FillRect {
                x,
                y,
                width,
                height,
                color,
                transform,
            } => {
                let Some(rect) = Rect::from_xywh(*x, *y, *width, *height) else {
                    return;
                };
                let ts = device(transform).to_skia();
                self.pixmap.fill_rect(rect, &solid(*color), ts, None);
            }
            DrawCommand::Text {
                text,
                position,
                size,
                color,
                align,
                transform,
            } => {
                let t = device(transform);
                let anchor = t.apply(position.0, position.1);
                font.draw(&mut self.pixmap, text, anchor, size * t.scale, *color, *align);
            }
        }
    }

    /// Encode the current contents as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| CanvasError::Encode(e.to_string()))
    }
}

fn sanitize_scale(scale_factor: f32) -> f32 {
    if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    }
}

fn physical_size(logical_width: f32, logical_height: f32, scale_factor: f32) -> (u32, u32) {
    let dim = |v: f32| {
        let px = (v * scale_factor).round();
        if px.is_finite() && px >= 1.0 {
            px as u32
        } else {
            1
        }
    };
    (dim(logical_width), dim(logical_height))
}

fn build_path(points: &[(f32, f32)], closed: bool) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.0, first.1);
    for p in rest {
        pb.line_to(p.0, p.1);
    }
    if closed {
        pb.close();
    }
    pb.finish()
}

fn solid(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

fn stroke_of(style: &StrokeStyle) -> Stroke {
    Stroke {
        width: style.width,
        line_join: LineJoin::Round,
        ..Stroke::default()
    }
}
