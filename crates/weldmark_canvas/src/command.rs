use crate::{Color, ImageHandle};

/// Uniform scale followed by a translation: `out = in * scale + (tx, ty)`.
///
/// This is the only kind of transform the annotation view needs (zoom + pan,
/// optionally followed by the device pixel ratio).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasTransform {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
}

impl CanvasTransform {
    pub const IDENTITY: CanvasTransform = CanvasTransform {
        scale: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(scale: f32, tx: f32, ty: f32) -> Self {
        Self { scale, tx, ty }
    }

    /// Pure translation.
    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, tx, ty)
    }

    /// Map a point through the transform.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.tx, y * self.scale + self.ty)
    }

    /// Apply an additional uniform scale after this transform.
    pub fn then_scale(&self, factor: f32) -> Self {
        Self::new(self.scale * factor, self.tx * factor, self.ty * factor)
    }

    pub(crate) fn to_skia(self) -> tiny_skia::Transform {
        tiny_skia::Transform::from_row(self.scale, 0.0, 0.0, self.scale, self.tx, self.ty)
    }
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Outline color and width, in the coordinate units of the command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
}

impl StrokeStyle {
    pub fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// Horizontal anchoring of text relative to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

/// A draw command to be executed by a [`crate::Surface`].
///
/// Geometry is expressed in the command's own space; `transform` maps it to
/// logical canvas pixels. Widths, radii and font sizes are in the same space
/// as the geometry, so callers drawing in image space divide them by zoom to
/// keep them constant on screen.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Fill the whole surface, ignoring transforms.
    Clear { color: Color },
    /// Draw an image with its top-left corner at the origin.
    Image {
        handle: ImageHandle,
        transform: CanvasTransform,
    },
    /// A polyline, optionally closed, filled and/or stroked.
    Path {
        points: Vec<(f32, f32)>,
        closed: bool,
        fill: Option<Color>,
        stroke: Option<StrokeStyle>,
        transform: CanvasTransform,
    },
    Circle {
        center: (f32, f32),
        radius: f32,
        fill: Option<Color>,
        stroke: Option<StrokeStyle>,
        transform: CanvasTransform,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        stroke: StrokeStyle,
        transform: CanvasTransform,
    },
    FillRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
        transform: CanvasTransform,
    },
    /// Single-line text; `position` is the baseline anchor.
    Text {
        text: String,
        position: (f32, f32),
        size: f32,
        color: Color,
        align: TextAlign,
        transform: CanvasTransform,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply() {
        let t = CanvasTransform::new(2.0, 10.0, -5.0);
        assert_eq!(t.apply(3.0, 4.0), (16.0, 3.0));
    }

    #[test]
    fn test_then_scale_composes_device_ratio() {
        let t = CanvasTransform::new(0.5, 20.0, 30.0).then_scale(2.0);
        assert_eq!(t, CanvasTransform::new(1.0, 40.0, 60.0));
        // (8, 8) -> logical (24, 34) -> device (48, 68)
        assert_eq!(t.apply(8.0, 8.0), (48.0, 68.0));
    }

    #[test]
    fn test_identity_default() {
        assert_eq!(CanvasTransform::default(), CanvasTransform::IDENTITY);
        assert_eq!(CanvasTransform::translate(3.0, 4.0).apply(1.0, 1.0), (4.0, 5.0));
    }
}
