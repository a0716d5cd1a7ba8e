//! Rendering of annotations into draw commands.
//!
//! - [`live`]: the interactive frame on the owned surface
//! - [`export`]: the annotated raster at image resolution
//! - [`report`]: the tabular region report
//!
//! Polygons and labels are emitted by the same helpers for the live view and
//! the export, so both agree on geometry. Sizes are given in screen pixels and
//! divided by the scale of the target space.

pub mod export;
pub mod live;
pub mod report;

use weldmark_canvas::{CanvasTransform, Color, DrawCommand, LabelFont, StrokeStyle, TextAlign};

use crate::constants::{label, overlay};
use crate::model::PolygonAnnotation;

/// Label box geometry in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    pub padding: f32,
    /// Gap between the top-most vertex and the label baseline area.
    pub offset: f32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: label::FONT_SIZE,
            padding: label::PADDING,
            offset: label::OFFSET,
        }
    }
}

/// Axis-aligned rectangle in image space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Placement of a polygon label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    /// Background rectangle.
    pub rect: Rect,
    /// Baseline anchor of the centered text.
    pub baseline: (f32, f32),
    pub font_size: f32,
}

impl LabelLayout {
    /// Lay out the label of `polygon` for a target space drawn at `scale`
    /// screen pixels per image pixel.
    ///
    /// The label is centered on the vertex centroid and sits above the
    /// top-most vertex. Returns `None` for empty labels or polygons.
    pub fn compute(
        polygon: &PolygonAnnotation,
        font: &LabelFont,
        style: &LabelStyle,
        scale: f32,
    ) -> Option<Self> {
        if polygon.label.is_empty() || scale <= 0.0 {
            return None;
        }
        let center_x = polygon.vertex_centroid()?.x;
        let top = polygon.top()?;

        let font_size = style.font_size / scale;
        let padding = style.padding / scale;
        let label_y = top - style.offset / scale;
        let text_width = font.measure(&polygon.label, font_size);

        Some(Self {
            rect: Rect {
                x: center_x - text_width / 2.0 - padding,
                y: label_y - font_size - padding,
                width: text_width + padding * 2.0,
                height: font_size + padding * 2.0,
            },
            baseline: (center_x, label_y - padding),
            font_size,
        })
    }

    fn commands(&self, text: &str, color: Color, transform: CanvasTransform) -> [DrawCommand; 2] {
        [
            DrawCommand::FillRect {
                x: self.rect.x,
                y: self.rect.y,
                width: self.rect.width,
                height: self.rect.height,
                color,
                transform,
            },
            DrawCommand::Text {
                text: text.to_string(),
                position: self.baseline,
                size: self.font_size,
                color: Color::WHITE,
                align: TextAlign::Center,
                transform,
            },
        ]
    }
}

/// Filled and outlined closed polygon.
pub(crate) fn polygon_body(
    polygon: &PolygonAnnotation,
    scale: f32,
    transform: CanvasTransform,
) -> DrawCommand {
    DrawCommand::Path {
        points: polygon.points.iter().map(|p| (p.x, p.y)).collect(),
        closed: true,
        fill: Some(polygon.color.with_alpha(overlay::FILL_ALPHA)),
        stroke: Some(StrokeStyle::new(polygon.color, overlay::STROKE_WIDTH / scale)),
        transform,
    }
}

/// Label background and text, if the polygon has a label.
pub(crate) fn polygon_label(
    polygon: &PolygonAnnotation,
    font: &LabelFont,
    style: &LabelStyle,
    scale: f32,
    transform: CanvasTransform,
) -> Option<[DrawCommand; 2]> {
    LabelLayout::compute(polygon, font, style, scale)
        .map(|layout| layout.commands(&polygon.label, polygon.color, transform))
}
