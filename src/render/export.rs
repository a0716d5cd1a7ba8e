//! Annotated raster export.
//!
//! The raster covers the image plus everything drawn around it (polygons may
//! extend past the image, labels sit above their polygon), with a margin.

use web_time::Instant;
use weldmark_canvas::{CanvasTransform, Color, DrawCommand, ImageHandle, LabelFont, Surface};

use super::{LabelLayout, LabelStyle, Rect, polygon_body, polygon_label};
use crate::model::PolygonAnnotation;

/// Export settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportStyle {
    pub margin: f32,
    pub background: Color,
}

impl Default for ExportStyle {
    fn default() -> Self {
        Self {
            margin: crate::constants::export::MARGIN,
            background: Color::WHITE,
        }
    }
}

/// Integer pixel bounds of the exported raster, in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportBounds {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl ExportBounds {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(1) as u32
    }
}

/// Union of the image extent, the vertices and the label rectangles of the
/// complete polygons, grown by `margin` and snapped outward to whole pixels.
pub fn export_bounds(
    image_size: (u32, u32),
    polygons: &[PolygonAnnotation],
    font: &LabelFont,
    label_style: &LabelStyle,
    margin: f32,
) -> ExportBounds {
    let mut min = (0.0_f32, 0.0_f32);
    let mut max = (image_size.0 as f32, image_size.1 as f32);
    let mut include = |x: f32, y: f32| {
        min = (min.0.min(x), min.1.min(y));
        max = (max.0.max(x), max.1.max(y));
    };

    for polygon in polygons.iter().filter(|p| p.is_complete) {
        for p in &polygon.points {
            include(p.x, p.y);
        }
        if let Some(layout) = LabelLayout::compute(polygon, font, label_style, 1.0) {
            let Rect { x, y, .. } = layout.rect;
            include(x, y);
            include(layout.rect.right(), layout.rect.bottom());
        }
    }

    ExportBounds {
        min_x: (min.0 - margin).floor() as i64,
        min_y: (min.1 - margin).floor() as i64,
        max_x: (max.0 + margin).ceil() as i64,
        max_y: (max.1 + margin).ceil() as i64,
    }
}

/// Display list for the exported raster, in raster pixel space.
pub fn build_export(
    image: &ImageHandle,
    polygons: &[PolygonAnnotation],
    bounds: &ExportBounds,
    font: &LabelFont,
    label_style: &LabelStyle,
    background: Color,
) -> Vec<DrawCommand> {
    let transform = CanvasTransform::translate(-(bounds.min_x as f32), -(bounds.min_y as f32));
    let mut commands = vec![
        DrawCommand::Clear { color: background },
        DrawCommand::Image {
            handle: image.clone(),
            transform,
        },
    ];

    for polygon in polygons.iter().filter(|p| p.is_complete && !p.points.is_empty()) {
        commands.push(polygon_body(polygon, 1.0, transform));
        if let Some(label) = polygon_label(polygon, font, label_style, 1.0, transform) {
            commands.extend(label);
        }
    }
    commands
}

/// Render the annotated raster and encode it as PNG.
pub fn render_annotated_png(
    image: &ImageHandle,
    polygons: &[PolygonAnnotation],
    font: &LabelFont,
    label_style: &LabelStyle,
    style: &ExportStyle,
) -> weldmark_canvas::Result<Vec<u8>> {
    let start = Instant::now();
    let bounds = export_bounds(
        (image.width(), image.height()),
        polygons,
        font,
        label_style,
        style.margin,
    );
    let mut surface = Surface::with_pixel_size(bounds.width(), bounds.height())?;
    let commands = build_export(image, polygons, &bounds, font, label_style, style.background);
    surface.execute(&commands, font);
    let png = surface.encode_png()?;

    log::info!(
        "Exported annotated image {}x{} ({} polygons, {} bytes) in {:.1}ms",
        bounds.width(),
        bounds.height(),
        polygons.len(),
        png.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(png)
}
