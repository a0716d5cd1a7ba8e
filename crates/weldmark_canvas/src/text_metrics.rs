//! Text measurement and glyph rasterization.
//!
//! Labels are measured for layout (label boxes, export bounds) and then drawn
//! with the same font, so the two always agree. DejaVu Sans is bundled so
//! label text renders the same on every host; a configured font file can
//! replace it.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};
use tiny_skia::{Pixmap, PremultipliedColorU8};

use crate::error::{CanvasError, Result};
use crate::{Color, TextAlign};

/// Bundled label font (DejaVu Sans, covers Latin and Cyrillic).
pub const BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// The font used for polygon labels.
#[derive(Clone, Debug)]
pub struct LabelFont {
    font: FontArc,
}

impl LabelFont {
    /// Parse a TrueType/OpenType font from bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        FontArc::try_from_vec(bytes)
            .map(|font| Self { font })
            .map_err(|e| CanvasError::Font(e.to_string()))
    }

    /// The bundled font.
    pub fn bundled() -> Result<Self> {
        FontArc::try_from_slice(BUNDLED_FONT)
            .map(|font| Self { font })
            .map_err(|e| CanvasError::Font(e.to_string()))
    }

    /// Use the first configured font file that parses, else the bundled font.
    pub fn load(overrides: &[PathBuf]) -> Result<Self> {
        for path in overrides {
            match Self::load_file(path) {
                Ok(font) => {
                    log::info!("Loaded label font from {:?}", path);
                    return Ok(font);
                }
                Err(e) => log::warn!("Skipping label font {:?}: {}", path, e),
            }
        }
        log::debug!("Using bundled label font");
        Self::bundled()
    }

    fn load_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| CanvasError::Font(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    /// Advance width of `text` at `size` pixels.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        let mut width = 0.0;
        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                width += scaled.kern(p, id);
            }
            width += scaled.h_advance(id);
            prev = Some(id);
        }
        width
    }

    /// Rasterize `text` with its baseline at `(x, y)` in device pixels.
    pub(crate) fn draw(
        &self,
        pixmap: &mut Pixmap,
        text: &str,
        (x, y): (f32, f32),
        size: f32,
        color: Color,
        align: TextAlign,
    ) {
        let font = &self.font;
        if size <= 0.0 || text.is_empty() {
            return;
        }

        let scale = PxScale::from(size);
        let scaled = font.as_scaled(scale);
        let mut caret = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - self.measure(text, size) / 2.0,
        };

        let width = pixmap.width() as i32;
        let height = pixmap.height() as i32;
        let pixels = pixmap.pixels_mut();

        let mut prev: Option<GlyphId> = None;
        for c in text.chars() {
            let id = scaled.glyph_id(c);
            if let Some(p) = prev {
                caret += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(scale, ab_glyph::point(caret, y));
            caret += scaled.h_advance(id);
            prev = Some(id);

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px < 0 || py < 0 || px >= width || py >= height {
                    return;
                }
                let idx = (py * width + px) as usize;
                if let Some(blended) = blend_over(pixels[idx], color, coverage) {
                    pixels[idx] = blended;
                }
            });
        }
    }
}

/// Source-over blend of `color` at `coverage` onto a premultiplied pixel.
fn blend_over(dst: PremultipliedColorU8, color: Color, coverage: f32) -> Option<PremultipliedColorU8> {
    let alpha = (color.a as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return None;
    }
    let inv = 1.0 - alpha;
    let mix = |src: u8, dst: u8| (src as f32 * alpha + dst as f32 * inv).round() as u8;
    PremultipliedColorU8::from_rgba(
        mix(color.r, dst.red()),
        mix(color.g, dst.green()),
        mix(color.b, dst.blue()),
        (255.0 * alpha + dst.alpha() as f32 * inv).round() as u8,
    )
}
