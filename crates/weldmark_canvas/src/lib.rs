//! weldmark_canvas - raster render target for the weldmark annotation engine
//!
//! This crate owns pixels and glyphs. Callers describe a frame as a list of
//! [`DrawCommand`]s and hand it to a [`Surface`], which rasterizes it with
//! tiny-skia. Text is measured and drawn with the same [`LabelFont`] so label
//! boxes computed by callers match what ends up on screen.

mod color;
mod command;
mod error;
mod image;
mod surface;
mod text_metrics;

pub use color::Color;
pub use command::{CanvasTransform, DrawCommand, StrokeStyle, TextAlign};
pub use error::{CanvasError, Result};
pub use image::ImageHandle;
pub use surface::Surface;
pub use text_metrics::{BUNDLED_FONT, LabelFont};
