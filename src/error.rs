//! Engine error type.

use thiserror::Error;

use crate::ingest::IngestError;
use crate::render::report::ReportError;

/// Errors surfaced at the engine boundary.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The image could not be decoded
    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Surface allocation or PNG encoding failed
    #[error("Canvas error: {0}")]
    Canvas(#[from] weldmark_canvas::CanvasError),

    /// Inference results could not be read
    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    /// The region report could not be written
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// I/O error when reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
