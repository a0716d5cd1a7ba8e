use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("Cannot allocate a {width}x{height} surface")]
    Allocation { width: u32, height: u32 },

    #[error("Image data size mismatch: expected {expected} bytes, got {actual}")]
    ImageSize { expected: usize, actual: usize },

    #[error("Failed to parse font: {0}")]
    Font(String),

    #[error("PNG encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, CanvasError>;
