use aura_core::AppError;
use thiserror::Error;

/// Errors from decode/encode work in this crate.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Blocking task failed: {0}")]
    TaskJoin(String),
}

/// Result type for processing operations
pub type ProcessingResult<T> = Result<T, ProcessingError>;

impl From<ProcessingError> for AppError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Image(e) => AppError::ImageProcessing(e.to_string()),
            ProcessingError::TaskJoin(msg) => AppError::Internal(msg),
        }
    }
}
