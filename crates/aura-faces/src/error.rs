use aura_core::AppError;
use thiserror::Error;

/// Errors from the face provider adapter.
#[derive(Debug, Clone, Error)]
pub enum FaceProviderError {
    /// The provider rejected the supplied image: unsupported format, or no
    /// detectable face in it. Recoverable per face.
    #[error("Provider rejected image: {0}")]
    InvalidImage(String),

    #[error("Face collection not found: {0}")]
    CollectionNotFound(String),

    /// Transport or service failure; retrying later could succeed.
    #[error("Face provider unavailable: {0}")]
    Unavailable(String),
}

/// Result type for face provider operations
pub type FaceProviderResult<T> = Result<T, FaceProviderError>;

// Orphan rule: FaceProviderError is local, so the bridge into AppError
// lives here.
impl From<FaceProviderError> for AppError {
    fn from(err: FaceProviderError) -> Self {
        match err {
            FaceProviderError::InvalidImage(msg) => AppError::InvalidInput(msg),
            FaceProviderError::CollectionNotFound(msg) => AppError::NotFound(msg),
            FaceProviderError::Unavailable(msg) => AppError::Upstream(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_bridges_to_upstream() {
        let err = AppError::from(FaceProviderError::Unavailable("throttled".to_string()));
        assert!(matches!(err, AppError::Upstream(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_invalid_image_is_not_transient() {
        let err = AppError::from(FaceProviderError::InvalidImage("no face".to_string()));
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(!err.is_transient());
    }
}
