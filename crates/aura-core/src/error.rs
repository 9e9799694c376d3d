//! Error types module
//!
//! All failures in the pipeline are unified under the `AppError` enum:
//! database, storage, face-provider, and image-processing errors each keep a
//! distinguishable kind so callers can react (retry transient upstream
//! failures, surface "still referenced" on refused deletes, treat not-found
//! separately from real faults).
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Postgres error code for foreign_key_violation.
#[cfg(feature = "sqlx")]
const PG_FOREIGN_KEY_VIOLATION: &str = "23503";
/// Postgres error code for unique_violation.
#[cfg(feature = "sqlx")]
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// A collaborator (face provider, object store) could not be reached or
    /// refused service transiently. Callers may retry; the core never does.
    #[error("Upstream unavailable: {0}")]
    Upstream(String),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A delete was refused because rows elsewhere still reference the
    /// target. The deletion transaction has been rolled back.
    #[error("Cannot delete data that is still referenced: {0}")]
    StillReferenced(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        if matches!(err, SqlxError::RowNotFound) {
            return AppError::NotFound("row not found".to_string());
        }
        if let SqlxError::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(PG_FOREIGN_KEY_VIOLATION) => {
                    return AppError::StillReferenced(db_err.to_string());
                }
                Some(PG_UNIQUE_VIOLATION) => {
                    return AppError::Conflict(db_err.to_string());
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl AppError {
    /// Get the error type name for structured logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::Upstream(_) => "Upstream",
            AppError::ImageProcessing(_) => "ImageProcessing",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::StillReferenced(_) => "StillReferenced",
            AppError::Config(_) => "Config",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Whether a retry at the caller's discretion could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Storage(_) | AppError::Upstream(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = AppError::from(SqlxError::RowNotFound);
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(!err.is_transient());
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_pool_closed_maps_to_database() {
        let err = AppError::from(SqlxError::PoolClosed);
        assert!(matches!(err, AppError::Database(_)));
        assert_eq!(err.error_type(), "Database");
        assert!(err.is_transient());
    }

    #[test]
    fn test_upstream_is_transient() {
        let err = AppError::Upstream("rekognition timed out".to_string());
        assert!(err.is_transient());
        assert_eq!(err.error_type(), "Upstream");
    }

    #[test]
    fn test_still_referenced_message() {
        let err = AppError::StillReferenced("photo_faces".to_string());
        assert!(err.to_string().contains("still referenced"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_io_error_maps_to_internal() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk on fire");
        let err = AppError::from(io_err);
        assert!(matches!(err, AppError::Internal(_)));
    }
}
