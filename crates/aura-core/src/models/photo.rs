use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata row for one stored photo.
///
/// Immutable once written except for `blur_data_url`, which starts out
/// nullable and may be backfilled later.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Photo {
    pub id: Uuid,
    pub album_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Pixel dimensions of the decoded upload, before orientation correction.
    pub width: i32,
    pub height: i32,
    pub uploaded_at: DateTime<Utc>,
    /// EXIF attributes as an opaque key-value map; values are coerced to
    /// display strings when extracted.
    pub exif: serde_json::Value,
    /// `data:image/jpeg;base64,...` preview for progressive loading.
    pub blur_data_url: Option<String>,
}

/// Fields for a new photo row; the id and upload timestamp are assigned by
/// the repository on insert.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub album_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub width: i32,
    pub height: i32,
    pub exif: serde_json::Value,
    pub blur_data_url: Option<String>,
}
