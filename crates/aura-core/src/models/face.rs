use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One distinct person recognized across the library.
///
/// `external_id` is the identifier the face provider indexed the canonical
/// face under; the promoted thumbnail lives at `faces/{external_id}.jpg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FaceIdentity {
    pub id: Uuid,
    /// Display name, unset until a user labels the identity.
    pub name: Option<String>,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

/// Association between a photo and a resolved face identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PhotoFaceLink {
    pub id: Uuid,
    pub photo_id: Uuid,
    pub face_external_id: String,
    pub album_id: Uuid,
}

/// Axis-aligned face box with coordinates relative to image dimensions,
/// in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Head rotation angles in degrees as reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    pub yaw: f32,
    pub pitch: f32,
}

/// A single detected face within an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bounding_box: BoundingBox,
    pub pose: HeadPose,
    pub confidence: Option<f32>,
}

/// A search hit against the face collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub external_id: String,
    pub similarity: f32,
}
