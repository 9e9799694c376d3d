//! Shared key generation for storage backends.
//!
//! All object keys are derived here so backends, services, and the face
//! resolver agree on one layout.

use uuid::Uuid;

/// Key of an uploaded original: `{album_slug}/{filename}`.
pub fn original_key(album_slug: &str, filename: &str) -> String {
    format!("{}/{}", album_slug, filename)
}

/// Key of the compressed derivative: `{album_slug}/compressed/{filename}`.
pub fn compressed_key(album_slug: &str, filename: &str) -> String {
    format!("{}/compressed/{}", album_slug, filename)
}

/// Key of a promoted face thumbnail: `faces/{external_key}.jpg`.
///
/// Addressed by identity, so every photo the same person appears in shares
/// one thumbnail object.
pub fn face_thumbnail_key(external_key: &str) -> String {
    format!("faces/{}.jpg", external_key)
}

/// Key of a transient face crop awaiting identity resolution:
/// `temp_faces/{photo_id}_{index}.jpg`.
pub fn temp_face_key(photo_id: Uuid, index: usize) -> String {
    format!("temp_faces/{}_{}.jpg", photo_id, index)
}
