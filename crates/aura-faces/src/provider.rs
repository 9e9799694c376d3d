use async_trait::async_trait;
use aura_core::models::{FaceDetection, FaceMatch};
use bytes::Bytes;

use crate::error::FaceProviderResult;

/// Where the provider should read an image from: a key in the configured
/// object-store bucket, or inline bytes.
#[derive(Clone, Debug)]
pub enum ImageSource {
    Key(String),
    Bytes(Bytes),
}

/// Detection and identity-collection operations of a face service.
///
/// `external_key` values are provider-minted, globally unique per collection
/// entry; they are what `face_identities.external_id` stores.
#[async_trait]
pub trait FaceProvider: Send + Sync {
    /// Detect faces with bounding boxes and head pose. Zero faces is an
    /// empty result, not an error.
    async fn detect_faces(&self, image: ImageSource) -> FaceProviderResult<Vec<FaceDetection>>;

    /// Search the collection for faces similar to the one in `image`.
    /// Returns up to `max_faces` matches at or above `threshold`, best first.
    async fn search_faces(
        &self,
        collection_id: &str,
        image: ImageSource,
        max_faces: i32,
        threshold: f32,
    ) -> FaceProviderResult<Vec<FaceMatch>>;

    /// Index the face in `image` into the collection under the caller's
    /// `external_ref` label. Returns the minted external key, or `None` when
    /// the provider found no indexable face in the image.
    async fn index_face(
        &self,
        collection_id: &str,
        image: ImageSource,
        external_ref: &str,
    ) -> FaceProviderResult<Option<String>>;

    /// Remove entries from the collection. An empty key list is a no-op.
    async fn delete_faces(
        &self,
        collection_id: &str,
        external_keys: &[String],
    ) -> FaceProviderResult<()>;

    /// All external keys currently indexed in the collection.
    async fn list_faces(&self, collection_id: &str) -> FaceProviderResult<Vec<String>>;

    /// Create the collection if it does not exist; already-exists is success.
    async fn ensure_collection(&self, collection_id: &str) -> FaceProviderResult<()>;
}
