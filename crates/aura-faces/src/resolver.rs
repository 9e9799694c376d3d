//! Face identity resolution: turning frontal crops into stable identities.
//!
//! Each crop is staged as a temp object, searched against the collection,
//! and either reattached to the matching identity or indexed as a new one.
//! Every resolved crop is then promoted to the identity's shared thumbnail
//! key, so the newest sighting of a person refreshes their thumbnail.

use std::sync::Arc;

use aura_core::{models::PhotoFaceLink, AppError, FaceSettings};
use aura_db::FaceStore;
use aura_processing::FaceCrop;
use aura_storage::{keys, ObjectStorage};
use uuid::Uuid;

use crate::error::{FaceProviderError, FaceProviderResult};
use crate::provider::{FaceProvider, ImageSource};

/// A crop that resolved to an identity and was linked to its photo.
#[derive(Debug, Clone)]
pub struct ResolvedFace {
    pub external_id: String,
    /// True when the crop matched an existing identity rather than minting
    /// a new one.
    pub matched: bool,
    pub link: PhotoFaceLink,
}

enum Resolution {
    Matched(String),
    Indexed(String),
    NoFace,
}

pub struct FaceIdentityResolver {
    provider: Arc<dyn FaceProvider>,
    storage: Arc<dyn ObjectStorage>,
    faces: Arc<dyn FaceStore>,
    collection_id: String,
    settings: FaceSettings,
}

impl FaceIdentityResolver {
    pub fn new(
        provider: Arc<dyn FaceProvider>,
        storage: Arc<dyn ObjectStorage>,
        faces: Arc<dyn FaceStore>,
        collection_id: String,
        settings: FaceSettings,
    ) -> Self {
        Self {
            provider,
            storage,
            faces,
            collection_id,
            settings,
        }
    }

    /// Resolve every crop of one photo. Crops the provider rejects or finds
    /// no face in are skipped; provider outages abort the batch.
    #[tracing::instrument(skip(self, crops), fields(photo_id = %photo_id, crops = crops.len()))]
    pub async fn resolve_crops(
        &self,
        photo_id: Uuid,
        album_id: Uuid,
        crops: &[FaceCrop],
    ) -> Result<Vec<ResolvedFace>, AppError> {
        let mut resolved = Vec::new();

        for crop in crops {
            if let Some(face) = self.resolve_one(photo_id, album_id, crop).await? {
                resolved.push(face);
            }
        }

        if !resolved.is_empty() {
            let matched = resolved.iter().filter(|face| face.matched).count();
            tracing::info!(
                resolved = resolved.len(),
                matched,
                indexed = resolved.len() - matched,
                "Resolved face identities"
            );
        }

        Ok(resolved)
    }

    async fn resolve_one(
        &self,
        photo_id: Uuid,
        album_id: Uuid,
        crop: &FaceCrop,
    ) -> Result<Option<ResolvedFace>, AppError> {
        let temp_key = keys::temp_face_key(photo_id, crop.index);
        self.storage
            .put(&temp_key, crop.jpeg.clone(), "image/jpeg")
            .await
            .map_err(AppError::from)?;

        let (external_id, matched) = match self.classify_crop(photo_id, &temp_key, crop.index).await
        {
            Ok(Resolution::Matched(external_id)) => (external_id, true),
            Ok(Resolution::Indexed(external_id)) => (external_id, false),
            Ok(Resolution::NoFace) => {
                tracing::debug!(
                    photo_id = %photo_id,
                    index = crop.index,
                    "Provider found no indexable face in crop"
                );
                self.discard_temp(&temp_key).await;
                return Ok(None);
            }
            Err(FaceProviderError::InvalidImage(reason)) => {
                tracing::warn!(
                    photo_id = %photo_id,
                    index = crop.index,
                    reason,
                    "Provider rejected face crop, skipping"
                );
                self.discard_temp(&temp_key).await;
                return Ok(None);
            }
            Err(err) => {
                self.discard_temp(&temp_key).await;
                return Err(err.into());
            }
        };

        // Promote on every sighting: the thumbnail key is addressed by
        // identity, and the latest crop replaces whatever was there.
        let thumbnail_key = keys::face_thumbnail_key(&external_id);
        self.storage
            .copy(&temp_key, &thumbnail_key)
            .await
            .map_err(AppError::from)?;
        self.discard_temp(&temp_key).await;

        self.faces.upsert_identity(&external_id).await?;
        let link = self
            .faces
            .insert_link(photo_id, &external_id, album_id)
            .await?;

        Ok(Some(ResolvedFace {
            external_id,
            matched,
            link,
        }))
    }

    /// Search-then-index against the collection, reading the staged temp
    /// object by key.
    async fn classify_crop(
        &self,
        photo_id: Uuid,
        temp_key: &str,
        index: usize,
    ) -> FaceProviderResult<Resolution> {
        let matches = self
            .provider
            .search_faces(
                &self.collection_id,
                ImageSource::Key(temp_key.to_string()),
                1,
                self.settings.match_threshold,
            )
            .await?;

        if let Some(hit) = matches.first() {
            tracing::debug!(
                external_id = %hit.external_id,
                similarity = hit.similarity,
                "Face matched existing identity"
            );
            return Ok(Resolution::Matched(hit.external_id.clone()));
        }

        let external_ref = format!("{}_{}", photo_id, index);
        match self
            .provider
            .index_face(
                &self.collection_id,
                ImageSource::Key(temp_key.to_string()),
                &external_ref,
            )
            .await?
        {
            Some(external_id) => Ok(Resolution::Indexed(external_id)),
            None => Ok(Resolution::NoFace),
        }
    }

    /// Temp crops are transient; a failed delete only leaks one small object.
    async fn discard_temp(&self, temp_key: &str) {
        if let Err(err) = self.storage.delete(temp_key).await {
            tracing::warn!(key = temp_key, error = %err, "Failed to delete temp face crop");
        }
    }
}
