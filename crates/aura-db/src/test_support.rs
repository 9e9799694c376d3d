//! In-memory store doubles for tests.
//!
//! `MemoryStore` implements all four store traits over one shared state and
//! mirrors the visible semantics of the Postgres repositories: counter
//! updates ride along with photo writes, identity upserts are
//! insert-or-ignore, and the cascades garbage-collect identities that lost
//! their last link.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use aura_core::{
    models::{
        Album, AlbumPermission, AlbumResolution, FaceIdentity, NewAlbum, NewPhoto, Photo,
        PhotoFaceLink,
    },
    AppError,
};
use chrono::Utc;
use uuid::Uuid;

use crate::stores::{
    AlbumCascade, AlbumStore, BlurBackfillRow, FaceStore, PermissionStore, PhotoCascade,
    PhotoStore,
};

#[derive(Default)]
struct MemoryState {
    albums: Vec<Album>,
    photos: Vec<Photo>,
    links: Vec<PhotoFaceLink>,
    identities: Vec<FaceIdentity>,
    permissions: Vec<AlbumPermission>,
}

impl MemoryState {
    fn remove_orphaned_identities(&mut self, candidate_keys: &[String]) -> Vec<String> {
        let mut orphaned = Vec::new();
        for key in candidate_keys {
            if self.links.iter().any(|l| &l.face_external_id == key) {
                continue;
            }
            if let Some(pos) = self.identities.iter().position(|i| &i.external_id == key) {
                self.identities.remove(pos);
                orphaned.push(key.clone());
            }
        }
        orphaned
    }
}

/// In-memory metadata store for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an album by slug (for test assertions)
    pub fn album_by_slug(&self, slug: &str) -> Option<Album> {
        self.state
            .lock()
            .unwrap()
            .albums
            .iter()
            .find(|a| a.slug == slug)
            .cloned()
    }

    /// Snapshot of all photo rows (for test assertions)
    pub fn photos(&self) -> Vec<Photo> {
        self.state.lock().unwrap().photos.clone()
    }

    /// Snapshot of all identity rows (for test assertions)
    pub fn identities(&self) -> Vec<FaceIdentity> {
        self.state.lock().unwrap().identities.clone()
    }

    /// Snapshot of all link rows (for test assertions)
    pub fn links(&self) -> Vec<PhotoFaceLink> {
        self.state.lock().unwrap().links.clone()
    }

    /// Check whether a permission row exists (for test assertions)
    pub fn has_permission(&self, user_id: Uuid, album_id: Uuid) -> bool {
        self.state
            .lock()
            .unwrap()
            .permissions
            .iter()
            .any(|p| p.user_id == user_id && p.album_id == album_id)
    }
}

#[async_trait]
impl AlbumStore for MemoryStore {
    async fn resolve_for_upload(&self, new_album: NewAlbum) -> Result<AlbumResolution, AppError> {
        let mut state = self.state.lock().unwrap();

        if let Some(existing) = state.albums.iter().find(|a| a.slug == new_album.slug) {
            return Ok(AlbumResolution::Found(existing.clone()));
        }

        let album = Album {
            id: Uuid::new_v4(),
            name: new_album.name,
            slug: new_album.slug,
            location: new_album.location,
            created_at: Utc::now(),
            image_count: 0,
            shared: new_album.shared,
            public_upload: new_album.public_upload,
            secret: new_album.secret,
            face_detection: new_album.face_detection,
        };
        state.albums.push(album.clone());
        Ok(AlbumResolution::Created(album))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Album>, AppError> {
        Ok(self.album_by_slug(slug))
    }

    async fn delete_album_cascade(&self, slug: &str) -> Result<AlbumCascade, AppError> {
        let mut state = self.state.lock().unwrap();

        let album = state
            .albums
            .iter()
            .find(|a| a.slug == slug)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Album not found: {}", slug)))?;

        let mut linked_keys: Vec<String> = state
            .links
            .iter()
            .filter(|l| l.album_id == album.id)
            .map(|l| l.face_external_id.clone())
            .collect();
        linked_keys.sort();
        linked_keys.dedup();

        state.links.retain(|l| l.album_id != album.id);
        let orphaned_face_keys = state.remove_orphaned_identities(&linked_keys);

        state.permissions.retain(|p| p.album_id != album.id);

        let mut photo_filenames: Vec<String> = state
            .photos
            .iter()
            .filter(|p| p.album_id == album.id)
            .map(|p| p.filename.clone())
            .collect();
        photo_filenames.sort();

        state.photos.retain(|p| p.album_id != album.id);
        state.albums.retain(|a| a.id != album.id);

        Ok(AlbumCascade {
            album,
            photo_filenames,
            orphaned_face_keys,
        })
    }
}

#[async_trait]
impl PhotoStore for MemoryStore {
    async fn insert_photo(&self, new_photo: NewPhoto) -> Result<Photo, AppError> {
        let mut state = self.state.lock().unwrap();

        // Mirror the unique (album_id, filename) index.
        if state
            .photos
            .iter()
            .any(|p| p.album_id == new_photo.album_id && p.filename == new_photo.filename)
        {
            return Err(AppError::Conflict(format!(
                "duplicate filename: {}",
                new_photo.filename
            )));
        }

        let photo = Photo {
            id: Uuid::new_v4(),
            album_id: new_photo.album_id,
            filename: new_photo.filename,
            content_type: new_photo.content_type,
            size_bytes: new_photo.size_bytes,
            width: new_photo.width,
            height: new_photo.height,
            uploaded_at: Utc::now(),
            exif: new_photo.exif,
            blur_data_url: new_photo.blur_data_url,
        };
        state.photos.push(photo.clone());

        if let Some(album) = state.albums.iter_mut().find(|a| a.id == photo.album_id) {
            album.image_count += 1;
        }

        Ok(photo)
    }

    async fn photos_missing_blur(&self) -> Result<Vec<BlurBackfillRow>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .photos
            .iter()
            .filter(|p| p.blur_data_url.is_none())
            .filter_map(|p| {
                let album = state.albums.iter().find(|a| a.id == p.album_id)?;
                Some(BlurBackfillRow {
                    photo_id: p.id,
                    album_id: p.album_id,
                    filename: p.filename.clone(),
                    album_slug: album.slug.clone(),
                })
            })
            .collect())
    }

    async fn set_blur_data_url(
        &self,
        photo_id: Uuid,
        blur_data_url: &str,
    ) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        let photo = state
            .photos
            .iter_mut()
            .find(|p| p.id == photo_id)
            .ok_or_else(|| AppError::NotFound(format!("Photo not found: {}", photo_id)))?;
        photo.blur_data_url = Some(blur_data_url.to_string());
        Ok(())
    }

    async fn delete_photo_cascade(
        &self,
        album_slug: &str,
        filename: &str,
    ) -> Result<PhotoCascade, AppError> {
        let mut state = self.state.lock().unwrap();

        let album_id = state
            .albums
            .iter()
            .find(|a| a.slug == album_slug)
            .map(|a| a.id)
            .ok_or_else(|| AppError::NotFound(format!("Album not found: {}", album_slug)))?;

        let photo = state
            .photos
            .iter()
            .find(|p| p.album_id == album_id && p.filename == filename)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("Photo not found: {}/{}", album_slug, filename))
            })?;

        let mut linked_keys: Vec<String> = state
            .links
            .iter()
            .filter(|l| l.photo_id == photo.id)
            .map(|l| l.face_external_id.clone())
            .collect();
        linked_keys.sort();
        linked_keys.dedup();

        state.links.retain(|l| l.photo_id != photo.id);
        let orphaned_face_keys = state.remove_orphaned_identities(&linked_keys);

        state.photos.retain(|p| p.id != photo.id);
        if let Some(album) = state.albums.iter_mut().find(|a| a.id == album_id) {
            album.image_count -= 1;
        }

        Ok(PhotoCascade {
            photo,
            orphaned_face_keys,
        })
    }
}

#[async_trait]
impl FaceStore for MemoryStore {
    async fn upsert_identity(&self, external_id: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state.identities.iter().any(|i| i.external_id == external_id) {
            return Ok(());
        }
        state.identities.push(FaceIdentity {
            id: Uuid::new_v4(),
            name: None,
            external_id: external_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn insert_link(
        &self,
        photo_id: Uuid,
        face_external_id: &str,
        album_id: Uuid,
    ) -> Result<PhotoFaceLink, AppError> {
        let link = PhotoFaceLink {
            id: Uuid::new_v4(),
            photo_id,
            face_external_id: face_external_id.to_string(),
            album_id,
        };
        self.state.lock().unwrap().links.push(link.clone());
        Ok(link)
    }

    async fn set_identity_name(
        &self,
        external_id: &str,
        name: &str,
    ) -> Result<FaceIdentity, AppError> {
        let mut state = self.state.lock().unwrap();
        let identity = state
            .identities
            .iter_mut()
            .find(|i| i.external_id == external_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("Face identity not found: {}", external_id))
            })?;
        identity.name = Some(name.to_string());
        Ok(identity.clone())
    }

    async fn list_identities(&self) -> Result<Vec<FaceIdentity>, AppError> {
        let mut identities = self.state.lock().unwrap().identities.clone();
        identities.sort_by_key(|i| i.created_at);
        Ok(identities)
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn grant(&self, user_id: Uuid, album_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state
            .permissions
            .iter()
            .any(|p| p.user_id == user_id && p.album_id == album_id)
        {
            return Ok(());
        }
        state.permissions.push(AlbumPermission {
            id: Uuid::new_v4(),
            user_id,
            album_id,
            granted_at: Utc::now(),
        });
        Ok(())
    }

    async fn readable_album_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .permissions
            .iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.album_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_album(slug: &str) -> NewAlbum {
        NewAlbum {
            name: "Trip".to_string(),
            slug: slug.to_string(),
            location: "ana/Trip".to_string(),
            shared: false,
            public_upload: false,
            secret: Uuid::new_v4().to_string(),
            face_detection: true,
        }
    }

    fn new_photo(album_id: Uuid, filename: &str) -> NewPhoto {
        NewPhoto {
            album_id,
            filename: filename.to_string(),
            content_type: "image/jpeg".to_string(),
            size_bytes: 1024,
            width: 800,
            height: 600,
            exif: json!({}),
            blur_data_url: Some("data:image/jpeg;base64,x".to_string()),
        }
    }

    #[tokio::test]
    async fn test_counter_follows_insert_and_delete() {
        let store = MemoryStore::new();
        let album = store
            .resolve_for_upload(new_album("ana/trip"))
            .await
            .unwrap()
            .into_album();

        store.insert_photo(new_photo(album.id, "a.jpg")).await.unwrap();
        store.insert_photo(new_photo(album.id, "b.jpg")).await.unwrap();
        assert_eq!(store.album_by_slug("ana/trip").unwrap().image_count, 2);

        store.delete_photo_cascade("ana/trip", "a.jpg").await.unwrap();
        assert_eq!(store.album_by_slug("ana/trip").unwrap().image_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_filename_conflicts() {
        let store = MemoryStore::new();
        let album = store
            .resolve_for_upload(new_album("ana/trip"))
            .await
            .unwrap()
            .into_album();

        store.insert_photo(new_photo(album.id, "a.jpg")).await.unwrap();
        let err = store
            .insert_photo(new_photo(album.id, "a.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_resolution_found_on_second_upload() {
        let store = MemoryStore::new();
        let first = store.resolve_for_upload(new_album("ana/trip")).await.unwrap();
        assert!(first.was_created());

        let second = store.resolve_for_upload(new_album("ana/trip")).await.unwrap();
        assert!(!second.was_created());
        assert_eq!(first.album().id, second.album().id);
    }

    #[tokio::test]
    async fn test_album_cascade_keeps_shared_identities() {
        let store = MemoryStore::new();
        let trip = store
            .resolve_for_upload(new_album("ana/trip"))
            .await
            .unwrap()
            .into_album();
        let party = store
            .resolve_for_upload(new_album("ana/party"))
            .await
            .unwrap()
            .into_album();

        let in_trip = store.insert_photo(new_photo(trip.id, "a.jpg")).await.unwrap();
        let in_party = store.insert_photo(new_photo(party.id, "b.jpg")).await.unwrap();

        store.upsert_identity("face-shared").await.unwrap();
        store.upsert_identity("face-trip-only").await.unwrap();
        store.insert_link(in_trip.id, "face-shared", trip.id).await.unwrap();
        store.insert_link(in_party.id, "face-shared", party.id).await.unwrap();
        store.insert_link(in_trip.id, "face-trip-only", trip.id).await.unwrap();

        let cascade = store.delete_album_cascade("ana/trip").await.unwrap();
        assert_eq!(cascade.orphaned_face_keys, vec!["face-trip-only".to_string()]);
        assert_eq!(cascade.photo_filenames, vec!["a.jpg".to_string()]);

        // The shared identity survives with its remaining link.
        assert_eq!(store.identities().len(), 1);
        assert_eq!(store.identities()[0].external_id, "face-shared");
        assert_eq!(store.links().len(), 1);
        assert!(store.album_by_slug("ana/trip").is_none());
    }

    #[tokio::test]
    async fn test_upsert_identity_is_idempotent() {
        let store = MemoryStore::new();
        store.upsert_identity("face-1").await.unwrap();
        store.upsert_identity("face-1").await.unwrap();
        assert_eq!(store.identities().len(), 1);
    }

    #[tokio::test]
    async fn test_set_identity_name() {
        let store = MemoryStore::new();
        store.upsert_identity("face-1").await.unwrap();

        let renamed = store.set_identity_name("face-1", "Ana").await.unwrap();
        assert_eq!(renamed.name.as_deref(), Some("Ana"));

        let err = store.set_identity_name("missing", "Ana").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let album_id = Uuid::new_v4();

        store.grant(user_id, album_id).await.unwrap();
        store.grant(user_id, album_id).await.unwrap();

        assert_eq!(store.readable_album_ids(user_id).await.unwrap(), vec![album_id]);
        assert!(store.has_permission(user_id, album_id));
    }
}
