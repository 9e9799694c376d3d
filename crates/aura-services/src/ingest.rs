//! Upload ingestion orchestration.
//!
//! One batch targets one album: resolve (create-or-find) the album, then per
//! file store the original and compressed objects, insert the photo row with
//! its counter bump, and optionally run the face pipeline. A failing file is
//! recorded and skipped; its siblings continue.

use std::sync::Arc;

use aura_core::{
    models::{album_slug, Album, NewAlbum, NewPhoto, Photo},
    AppError, FaceSettings, MediaSettings,
};
use aura_db::{AlbumStore, BlurBackfillRow, PermissionStore, PhotoStore};
use aura_faces::{FaceIdentityResolver, FaceProvider, ImageSource};
use aura_processing::{derive_upload_artifacts, extract_face_crops, BlurPlaceholder};
use aura_storage::{keys, ObjectStorage};
use bytes::Bytes;
use serde_json::Value;
use uuid::Uuid;

use crate::progress::{ProgressChannel, UploadEvent};

/// One file in an upload batch.
#[derive(Clone, Debug)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// An upload batch aimed at one album.
#[derive(Clone, Debug)]
pub struct UploadRequest {
    /// Album owner; becomes the first path segment of the slug.
    pub owner: String,
    pub album_name: String,
    /// Uploading user, when the upload happens in a user context. Granted
    /// read permission on the album.
    pub user_id: Option<Uuid>,
    pub shared: bool,
    pub public_upload: bool,
    pub face_detection: bool,
    pub files: Vec<UploadFile>,
}

/// What one batch produced.
#[derive(Debug)]
pub struct UploadOutcome {
    pub album: Album,
    pub created_album: bool,
    pub photos: Vec<Photo>,
    pub failures: Vec<FileFailure>,
}

/// A file that failed to ingest; siblings are unaffected.
#[derive(Debug)]
pub struct FileFailure {
    pub filename: String,
    pub error: AppError,
}

/// Result of a blur backfill sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub updated: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct IngestionService {
    albums: Arc<dyn AlbumStore>,
    photos: Arc<dyn PhotoStore>,
    permissions: Arc<dyn PermissionStore>,
    storage: Arc<dyn ObjectStorage>,
    provider: Arc<dyn FaceProvider>,
    resolver: Arc<FaceIdentityResolver>,
    progress: ProgressChannel,
    media_settings: MediaSettings,
    face_settings: FaceSettings,
}

impl IngestionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        albums: Arc<dyn AlbumStore>,
        photos: Arc<dyn PhotoStore>,
        permissions: Arc<dyn PermissionStore>,
        storage: Arc<dyn ObjectStorage>,
        provider: Arc<dyn FaceProvider>,
        resolver: Arc<FaceIdentityResolver>,
        progress: ProgressChannel,
        media_settings: MediaSettings,
        face_settings: FaceSettings,
    ) -> Self {
        Self {
            albums,
            photos,
            permissions,
            storage,
            provider,
            resolver,
            progress,
            media_settings,
            face_settings,
        }
    }

    pub fn progress(&self) -> &ProgressChannel {
        &self.progress
    }

    /// Ingest a batch of files into the album named by the request.
    ///
    /// The album is created on first upload to its slug (fresh secret, the
    /// requested flags) or found and used additively. Per-file errors are
    /// collected in the outcome; only album resolution and permission
    /// failures abort the batch.
    #[tracing::instrument(
        skip(self, request),
        fields(owner = %request.owner, album = %request.album_name, files = request.files.len())
    )]
    pub async fn upload_batch(&self, request: UploadRequest) -> Result<UploadOutcome, AppError> {
        let slug = album_slug(&request.owner, &request.album_name);
        let resolution = self
            .albums
            .resolve_for_upload(NewAlbum {
                name: request.album_name.clone(),
                slug,
                location: format!("{}/{}", request.owner, request.album_name),
                shared: request.shared,
                public_upload: request.public_upload,
                secret: Uuid::new_v4().to_string(),
                face_detection: request.face_detection,
            })
            .await?;

        let created_album = resolution.was_created();
        let album = resolution.into_album();

        if let Some(user_id) = request.user_id {
            self.permissions.grant(user_id, album.id).await?;
        }

        let total_bytes: u64 = request.files.iter().map(|f| f.data.len() as u64).sum();
        let mut uploaded_bytes = 0u64;
        self.progress.emit(UploadEvent::Progress {
            uploaded_bytes,
            total_bytes,
        });

        let mut photos = Vec::new();
        let mut failures = Vec::new();

        for file in request.files {
            let file_bytes = file.data.len() as u64;
            let filename = file.filename.clone();

            let result = self.ingest_file(&album, file).await;

            // Progress counts processed bytes, successful or not; completion
            // is only signalled for files that made it in.
            uploaded_bytes += file_bytes;
            self.progress.emit(UploadEvent::Progress {
                uploaded_bytes,
                total_bytes,
            });

            match result {
                Ok(photo) => {
                    self.progress.emit(UploadEvent::FileComplete {
                        filename,
                        photo_id: photo.id,
                    });
                    photos.push(photo);
                }
                Err(error) => {
                    tracing::error!(
                        filename = %filename,
                        error = %error,
                        "File failed to ingest, continuing with the batch"
                    );
                    failures.push(FileFailure { filename, error });
                }
            }
        }

        tracing::info!(
            album_id = %album.id,
            ingested = photos.len(),
            failed = failures.len(),
            "Upload batch finished"
        );

        Ok(UploadOutcome {
            album,
            created_album,
            photos,
            failures,
        })
    }

    async fn ingest_file(&self, album: &Album, file: UploadFile) -> Result<Photo, AppError> {
        let size_bytes = file.data.len() as i64;
        let artifacts = derive_upload_artifacts(file.data.clone(), self.media_settings).await?;

        let original_key = keys::original_key(&album.slug, &file.filename);
        let compressed_key = keys::compressed_key(&album.slug, &file.filename);

        self.storage
            .put(&original_key, file.data.clone(), &file.content_type)
            .await?;
        self.storage
            .put(&compressed_key, artifacts.compressed.clone(), "image/jpeg")
            .await?;

        let photo = self
            .photos
            .insert_photo(NewPhoto {
                album_id: album.id,
                filename: file.filename.clone(),
                content_type: file.content_type.clone(),
                size_bytes,
                width: artifacts.width as i32,
                height: artifacts.height as i32,
                exif: Value::Object(artifacts.exif),
                blur_data_url: Some(artifacts.blur_data_url),
            })
            .await?;

        if album.face_detection {
            // The row is durable at this point; a face failure leaves a
            // valid photo with zero or partial links.
            if let Err(error) = self
                .resolve_faces(&photo, album, &original_key, file.data)
                .await
            {
                tracing::warn!(
                    photo_id = %photo.id,
                    error = %error,
                    "Face resolution failed, photo kept without links"
                );
            }
        }

        Ok(photo)
    }

    /// Detect on the stored original, crop frontal faces from the same
    /// bytes, and resolve each crop to an identity.
    async fn resolve_faces(
        &self,
        photo: &Photo,
        album: &Album,
        original_key: &str,
        data: Bytes,
    ) -> Result<usize, AppError> {
        let detections = self
            .provider
            .detect_faces(ImageSource::Key(original_key.to_string()))
            .await?;

        if detections.is_empty() {
            tracing::debug!(photo_id = %photo.id, "No faces detected");
            return Ok(0);
        }

        let crops = extract_face_crops(data, detections, self.face_settings).await?;
        if crops.is_empty() {
            tracing::debug!(photo_id = %photo.id, "No frontal faces to resolve");
            return Ok(0);
        }

        let resolved = self
            .resolver
            .resolve_crops(photo.id, album.id, &crops)
            .await?;
        Ok(resolved.len())
    }

    /// Derive blur placeholders for photos that never got one.
    ///
    /// Intended to run best-effort at startup; per-photo failures are
    /// logged and counted, never fatal.
    pub async fn backfill_blur_placeholders(&self) -> Result<BackfillSummary, AppError> {
        let pending = self.photos.photos_missing_blur().await?;
        if pending.is_empty() {
            tracing::debug!("All photos already have blur placeholders");
            return Ok(BackfillSummary::default());
        }

        tracing::info!(pending = pending.len(), "Backfilling blur placeholders");

        let mut summary = BackfillSummary::default();
        for row in pending {
            match self.backfill_one(&row).await {
                Ok(()) => summary.updated += 1,
                Err(error) => {
                    tracing::warn!(
                        photo_id = %row.photo_id,
                        error = %error,
                        "Blur backfill failed for photo"
                    );
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            updated = summary.updated,
            failed = summary.failed,
            "Blur backfill finished"
        );
        Ok(summary)
    }

    async fn backfill_one(&self, row: &BlurBackfillRow) -> Result<(), AppError> {
        let key = keys::original_key(&row.album_slug, &row.filename);
        let data = self.storage.get(&key).await?;

        let edge = self.media_settings.blur_edge;
        let blur = tokio::task::spawn_blocking(move || BlurPlaceholder::generate(&data, edge))
            .await
            .map_err(|e| AppError::Internal(format!("Blur backfill task failed: {}", e)))?;

        self.photos.set_blur_data_url(row.photo_id, &blur).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::models::{BoundingBox, FaceDetection, HeadPose};
    use aura_db::test_support::MemoryStore;
    use aura_storage::MemoryStorage;
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    struct TestRig {
        service: IngestionService,
        store: MemoryStore,
        storage: Arc<MemoryStorage>,
        provider: aura_faces::test_helpers::StubFaceProvider,
    }

    fn rig() -> TestRig {
        let store = MemoryStore::new();
        let storage = Arc::new(MemoryStorage::new());
        let provider = aura_faces::test_helpers::StubFaceProvider::new();

        let resolver = Arc::new(FaceIdentityResolver::new(
            Arc::new(provider.clone()),
            storage.clone(),
            Arc::new(store.clone()),
            "people".to_string(),
            FaceSettings::default(),
        ));

        let service = IngestionService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            storage.clone(),
            Arc::new(provider.clone()),
            resolver,
            ProgressChannel::default(),
            MediaSettings::default(),
            FaceSettings::default(),
        );

        TestRig {
            service,
            store,
            storage,
            provider,
        }
    }

    fn four_by_two() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([10, 200, 60, 255])))
    }

    fn png_upload(filename: &str) -> UploadFile {
        let mut buffer = Vec::new();
        four_by_two()
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        UploadFile {
            filename: filename.to_string(),
            content_type: "image/png".to_string(),
            data: Bytes::from(buffer),
        }
    }

    /// A decodable JPEG with an EXIF orientation field spliced in after the
    /// SOI marker.
    fn jpeg_upload_with_orientation(filename: &str, orientation: u16) -> UploadFile {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0112u16.to_le_bytes());
        tiff.extend_from_slice(&3u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&orientation.to_le_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let mut app1 = Vec::new();
        app1.extend_from_slice(&[0xFF, 0xE1]);
        app1.extend_from_slice(&((tiff.len() as u16 + 8).to_be_bytes()));
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&tiff);

        let rgb = DynamicImage::ImageRgb8(four_by_two().to_rgb8());
        let mut plain = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut plain), ImageFormat::Jpeg)
            .unwrap();

        let mut data = Vec::with_capacity(plain.len() + app1.len());
        data.extend_from_slice(&plain[..2]);
        data.extend_from_slice(&app1);
        data.extend_from_slice(&plain[2..]);

        UploadFile {
            filename: filename.to_string(),
            content_type: "image/jpeg".to_string(),
            data: Bytes::from(data),
        }
    }

    fn request(files: Vec<UploadFile>, face_detection: bool) -> UploadRequest {
        UploadRequest {
            owner: "ana".to_string(),
            album_name: "Summer Trip".to_string(),
            user_id: None,
            shared: false,
            public_upload: false,
            face_detection,
            files,
        }
    }

    fn frontal_detection() -> FaceDetection {
        FaceDetection {
            bounding_box: BoundingBox {
                left: 0.05,
                top: 0.05,
                width: 0.9,
                height: 0.9,
            },
            pose: HeadPose {
                yaw: 0.0,
                pitch: 0.0,
            },
            confidence: Some(99.0),
        }
    }

    #[tokio::test]
    async fn test_first_batch_creates_album_and_counts_photos() {
        let rig = rig();

        let outcome = rig
            .service
            .upload_batch(request(
                vec![png_upload("a.png"), png_upload("b.png")],
                false,
            ))
            .await
            .unwrap();

        assert!(outcome.created_album);
        assert_eq!(outcome.album.slug, "ana/summer-trip");
        assert_eq!(outcome.photos.len(), 2);
        assert!(outcome.failures.is_empty());

        let album = rig.store.album_by_slug("ana/summer-trip").unwrap();
        assert_eq!(album.image_count, 2);

        // Original and compressed objects for both files.
        assert!(rig.storage.has_object("ana/summer-trip/a.png"));
        assert!(rig.storage.has_object("ana/summer-trip/compressed/a.png"));
        assert!(rig.storage.has_object("ana/summer-trip/b.png"));
        assert!(rig.storage.has_object("ana/summer-trip/compressed/b.png"));

        // A second batch is additive on the same slug.
        let second = rig
            .service
            .upload_batch(request(vec![png_upload("c.png")], false))
            .await
            .unwrap();
        assert!(!second.created_album);
        assert_eq!(
            rig.store.album_by_slug("ana/summer-trip").unwrap().image_count,
            3
        );
    }

    #[tokio::test]
    async fn test_failed_file_does_not_abort_batch() {
        let rig = rig();

        let broken = UploadFile {
            filename: "broken.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            data: Bytes::from_static(b"definitely not an image"),
        };

        let outcome = rig
            .service
            .upload_batch(request(
                vec![png_upload("a.png"), broken, png_upload("c.png")],
                false,
            ))
            .await
            .unwrap();

        assert_eq!(outcome.photos.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].filename, "broken.jpg");

        // The counter only reflects committed rows.
        let album = rig.store.album_by_slug("ana/summer-trip").unwrap();
        assert_eq!(album.image_count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_filename_is_recorded_as_conflict() {
        let rig = rig();

        let outcome = rig
            .service
            .upload_batch(request(
                vec![png_upload("same.png"), png_upload("same.png")],
                false,
            ))
            .await
            .unwrap();

        assert_eq!(outcome.photos.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(outcome.failures[0].error, AppError::Conflict(_)));
        assert_eq!(
            rig.store.album_by_slug("ana/summer-trip").unwrap().image_count,
            1
        );
    }

    #[tokio::test]
    async fn test_uploading_user_is_granted_permission() {
        let rig = rig();
        let user_id = Uuid::new_v4();

        let mut req = request(vec![png_upload("a.png")], false);
        req.user_id = Some(user_id);

        let outcome = rig.service.upload_batch(req).await.unwrap();
        assert!(rig.store.has_permission(user_id, outcome.album.id));
    }

    #[tokio::test]
    async fn test_face_detection_end_to_end() {
        let rig = rig();
        rig.provider.push_detections(vec![frontal_detection()]);
        // Default stub behavior: search finds no match, indexing mints
        // stub-face-1.

        let outcome = rig
            .service
            .upload_batch(request(
                vec![jpeg_upload_with_orientation("portrait.jpg", 6)],
                true,
            ))
            .await
            .unwrap();

        assert_eq!(outcome.photos.len(), 1);
        let photo = &outcome.photos[0];

        // Stored dimensions are pre-rotation.
        assert_eq!((photo.width, photo.height), (4, 2));
        assert!(photo
            .blur_data_url
            .as_deref()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert!(photo.exif.get("Orientation").is_some());

        // The compressed derivative is orientation-corrected.
        let compressed = rig
            .storage
            .object("ana/summer-trip/compressed/portrait.jpg")
            .unwrap();
        let decoded = image::load_from_memory(&compressed).unwrap();
        assert_eq!(decoded.dimensions(), (2, 4));

        // Detection ran against the stored original by key.
        assert_eq!(
            rig.provider.detect_calls(),
            vec!["ana/summer-trip/portrait.jpg".to_string()]
        );

        // One identity, one link, one promoted thumbnail.
        assert_eq!(rig.store.identities().len(), 1);
        assert_eq!(rig.store.links().len(), 1);
        assert_eq!(rig.store.links()[0].photo_id, photo.id);
        assert!(rig.storage.has_object("faces/stub-face-1.jpg"));
    }

    #[tokio::test]
    async fn test_same_face_in_two_albums_shares_one_identity() {
        let rig = rig();
        rig.provider.push_detections(vec![frontal_detection()]);
        rig.provider.push_detections(vec![frontal_detection()]);
        // First sighting indexes; the second matches the same key.
        rig.provider.push_no_match();
        rig.provider.push_indexed("face-ana");
        rig.provider.push_match("face-ana", 96.0);

        rig.service
            .upload_batch(request(vec![png_upload("a.png")], true))
            .await
            .unwrap();

        let mut second = request(vec![png_upload("b.png")], true);
        second.album_name = "Reception".to_string();
        rig.service.upload_batch(second).await.unwrap();

        assert_eq!(rig.store.identities().len(), 1);
        assert_eq!(rig.store.links().len(), 2);
        let albums: Vec<Uuid> = rig.store.links().iter().map(|l| l.album_id).collect();
        assert_ne!(albums[0], albums[1]);
        assert!(rig.storage.has_object("faces/face-ana.jpg"));
    }

    #[tokio::test]
    async fn test_face_failure_keeps_the_photo() {
        let rig = rig();
        rig.provider.push_detect_error(
            aura_faces::FaceProviderError::Unavailable("throttled".to_string()),
        );

        let outcome = rig
            .service
            .upload_batch(request(vec![png_upload("a.png")], true))
            .await
            .unwrap();

        // Face trouble after the insert is not a file failure.
        assert_eq!(outcome.photos.len(), 1);
        assert!(outcome.failures.is_empty());
        assert!(rig.store.links().is_empty());
        assert_eq!(
            rig.store.album_by_slug("ana/summer-trip").unwrap().image_count,
            1
        );
    }

    #[tokio::test]
    async fn test_progress_events_are_emitted_in_order() {
        let rig = rig();
        let mut rx = rig.service.progress().subscribe();

        let outcome = rig
            .service
            .upload_batch(request(vec![png_upload("a.png")], false))
            .await
            .unwrap();
        let total = outcome.photos[0].size_bytes as u64;

        match rx.try_recv().unwrap() {
            UploadEvent::Progress {
                uploaded_bytes,
                total_bytes,
            } => {
                assert_eq!(uploaded_bytes, 0);
                assert_eq!(total_bytes, total);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            UploadEvent::Progress { uploaded_bytes, .. } => assert_eq!(uploaded_bytes, total),
            other => panic!("unexpected event: {:?}", other),
        }
        match rx.try_recv().unwrap() {
            UploadEvent::FileComplete { filename, photo_id } => {
                assert_eq!(filename, "a.png");
                assert_eq!(photo_id, outcome.photos[0].id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blur_backfill_updates_missing_rows() {
        let rig = rig();

        // One photo ingested normally, one inserted without a placeholder
        // and one whose original object is missing.
        rig.service
            .upload_batch(request(vec![png_upload("ok.png")], false))
            .await
            .unwrap();

        let album = rig.store.album_by_slug("ana/summer-trip").unwrap();
        let bare = |name: &str| NewPhoto {
            album_id: album.id,
            filename: name.to_string(),
            content_type: "image/png".to_string(),
            size_bytes: 1,
            width: 4,
            height: 2,
            exif: Value::Object(serde_json::Map::new()),
            blur_data_url: None,
        };
        rig.store.insert_photo(bare("legacy.png")).await.unwrap();
        rig.store.insert_photo(bare("gone.png")).await.unwrap();
        rig.storage
            .put(
                "ana/summer-trip/legacy.png",
                png_upload("x").data,
                "image/png",
            )
            .await
            .unwrap();

        let summary = rig.service.backfill_blur_placeholders().await.unwrap();
        assert_eq!(
            summary,
            BackfillSummary {
                updated: 1,
                failed: 1
            }
        );

        let legacy = rig
            .store
            .photos()
            .into_iter()
            .find(|p| p.filename == "legacy.png")
            .unwrap();
        assert!(legacy
            .blur_data_url
            .as_deref()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));

        // A second sweep only sees the still-missing photo.
        let summary = rig.service.backfill_blur_placeholders().await.unwrap();
        assert_eq!(
            summary,
            BackfillSummary {
                updated: 0,
                failed: 1
            }
        );
    }
}
