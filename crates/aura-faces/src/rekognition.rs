//! AWS Rekognition adapter for the face provider interface.

use std::time::Instant;

use async_trait::async_trait;
use aura_core::models::{BoundingBox, FaceDetection, FaceMatch, HeadPose};
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{Attribute, FaceDetail, Image, QualityFilter, S3Object};
use aws_sdk_rekognition::Client as RekognitionClient;

use crate::error::{FaceProviderError, FaceProviderResult};
use crate::provider::{FaceProvider, ImageSource};

/// Face provider backed by AWS Rekognition collections.
///
/// `ImageSource::Key` references are resolved against the configured S3
/// bucket; Rekognition reads the object directly, so the key must point at
/// the same bucket the storage backend writes to.
#[derive(Clone)]
pub struct RekognitionFaceProvider {
    client: RekognitionClient,
    bucket: String,
}

impl RekognitionFaceProvider {
    /// Build a client from the ambient AWS environment (credentials chain,
    /// profiles), overriding the region when one is given.
    pub async fn new(region: Option<String>, bucket: String) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;

        Self {
            client: RekognitionClient::new(&config),
            bucket,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn to_rekognition_image(bucket: &str, source: ImageSource) -> Image {
    match source {
        ImageSource::Key(key) => Image::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build(),
        ImageSource::Bytes(data) => Image::builder().bytes(Blob::new(data.to_vec())).build(),
    }
}

fn to_detection(detail: &FaceDetail) -> Option<FaceDetection> {
    let bbox = detail.bounding_box()?;
    let pose = detail.pose()?;

    Some(FaceDetection {
        bounding_box: BoundingBox {
            left: bbox.left().unwrap_or(0.0),
            top: bbox.top().unwrap_or(0.0),
            width: bbox.width().unwrap_or(0.0),
            height: bbox.height().unwrap_or(0.0),
        },
        pose: HeadPose {
            yaw: pose.yaw().unwrap_or(0.0),
            pitch: pose.pitch().unwrap_or(0.0),
        },
        confidence: detail.confidence(),
    })
}

/// Sort service failures into the per-face-recoverable and the transient.
fn classify<E>(operation: &str, err: SdkError<E>) -> FaceProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err
        .as_service_error()
        .and_then(|service_err| service_err.code())
        .map(str::to_string);
    let message = format!("{}: {}", operation, DisplayErrorContext(&err));

    match code.as_deref() {
        Some("InvalidImageFormatException")
        | Some("InvalidParameterException")
        | Some("ImageTooLargeException") => FaceProviderError::InvalidImage(message),
        Some("ResourceNotFoundException") => FaceProviderError::CollectionNotFound(message),
        _ => FaceProviderError::Unavailable(message),
    }
}

#[async_trait]
impl FaceProvider for RekognitionFaceProvider {
    async fn detect_faces(&self, image: ImageSource) -> FaceProviderResult<Vec<FaceDetection>> {
        let start = Instant::now();

        let response = self
            .client
            .detect_faces()
            .image(to_rekognition_image(&self.bucket, image))
            .attributes(Attribute::All)
            .send()
            .await
            .map_err(|e| classify("detect_faces", e))?;

        let detections: Vec<FaceDetection> = response
            .face_details()
            .iter()
            .filter_map(to_detection)
            .collect();

        tracing::info!(
            faces = detections.len(),
            duration_ms = start.elapsed().as_millis(),
            "Detected faces"
        );

        Ok(detections)
    }

    async fn search_faces(
        &self,
        collection_id: &str,
        image: ImageSource,
        max_faces: i32,
        threshold: f32,
    ) -> FaceProviderResult<Vec<FaceMatch>> {
        let start = Instant::now();

        let response = self
            .client
            .search_faces_by_image()
            .collection_id(collection_id)
            .image(to_rekognition_image(&self.bucket, image))
            .max_faces(max_faces)
            .face_match_threshold(threshold)
            .send()
            .await
            .map_err(|e| classify("search_faces_by_image", e))?;

        let matches: Vec<FaceMatch> = response
            .face_matches()
            .iter()
            .filter_map(|candidate| {
                let external_id = candidate.face()?.face_id()?.to_string();
                Some(FaceMatch {
                    external_id,
                    similarity: candidate.similarity().unwrap_or(0.0),
                })
            })
            .collect();

        tracing::debug!(
            collection_id,
            matches = matches.len(),
            duration_ms = start.elapsed().as_millis(),
            "Searched face collection"
        );

        Ok(matches)
    }

    async fn index_face(
        &self,
        collection_id: &str,
        image: ImageSource,
        external_ref: &str,
    ) -> FaceProviderResult<Option<String>> {
        let start = Instant::now();

        let response = self
            .client
            .index_faces()
            .collection_id(collection_id)
            .image(to_rekognition_image(&self.bucket, image))
            .external_image_id(external_ref)
            .max_faces(1)
            .quality_filter(QualityFilter::Auto)
            .send()
            .await
            .map_err(|e| classify("index_faces", e))?;

        let external_key = response
            .face_records()
            .iter()
            .find_map(|record| record.face().and_then(|f| f.face_id()).map(str::to_string));

        tracing::info!(
            collection_id,
            external_ref,
            indexed = external_key.is_some(),
            duration_ms = start.elapsed().as_millis(),
            "Indexed face"
        );

        Ok(external_key)
    }

    async fn delete_faces(
        &self,
        collection_id: &str,
        external_keys: &[String],
    ) -> FaceProviderResult<()> {
        if external_keys.is_empty() {
            return Ok(());
        }

        self.client
            .delete_faces()
            .collection_id(collection_id)
            .set_face_ids(Some(external_keys.to_vec()))
            .send()
            .await
            .map_err(|e| classify("delete_faces", e))?;

        tracing::info!(
            collection_id,
            count = external_keys.len(),
            "Deleted faces from collection"
        );

        Ok(())
    }

    async fn list_faces(&self, collection_id: &str) -> FaceProviderResult<Vec<String>> {
        let mut external_keys = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self.client.list_faces().collection_id(collection_id);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| classify("list_faces", e))?;

            for face in response.faces() {
                if let Some(face_id) = face.face_id() {
                    external_keys.push(face_id.to_string());
                }
            }

            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(external_keys)
    }

    async fn ensure_collection(&self, collection_id: &str) -> FaceProviderResult<()> {
        match self
            .client
            .create_collection()
            .collection_id(collection_id)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(collection_id, "Created face collection");
                Ok(())
            }
            Err(err) => {
                let already_exists = err
                    .as_service_error()
                    .map(|e| e.is_resource_already_exists_exception())
                    .unwrap_or(false);
                if already_exists {
                    tracing::debug!(collection_id, "Face collection already exists");
                    Ok(())
                } else {
                    Err(classify("create_collection", err))
                }
            }
        }
    }
}
