use crate::error::{ProcessingError, ProcessingResult};
use crate::image::{BlurPlaceholder, ExifMetadata, ImageCompressor, ImageOrientation};
use aura_core::config::MediaSettings;
use bytes::Bytes;
use image::GenericImageView;
use serde_json::{Map, Value};

/// Everything derived from one uploaded image in a single decode pass.
#[derive(Clone, Debug)]
pub struct UploadArtifacts {
    /// Dimensions of the stored original, read before orientation
    /// correction; correction only shapes the compressed derivative.
    pub width: u32,
    pub height: u32,
    pub exif: Map<String, Value>,
    pub compressed: Bytes,
    pub blur_data_url: String,
}

/// Decode an upload once and derive all of its artifacts.
///
/// Fails only when the bytes do not decode as an image; the caller decides
/// what an undecodable file means for the batch.
pub async fn derive_upload_artifacts(
    data: Bytes,
    settings: MediaSettings,
) -> ProcessingResult<UploadArtifacts> {
    // Image decode is CPU-bound; run off the async pool.
    tokio::task::spawn_blocking(move || derive_blocking(&data, &settings))
        .await
        .map_err(|e| ProcessingError::TaskJoin(e.to_string()))?
}

fn derive_blocking(data: &Bytes, settings: &MediaSettings) -> ProcessingResult<UploadArtifacts> {
    let decoded = image::load_from_memory(data)?;
    let (width, height) = decoded.dimensions();

    let exif = ExifMetadata::attribute_map(data);

    // The placeholder is cut from the image as uploaded, before orientation
    // correction.
    let blur_data_url = BlurPlaceholder::from_image(&decoded, settings.blur_edge);

    let oriented = ImageOrientation::apply_exif_orientation(decoded, data);
    let compressed = ImageCompressor::compress(
        &oriented,
        settings.max_width,
        settings.max_height,
        settings.quality,
    )?;

    tracing::debug!(
        width,
        height,
        compressed_bytes = compressed.len(),
        exif_fields = exif.len(),
        "Derived upload artifacts"
    );

    Ok(UploadArtifacts {
        width,
        height,
        exif,
        compressed,
        blur_data_url,
    })
}
