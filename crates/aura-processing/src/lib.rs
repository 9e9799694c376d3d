//! Derived-media transforms for the ingestion pipeline.
//!
//! Everything here is pure over bytes: orientation correction, the
//! size-capped compressed JPEG, the blur placeholder data URL, the EXIF
//! attribute map, and padded face crops. Callers own all I/O; the only
//! runtime coupling is `derive_upload_artifacts`, which moves the CPU-bound
//! decode/encode work onto the blocking pool.

pub mod error;
pub mod face;
pub mod image;
#[cfg(test)]
pub(crate) mod test_fixtures;
pub mod upload;

// Re-export commonly used types
pub use error::{ProcessingError, ProcessingResult};
pub use face::{extract_face_crops, FaceCrop, FaceCropper};
pub use image::{BlurPlaceholder, ExifMetadata, ImageCompressor, ImageOrientation};
pub use upload::{derive_upload_artifacts, UploadArtifacts};
