//! Image transforms for the upload pipeline
//!
//! This module provides the per-upload derivations:
//! - EXIF orientation correction (orientation)
//! - Size-capped compressed JPEG (compress)
//! - Blur placeholder data URL (blur)
//! - EXIF attribute map (exif)

pub mod blur;
pub mod compress;
pub mod exif;
pub mod orientation;

pub use blur::BlurPlaceholder;
pub use compress::ImageCompressor;
pub use exif::ExifMetadata;
pub use orientation::ImageOrientation;
