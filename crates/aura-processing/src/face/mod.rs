//! Face crop derivation.
//!
//! Detections come back from the provider as normalized bounding boxes; this
//! module filters them down to frontal faces and cuts padded JPEG crops for
//! indexing.

pub mod crop;

pub use crop::{extract_face_crops, FaceCrop, FaceCropper};
