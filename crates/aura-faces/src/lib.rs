//! Face recognition for the ingestion pipeline.
//!
//! The `FaceProvider` trait abstracts the detection/collection service
//! (images addressed by object-store key or passed inline); `rekognition` is
//! the AWS adapter and `test_helpers` a scripted stub. `resolver` maps face crops to
//! durable identities: search the collection, reuse a match or index a new
//! face, promote the crop thumbnail, and record identity + link rows.

pub mod error;
pub mod provider;
pub mod rekognition;
pub mod resolver;
pub mod test_helpers;

// Re-export commonly used types
pub use error::{FaceProviderError, FaceProviderResult};
pub use provider::{FaceProvider, ImageSource};
pub use rekognition::RekognitionFaceProvider;
pub use resolver::{FaceIdentityResolver, ResolvedFace};
