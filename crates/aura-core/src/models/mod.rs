//! Data models for the application
//!
//! Rows come back from the metadata store as named-field structs (never
//! positional tuples), organized by domain.

mod album;
mod face;
mod photo;
mod user;

// Re-export all models for convenient imports
pub use album::*;
pub use face::*;
pub use photo::*;
pub use user::*;
