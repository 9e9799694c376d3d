//! Orchestration layer for the gallery pipeline.
//!
//! `ingest` drives upload batches end to end (album resolution, object
//! writes, photo rows, the face pipeline) and the blur backfill; `delete`
//! unwinds albums and photos with best-effort external cleanup; `progress`
//! is the broadcast channel upload observers subscribe to; `setup` wires the
//! whole graph from configuration for a host binary.

pub mod delete;
pub mod ingest;
pub mod progress;
pub mod setup;

// Re-export commonly used types
pub use delete::DeletionService;
pub use ingest::{
    BackfillSummary, FileFailure, IngestionService, UploadFile, UploadOutcome, UploadRequest,
};
pub use progress::{ProgressChannel, UploadEvent};
pub use setup::{build_services, connect_and_migrate, init_tracing, seed_root_user, Services};
