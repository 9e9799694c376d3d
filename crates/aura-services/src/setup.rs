//! Startup wiring: tracing, database, and the service graph.
//!
//! This crate is embedded rather than run. A host binary calls
//! `init_tracing`, `connect_and_migrate`, and `build_services` in that order
//! and owns the returned handles.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use aura_core::{Config, StorageBackend};
use aura_db::{
    AlbumRepository, AlbumStore, FaceRepository, FaceStore, PermissionRepository, PermissionStore,
    PhotoRepository, PhotoStore, UserRepository,
};
use aura_faces::{FaceIdentityResolver, FaceProvider, RekognitionFaceProvider};
use aura_storage::create_storage;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::delete::DeletionService;
use crate::ingest::IngestionService;
use crate::progress::ProgressChannel;

/// Initialize tracing from `RUST_LOG`, defaulting to pipeline debug output.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "aura=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Setup the database connection pool and run pending migrations.
pub async fn connect_and_migrate(config: &Config) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Database connected successfully"
    );

    // Run pending migrations on startup (path: workspace migrations/ from crate root)
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}

/// The wired service graph.
#[derive(Clone)]
pub struct Services {
    pub ingestion: IngestionService,
    pub deletion: DeletionService,
    pub progress: ProgressChannel,
}

/// Wire storage, the face provider, and the repositories into the ingestion
/// and deletion services.
///
/// Requires the S3 backend: the face provider reads staged objects by key
/// straight from the bucket. Seeds the root user and runs the blur backfill
/// before returning.
pub async fn build_services(config: &Config, pool: PgPool) -> Result<Services> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize object storage")?;
    anyhow::ensure!(
        storage.backend_type() == StorageBackend::S3,
        "Face pipeline requires the S3 storage backend; the provider reads staged objects by key"
    );
    let bucket = config.s3_bucket.clone().context("S3_BUCKET must be set")?;

    let collection_id = config
        .collection_id()
        .map(String::from)
        .context("FACE_COLLECTION_ID or S3_BUCKET must be set")?;

    let provider: Arc<dyn FaceProvider> = Arc::new(
        RekognitionFaceProvider::new(
            config.aws_region.clone().or_else(|| config.s3_region.clone()),
            bucket,
        )
        .await,
    );
    provider
        .ensure_collection(&collection_id)
        .await
        .context("Failed to ensure the face collection exists")?;
    tracing::info!(collection_id = %collection_id, "Face collection ready");

    let albums: Arc<dyn AlbumStore> = Arc::new(AlbumRepository::new(pool.clone()));
    let photos: Arc<dyn PhotoStore> = Arc::new(PhotoRepository::new(pool.clone()));
    let faces: Arc<dyn FaceStore> = Arc::new(FaceRepository::new(pool.clone()));
    let permissions: Arc<dyn PermissionStore> = Arc::new(PermissionRepository::new(pool.clone()));
    let users = UserRepository::new(pool.clone());

    let resolver = Arc::new(FaceIdentityResolver::new(
        provider.clone(),
        storage.clone(),
        faces,
        collection_id.clone(),
        config.faces,
    ));

    let progress = ProgressChannel::default();
    let ingestion = IngestionService::new(
        albums.clone(),
        photos.clone(),
        permissions,
        storage.clone(),
        provider.clone(),
        resolver,
        progress.clone(),
        config.media,
        config.faces,
    );
    let deletion = DeletionService::new(albums, photos, storage, provider, collection_id);

    seed_root_user(config, &users).await?;

    // Best-effort: the pipeline works without placeholders.
    if let Err(error) = ingestion.backfill_blur_placeholders().await {
        tracing::warn!(error = %error, "Blur placeholder backfill failed at startup");
    }

    tracing::info!("Services initialized successfully");

    Ok(Services {
        ingestion,
        deletion,
        progress,
    })
}

/// Ensure the configured root user exists, creating it with a bcrypt hash
/// of the configured password when absent.
pub async fn seed_root_user(config: &Config, users: &UserRepository) -> Result<()> {
    if users
        .find_by_user_name(&config.root_user)
        .await
        .context("Failed to look up the root user")?
        .is_some()
    {
        tracing::debug!(user_name = %config.root_user, "Root user already present");
        return Ok(());
    }

    let password_hash = bcrypt::hash(&config.root_password, bcrypt::DEFAULT_COST)
        .context("Failed to hash the root user password")?;
    users
        .create_user(
            &config.root_user,
            &password_hash,
            Some(&config.root_full_name),
            config.root_email.as_deref(),
        )
        .await
        .context("Failed to create the root user")?;

    tracing::info!(user_name = %config.root_user, "Seeded root user");
    Ok(())
}
