use aura_core::{
    models::{Album, AlbumResolution, NewAlbum},
    AppError,
};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::stores::AlbumCascade;

/// Repository for managing albums
#[derive(Clone)]
pub struct AlbumRepository {
    pool: PgPool,
}

impl AlbumRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the album under its slug, or return the existing one.
    ///
    /// Concurrency-safe: the insert is `ON CONFLICT (slug) DO NOTHING`, so
    /// two racing uploads to a fresh slug converge on one row and the loser
    /// sees `Found`.
    #[tracing::instrument(
        skip(self, new_album),
        fields(db.table = "albums", db.operation = "insert", slug = %new_album.slug)
    )]
    pub async fn resolve_for_upload(
        &self,
        new_album: NewAlbum,
    ) -> Result<AlbumResolution, AppError> {
        let inserted = sqlx::query_as::<Postgres, Album>(
            r#"
            INSERT INTO albums (
                id, name, slug, location, created_at,
                image_count, shared, public_upload, secret, face_detection
            )
            VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8, $9)
            ON CONFLICT (slug) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_album.name)
        .bind(&new_album.slug)
        .bind(&new_album.location)
        .bind(Utc::now())
        .bind(new_album.shared)
        .bind(new_album.public_upload)
        .bind(&new_album.secret)
        .bind(new_album.face_detection)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(album) = inserted {
            tracing::info!(album_id = %album.id, slug = %album.slug, "Created album");
            return Ok(AlbumResolution::Created(album));
        }

        let existing = sqlx::query_as::<Postgres, Album>("SELECT * FROM albums WHERE slug = $1")
            .bind(&new_album.slug)
            .fetch_one(&self.pool)
            .await?;

        Ok(AlbumResolution::Found(existing))
    }

    #[tracing::instrument(skip(self), fields(db.table = "albums", db.operation = "select"))]
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Album>, AppError> {
        let album = sqlx::query_as::<Postgres, Album>("SELECT * FROM albums WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(album)
    }

    /// Remove the album and every row that hangs off it, in foreign-key
    /// order, within one transaction: face links, face identities that the
    /// links were the last reference to, permissions, photos, then the album
    /// row itself.
    ///
    /// Returns what the caller needs for the post-commit external cleanup;
    /// no object-store or provider state is touched here.
    #[tracing::instrument(skip(self), fields(db.table = "albums", db.operation = "delete"))]
    pub async fn delete_album_cascade(&self, slug: &str) -> Result<AlbumCascade, AppError> {
        let mut tx = self.pool.begin().await?;

        let album = sqlx::query_as::<Postgres, Album>("SELECT * FROM albums WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Album not found: {}", slug)))?;

        let linked_keys = sqlx::query_scalar::<Postgres, String>(
            "SELECT DISTINCT face_external_id FROM photo_faces WHERE album_id = $1",
        )
        .bind(album.id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM photo_faces WHERE album_id = $1")
            .bind(album.id)
            .execute(&mut *tx)
            .await?;

        // Identities whose last link just went away. Still-referenced keys
        // survive untouched.
        let orphaned_face_keys = sqlx::query_scalar::<Postgres, String>(
            r#"
            DELETE FROM face_identities
            WHERE external_id = ANY($1)
              AND NOT EXISTS (
                  SELECT 1 FROM photo_faces pf
                  WHERE pf.face_external_id = face_identities.external_id
              )
            RETURNING external_id
            "#,
        )
        .bind(&linked_keys)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM album_permissions WHERE album_id = $1")
            .bind(album.id)
            .execute(&mut *tx)
            .await?;

        let photo_filenames = sqlx::query_scalar::<Postgres, String>(
            "SELECT filename FROM photos WHERE album_id = $1 ORDER BY filename",
        )
        .bind(album.id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM photos WHERE album_id = $1")
            .bind(album.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM albums WHERE id = $1")
            .bind(album.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            album_id = %album.id,
            slug = %album.slug,
            photos = photo_filenames.len(),
            orphaned_identities = orphaned_face_keys.len(),
            "Deleted album cascade"
        );

        Ok(AlbumCascade {
            album,
            photo_filenames,
            orphaned_face_keys,
        })
    }
}
