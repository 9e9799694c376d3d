use aura_core::{
    models::{NewPhoto, Photo},
    AppError,
};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::stores::{BlurBackfillRow, PhotoCascade};

/// Repository for managing photos
#[derive(Clone)]
pub struct PhotoRepository {
    pool: PgPool,
}

impl PhotoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the photo row and bump the album counter in one transaction.
    ///
    /// `image_count` must always equal the number of photo rows, so the
    /// increment is never issued outside the insert's transaction.
    #[tracing::instrument(
        skip(self, new_photo),
        fields(db.table = "photos", db.operation = "insert", filename = %new_photo.filename)
    )]
    pub async fn insert_photo(&self, new_photo: NewPhoto) -> Result<Photo, AppError> {
        let mut tx = self.pool.begin().await?;

        let photo = sqlx::query_as::<Postgres, Photo>(
            r#"
            INSERT INTO photos (
                id, album_id, filename, content_type, size_bytes,
                width, height, uploaded_at, exif, blur_data_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_photo.album_id)
        .bind(&new_photo.filename)
        .bind(&new_photo.content_type)
        .bind(new_photo.size_bytes)
        .bind(new_photo.width)
        .bind(new_photo.height)
        .bind(Utc::now())
        .bind(&new_photo.exif)
        .bind(&new_photo.blur_data_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE albums SET image_count = image_count + 1 WHERE id = $1")
            .bind(new_photo.album_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(photo)
    }

    #[tracing::instrument(skip(self), fields(db.table = "photos", db.operation = "select"))]
    pub async fn get_by_filename(
        &self,
        album_id: Uuid,
        filename: &str,
    ) -> Result<Option<Photo>, AppError> {
        let photo = sqlx::query_as::<Postgres, Photo>(
            "SELECT * FROM photos WHERE album_id = $1 AND filename = $2",
        )
        .bind(album_id)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(photo)
    }

    /// Photos whose blur placeholder was never derived, oldest first, joined
    /// with the album slug so the caller can address the stored original.
    #[tracing::instrument(skip(self), fields(db.table = "photos", db.operation = "select"))]
    pub async fn photos_missing_blur(&self) -> Result<Vec<BlurBackfillRow>, AppError> {
        let rows = sqlx::query_as::<Postgres, BlurBackfillRow>(
            r#"
            SELECT p.id AS photo_id, p.album_id, p.filename, a.slug AS album_slug
            FROM photos p
            JOIN albums a ON a.id = p.album_id
            WHERE p.blur_data_url IS NULL
            ORDER BY p.uploaded_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    #[tracing::instrument(
        skip(self, blur_data_url),
        fields(db.table = "photos", db.operation = "update", db.record_id = %photo_id)
    )]
    pub async fn set_blur_data_url(
        &self,
        photo_id: Uuid,
        blur_data_url: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE photos SET blur_data_url = $2 WHERE id = $1")
            .bind(photo_id)
            .bind(blur_data_url)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Photo not found: {}", photo_id)));
        }
        Ok(())
    }

    /// Remove one photo with its face links, garbage-collect identities the
    /// photo was the last reference to, and decrement the album counter, all
    /// in one transaction.
    #[tracing::instrument(skip(self), fields(db.table = "photos", db.operation = "delete"))]
    pub async fn delete_photo_cascade(
        &self,
        album_slug: &str,
        filename: &str,
    ) -> Result<PhotoCascade, AppError> {
        let mut tx = self.pool.begin().await?;

        let photo = sqlx::query_as::<Postgres, Photo>(
            r#"
            SELECT p.* FROM photos p
            JOIN albums a ON a.id = p.album_id
            WHERE a.slug = $1 AND p.filename = $2
            "#,
        )
        .bind(album_slug)
        .bind(filename)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Photo not found: {}/{}", album_slug, filename))
        })?;

        let linked_keys = sqlx::query_scalar::<Postgres, String>(
            "SELECT DISTINCT face_external_id FROM photo_faces WHERE photo_id = $1",
        )
        .bind(photo.id)
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM photo_faces WHERE photo_id = $1")
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;

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

        sqlx::query("DELETE FROM photos WHERE id = $1")
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE albums SET image_count = image_count - 1 WHERE id = $1")
            .bind(photo.album_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            photo_id = %photo.id,
            filename = %photo.filename,
            orphaned_identities = orphaned_face_keys.len(),
            "Deleted photo cascade"
        );

        Ok(PhotoCascade {
            photo,
            orphaned_face_keys,
        })
    }
}
