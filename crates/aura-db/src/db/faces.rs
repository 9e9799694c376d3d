use aura_core::{
    models::{FaceIdentity, PhotoFaceLink},
    AppError,
};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for face identities and photo-face links
#[derive(Clone)]
pub struct FaceRepository {
    pool: PgPool,
}

impl FaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register an identity for a provider external key if one does not
    /// exist yet. Insert-or-ignore on the unique external key: concurrent
    /// first sightings of the same face converge on a single row.
    #[tracing::instrument(skip(self), fields(db.table = "face_identities", db.operation = "insert"))]
    pub async fn upsert_identity(&self, external_id: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO face_identities (id, name, external_id, created_at)
            VALUES ($1, NULL, $2, $3)
            ON CONFLICT (external_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(external_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// One link row per accepted detection occurrence.
    #[tracing::instrument(
        skip(self),
        fields(db.table = "photo_faces", db.operation = "insert", db.record_id = %photo_id)
    )]
    pub async fn insert_link(
        &self,
        photo_id: Uuid,
        face_external_id: &str,
        album_id: Uuid,
    ) -> Result<PhotoFaceLink, AppError> {
        let link = sqlx::query_as::<Postgres, PhotoFaceLink>(
            r#"
            INSERT INTO photo_faces (id, photo_id, face_external_id, album_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(photo_id)
        .bind(face_external_id)
        .bind(album_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(link)
    }

    /// Label an identity cluster with a human-assigned name.
    #[tracing::instrument(skip(self), fields(db.table = "face_identities", db.operation = "update"))]
    pub async fn set_identity_name(
        &self,
        external_id: &str,
        name: &str,
    ) -> Result<FaceIdentity, AppError> {
        let identity = sqlx::query_as::<Postgres, FaceIdentity>(
            "UPDATE face_identities SET name = $2 WHERE external_id = $1 RETURNING *",
        )
        .bind(external_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Face identity not found: {}", external_id)))?;

        Ok(identity)
    }

    #[tracing::instrument(skip(self), fields(db.table = "face_identities", db.operation = "select"))]
    pub async fn list_identities(&self) -> Result<Vec<FaceIdentity>, AppError> {
        let identities = sqlx::query_as::<Postgres, FaceIdentity>(
            "SELECT * FROM face_identities ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(identities)
    }
}
