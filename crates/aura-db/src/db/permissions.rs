use aura_core::AppError;
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for album read permissions
#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grant a user access to an album. Idempotent on the unique
    /// (user, album) pair.
    #[tracing::instrument(
        skip(self),
        fields(db.table = "album_permissions", db.operation = "insert", db.record_id = %album_id)
    )]
    pub async fn grant(&self, user_id: Uuid, album_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO album_permissions (id, user_id, album_id, granted_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, album_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(album_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Album ids the user has been granted read access to.
    #[tracing::instrument(skip(self), fields(db.table = "album_permissions", db.operation = "select"))]
    pub async fn readable_album_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let album_ids = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT album_id FROM album_permissions WHERE user_id = $1 ORDER BY granted_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(album_ids)
    }
}
