use aura_core::{models::User, AppError};
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Repository for user accounts
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>("SELECT * FROM users WHERE user_name = $1")
            .bind(user_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// The password arrives already hashed; this layer never sees cleartext.
    #[tracing::instrument(
        skip(self, password_hash),
        fields(db.table = "users", db.operation = "insert")
    )]
    pub async fn create_user(
        &self,
        user_name: &str,
        password_hash: &str,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            r#"
            INSERT INTO users (id, user_name, password_hash, full_name, email, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_name)
        .bind(password_hash)
        .bind(full_name)
        .bind(email)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, user_name = %user.user_name, "Created user");
        Ok(user)
    }
}
