use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    /// Single live extension link token, if one has been issued and not
    /// yet exchanged.
    pub extension_link_token: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, extension_link_token, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, extension_link_token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, extension_link_token, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Stores a freshly issued link token, overwriting any previous one.
    /// A user holds at most one live token.
    pub async fn set_link_token(db: &PgPool, user_id: Uuid, token: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET extension_link_token = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Consumes a link token: clears it and returns its owner in one
    /// statement, so two concurrent exchanges of the same token cannot
    /// both succeed.
    pub async fn take_by_link_token(db: &PgPool, token: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET extension_link_token = NULL
            WHERE extension_link_token = $1
            RETURNING id, username, email, password_hash, extension_link_token, created_at
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
