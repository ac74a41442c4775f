use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::dto::PublicUser;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub verification_expires_at: Option<OffsetDateTime>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<OffsetDateTime>,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

const ALL_COLUMNS: &str = "id, email, name, password_hash, is_verified, \
     verification_token, verification_expires_at, reset_token, \
     reset_expires_at, last_login, created_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {ALL_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new unverified user with a pending verification code.
    pub async fn create(
        db: &PgPool,
        email: &str,
        name: &str,
        password_hash: &str,
        verification_token: &str,
        verification_expires_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, verification_token, verification_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ALL_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .bind(verification_token)
        .bind(verification_expires_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Mark the account verified and clear the code in one statement. The
    /// single UPDATE is what keeps a concurrent attempt with the same code
    /// from succeeding twice.
    pub async fn consume_verification(db: &PgPool, code: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET is_verified = TRUE,
                verification_token = NULL,
                verification_expires_at = NULL
            WHERE verification_token = $1 AND verification_expires_at > now()
            RETURNING {ALL_COLUMNS}
            "#
        ))
        .bind(code)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn touch_last_login(db: &PgPool, id: Uuid) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET last_login = now() WHERE id = $1 RETURNING {ALL_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn set_reset_token(
        db: &PgPool,
        id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET reset_token = $2, reset_expires_at = $3 WHERE id = $1")
            .bind(id)
            .bind(token)
            .bind(expires_at)
            .execute(db)
            .await?;
        Ok(())
    }

    /// Replace the password and clear the reset token in one statement.
    pub async fn consume_reset(
        db: &PgPool,
        token: &str,
        new_password_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_token = NULL,
                reset_expires_at = NULL
            WHERE reset_token = $1 AND reset_expires_at > now()
            RETURNING {ALL_COLUMNS}
            "#
        ))
        .bind(token)
        .bind(new_password_hash)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Public projection for check-auth; the password hash is excluded at
    /// the query level, not just stripped from the response.
    pub async fn find_public_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<PublicUser>> {
        let user = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, email, name, is_verified, last_login, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
