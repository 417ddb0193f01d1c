use crate::auth::repo_types::User;
use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, password_hash, is_active, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, password_hash, is_active, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        email: &str,
        display_name: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, display_name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, display_name, password_hash, is_active, created_at
            "#,
        )
        .bind(email)
        .bind(display_name)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

/// Blocks a token until it would have expired anyway.
pub async fn revoke_token(db: &PgPool, jti: Uuid, expires_at: OffsetDateTime) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO revoked_tokens (jti, expires_at)
        VALUES ($1, $2)
        ON CONFLICT (jti) DO NOTHING
        "#,
    )
    .bind(jti)
    .bind(expires_at)
    .execute(db)
    .await
    .context("revoke token")?;
    Ok(())
}

pub async fn purge_expired_revocations(db: &PgPool) -> anyhow::Result<u64> {
    let result = sqlx::query(r#"DELETE FROM revoked_tokens WHERE expires_at < now()"#)
        .execute(db)
        .await
        .context("purge revoked tokens")?;
    Ok(result.rows_affected())
}

/// True when the user exists, is active, and the token has not been revoked.
pub async fn session_is_valid(db: &PgPool, user_id: Uuid, jti: Uuid) -> anyhow::Result<bool> {
    let valid: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM users WHERE id = $1 AND is_active)
           AND NOT EXISTS (SELECT 1 FROM revoked_tokens WHERE jti = $2)
        "#,
    )
    .bind(user_id)
    .bind(jti)
    .fetch_one(db)
    .await
    .context("check session")?;
    Ok(valid)
}

/// True when `err` wraps a Postgres unique-constraint violation (`23505`).
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db)) => db.is_unique_violation(),
        _ => false,
    }
}
