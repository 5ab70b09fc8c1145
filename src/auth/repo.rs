use anyhow::Context;
use sqlx::{PgExecutor, PgPool, Postgres, Transaction};
use time::OffsetDateTime;

use crate::auth::repo_types::{SessionUser, User};

impl User {
    pub async fn find_by_login(db: &PgPool, login: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, password_hash, created_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(db)
        .await
        .context("find user by login")?;
        Ok(user)
    }

    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        login: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            RETURNING id, login, password_hash, created_at
            "#,
        )
        .bind(login)
        .bind(password_hash)
        .fetch_one(&mut **tx)
        .await
        .context("insert user")?;
        Ok(user)
    }
}

pub async fn insert_session<'e>(
    db: impl PgExecutor<'e>,
    user_id: i64,
    token: &str,
    expires_at: Option<OffsetDateTime>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sessions (user_id, token, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .execute(db)
    .await
    .context("insert session")?;
    Ok(())
}

/// Owner of `token`, if the session exists and has not expired.
pub async fn find_session_user(db: &PgPool, token: &str) -> anyhow::Result<Option<SessionUser>> {
    let row = sqlx::query_as::<_, SessionUser>(
        r#"
        SELECT s.user_id, u.login
          FROM sessions s
          JOIN users u ON u.id = s.user_id
         WHERE s.token = $1
           AND (s.expires_at IS NULL OR s.expires_at > now())
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
    .context("find session user")?;
    Ok(row)
}

pub async fn find_session_user_id(db: &PgPool, token: &str) -> anyhow::Result<Option<i64>> {
    let row = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT user_id
          FROM sessions
         WHERE token = $1
           AND (expires_at IS NULL OR expires_at > now())
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
    .context("find session user id")?;
    Ok(row)
}

/// Returns false when no session had this token.
pub async fn delete_session(db: &PgPool, token: &str) -> anyhow::Result<bool> {
    let done = sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(db)
        .await
        .context("delete session")?;
    Ok(done.rows_affected() > 0)
}
