use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};

use super::{repo_types::Person, services::StoredPhoto};

pub async fn list_by_user(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<Person>> {
    let rows = sqlx::query_as::<_, Person>(
        r#"
        SELECT id, user_id, full_name, photo_url, photo_key, created_at
          FROM people
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list people by user")?;
    Ok(rows)
}

pub async fn insert_person(
    db: &PgPool,
    user_id: i64,
    full_name: &str,
    photo: Option<&StoredPhoto>,
) -> anyhow::Result<Person> {
    let row = sqlx::query_as::<_, Person>(
        r#"
        INSERT INTO people (user_id, full_name, photo_url, photo_key)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, full_name, photo_url, photo_key, created_at
        "#,
    )
    .bind(user_id)
    .bind(full_name)
    .bind(photo.map(|p| p.url.as_str()))
    .bind(photo.map(|p| p.key.as_str()))
    .fetch_one(db)
    .await
    .context("insert person")?;
    Ok(row)
}

/// `None` when nothing matched; otherwise the removed row's photo key.
pub async fn delete_person_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    person_id: i64,
) -> anyhow::Result<Option<Option<String>>> {
    let row = sqlx::query_scalar::<_, Option<String>>(
        r#"
        DELETE FROM people
         WHERE id = $1 AND user_id = $2
        RETURNING photo_key
        "#,
    )
    .bind(person_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await
    .context("delete person")?;
    Ok(row)
}

pub async fn photo_key_in_use_tx(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
) -> anyhow::Result<bool> {
    let in_use = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM people WHERE photo_key = $1)",
    )
    .bind(key)
    .fetch_one(&mut **tx)
    .await
    .context("check photo key usage")?;
    Ok(in_use)
}
