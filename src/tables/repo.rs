use anyhow::Context;
use sqlx::PgPool;

use super::{
    dto::TableDocument,
    repo_types::{CreatedTable, TableRow},
};

pub async fn list_by_user(db: &PgPool, user_id: i64) -> anyhow::Result<Vec<TableRow>> {
    let rows = sqlx::query_as::<_, TableRow>(
        r#"
        SELECT id, name, data::text AS data, created_at, updated_at
          FROM excel_tables
         WHERE user_id = $1
         ORDER BY updated_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list tables by user")?;
    Ok(rows)
}

pub async fn insert_table(
    db: &PgPool,
    user_id: i64,
    doc: &TableDocument,
) -> anyhow::Result<CreatedTable> {
    let row = sqlx::query_as::<_, CreatedTable>(
        r#"
        INSERT INTO excel_tables (user_id, name, data)
        VALUES ($1, $2, $3::json)
        RETURNING id, name, created_at
        "#,
    )
    .bind(user_id)
    .bind(&doc.name)
    .bind(doc.data.get())
    .fetch_one(db)
    .await
    .context("insert table")?;
    Ok(row)
}

/// Rows owned by another user are left untouched; returns rows affected.
pub async fn update_table(
    db: &PgPool,
    user_id: i64,
    table_id: i64,
    doc: &TableDocument,
) -> anyhow::Result<u64> {
    let done = sqlx::query(
        r#"
        UPDATE excel_tables
           SET name = $1, data = $2::json, updated_at = now()
         WHERE id = $3 AND user_id = $4
        "#,
    )
    .bind(&doc.name)
    .bind(doc.data.get())
    .bind(table_id)
    .bind(user_id)
    .execute(db)
    .await
    .context("update table")?;
    Ok(done.rows_affected())
}
