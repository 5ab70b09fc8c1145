use sqlx::FromRow;
use time::OffsetDateTime;

/// Row of `excel_tables`; `data` is the stored JSON text.
#[derive(Debug, Clone, FromRow)]
pub struct TableRow {
    pub id: i64,
    pub name: String,
    pub data: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct CreatedTable {
    pub id: i64,
    pub name: String,
    pub created_at: OffsetDateTime,
}
