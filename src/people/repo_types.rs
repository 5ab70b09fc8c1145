use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow)]
pub struct Person {
    pub id: i64,
    pub user_id: i64,
    pub full_name: String,
    pub photo_url: Option<String>,
    pub photo_key: Option<String>, // object-store key; internal only
    pub created_at: OffsetDateTime,
}
