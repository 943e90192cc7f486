use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// A category row. `user_id` is `None` for system-wide defaults.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub user_id: Option<Uuid>,
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Category as embedded in an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
    pub is_default: bool,
}
