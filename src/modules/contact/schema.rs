use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// One row per (owner, hashed phone number). The set is replaced wholesale
/// on every sync; there are no partial updates.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ContactEntity {
    pub user_id: Uuid,
    pub contact_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
