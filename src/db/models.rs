use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{Provider, UserRole};

/// The authenticated identity. Serialized verbatim into the session store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) provider: Provider,
    pub(crate) hashed_password: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One active, proctored exam offering synced from the provider. The
/// validity window is stored as the provider sent it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamRecord {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) exam_id: String,
    pub(crate) left_date: Json<serde_json::Value>,
    pub(crate) right_date: Json<serde_json::Value>,
    pub(crate) subject: String,
    pub(crate) duration: i64,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamSession {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) exam_id: String,
    pub(crate) exam_code: String,
    pub(crate) provider: Provider,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
