use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use crate::db::models::User;
use crate::db::types::{Provider, UserRole};

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) username: String,
    pub(crate) password: String,
}

/// The identity document handed to clients. Never exposes the stored hash.
#[derive(Debug, Serialize)]
pub(crate) struct IdentityResponse {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) provider: Provider,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl IdentityResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role: user.role,
            provider: user.provider,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Signed payload the institutional SSO posts back after its own login.
#[derive(Debug, Deserialize)]
pub(crate) struct SsoCallbackPayload {
    pub(crate) username: String,
    #[serde(default, alias = "fullname")]
    pub(crate) full_name: Option<String>,
    pub(crate) ts: i64,
    #[serde(alias = "sign")]
    pub(crate) signature: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OAuthCallbackQuery {
    pub(crate) code: Option<String>,
    pub(crate) state: Option<String>,
    pub(crate) error: Option<String>,
}
