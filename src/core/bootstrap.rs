use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::{Provider, UserRole};
use crate::repositories;

/// Creates the first administrator account on a fresh database so the portal
/// is reachable before any external identity provider is wired up. No-op if
/// the account exists or no password is configured.
pub(crate) async fn ensure_first_administrator(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not set; skipping default administrator");
        return Ok(());
    }

    let existing = repositories::users::find_by_username_provider(
        state.db(),
        &admin.first_admin_username,
        Provider::Local,
    )
    .await?;

    if existing.is_some() {
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_admin_password)
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    let now = primitive_now_utc();

    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &admin.first_admin_username,
            full_name: "Administrator",
            role: UserRole::Administrator,
            provider: Provider::Local,
            hashed_password: Some(hashed_password),
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!(username = %admin.first_admin_username, "Default administrator created");
    Ok(())
}
