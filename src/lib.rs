pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, redis::RedisHandle, sessions::SessionStore, state::AppState, telemetry};
use crate::services::edx::ExamBridge;
use crate::services::oauth::OpenEduOAuth;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; sessions will be rejected until it returns");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let sessions = SessionStore::from_settings(&settings, redis.clone());
    let bridge = ExamBridge::from_settings(&settings)?;
    let oauth = OpenEduOAuth::from_settings(&settings)?;
    let state = AppState::new(settings, db_pool, redis.clone(), sessions, bridge, oauth);

    if let Err(err) = core::bootstrap::ensure_first_administrator(&state).await {
        tracing::error!(error = %err, "Failed to ensure default administrator");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Proctor Portal API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}
