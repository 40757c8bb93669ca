use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::core::{
    config::Settings, redis::RedisHandle, sessions::SessionStore, state::AppState,
};
use crate::services::edx::ExamBridge;
use crate::services::oauth::OpenEduOAuth;

/// Serializes tests that mutate process environment variables.
pub(crate) fn env_lock_blocking() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let lock = LOCK.get_or_init(|| Mutex::new(()));
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) fn set_test_env() {
    std::env::set_var("PROCTOR_ENV", "test");
    std::env::set_var("PROCTOR_STRICT_CONFIG", "0");
    std::env::remove_var("DATABASE_URL");
    std::env::set_var("POSTGRES_SERVER", "127.0.0.1");
    std::env::set_var("POSTGRES_PORT", "5432");
    std::env::set_var("POSTGRES_USER", "proctor_test");
    std::env::set_var("POSTGRES_PASSWORD", "proctor_test");
    std::env::set_var("POSTGRES_DB", "proctor_portal_test");
    std::env::set_var("REDIS_HOST", "127.0.0.1");
    std::env::set_var("REDIS_PORT", "6379");
    std::env::set_var("REDIS_DB", "1");
    std::env::remove_var("REDIS_PASSWORD");
    std::env::remove_var("SESSION_COOKIE_NAME");
    std::env::remove_var("PROJECT_NAME");
    std::env::set_var("IFMOSSO_SECRET_KEY", "test-sso-secret");
    std::env::remove_var("FIRST_ADMIN_PASSWORD");
}

/// Application state wired from test env vars. The database pool is lazy and
/// the redis handle stays disconnected, so router tests exercising only
/// validation and authentication paths never need live backends.
pub(crate) fn build_state() -> AppState {
    let settings = Settings::load().expect("settings");
    let db = sqlx::PgPool::connect_lazy(&settings.database().database_url()).expect("lazy pool");
    let redis = RedisHandle::new(settings.redis().redis_url());
    let sessions = SessionStore::from_settings(&settings, redis.clone());
    let bridge = ExamBridge::from_settings(&settings).expect("bridge");
    let oauth = OpenEduOAuth::from_settings(&settings).expect("oauth client");
    AppState::new(settings, db, redis, sessions, bridge, oauth)
}
