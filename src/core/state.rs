use std::sync::Arc;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle, sessions::SessionStore};
use crate::services::edx::ExamBridge;
use crate::services::oauth::OpenEduOAuth;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    db: PgPool,
    redis: RedisHandle,
    sessions: SessionStore,
    bridge: ExamBridge,
    oauth: OpenEduOAuth,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        db: PgPool,
        redis: RedisHandle,
        sessions: SessionStore,
        bridge: ExamBridge,
        oauth: OpenEduOAuth,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, db, redis, sessions, bridge, oauth }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn db(&self) -> &PgPool {
        &self.inner.db
    }

    pub(crate) fn redis(&self) -> &RedisHandle {
        &self.inner.redis
    }

    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    pub(crate) fn bridge(&self) -> &ExamBridge {
        &self.inner.bridge
    }

    pub(crate) fn oauth(&self) -> &OpenEduOAuth {
        &self.inner.oauth
    }
}
