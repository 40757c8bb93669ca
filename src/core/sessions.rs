use axum::http::{header, HeaderMap};
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::redis::RedisHandle;
use crate::core::security;
use crate::db::models::User;

const SESSION_KEY_PREFIX: &str = "sess:";

/// Redis-backed session store. The full identity object is stored verbatim
/// under an opaque token; the token travels in an HttpOnly cookie.
#[derive(Clone)]
pub(crate) struct SessionStore {
    redis: RedisHandle,
    cookie_name: String,
    ttl_minutes: u64,
}

#[derive(Debug, Error)]
pub(crate) enum SessionError {
    #[error("session backend unavailable")]
    Unavailable,
    #[error("session backend error: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("session payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

impl SessionStore {
    pub(crate) fn from_settings(settings: &Settings, redis: RedisHandle) -> Self {
        Self {
            redis,
            cookie_name: settings.session().cookie_name.clone(),
            ttl_minutes: settings.session().ttl_minutes,
        }
    }

    pub(crate) async fn create(&self, user: &User) -> Result<String, SessionError> {
        let token = security::generate_token();
        let payload = serde_json::to_string(user)?;
        let stored =
            self.redis.set_ex(&session_key(&token), &payload, self.ttl_minutes * 60).await?;
        if !stored {
            return Err(SessionError::Unavailable);
        }
        Ok(token)
    }

    pub(crate) async fn load(&self, token: &str) -> Result<Option<User>, SessionError> {
        let Some(payload) = self.redis.get(&session_key(token)).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    pub(crate) async fn destroy(&self, token: &str) -> Result<(), SessionError> {
        self.redis.del(&session_key(token)).await?;
        Ok(())
    }

    pub(crate) fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        let raw = headers.get(header::COOKIE)?.to_str().ok()?;
        cookie_value(raw, &self.cookie_name)
    }

    pub(crate) fn cookie_for(&self, token: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name,
            token,
            self.ttl_minutes * 60
        )
    }

    pub(crate) fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.cookie_name)
    }
}

fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

fn cookie_value(raw: &str, name: &str) -> Option<String> {
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::cookie_value;

    #[test]
    fn cookie_value_finds_named_cookie() {
        let raw = "theme=dark; proctor_session=abc123; lang=en";
        assert_eq!(cookie_value(raw, "proctor_session"), Some("abc123".to_string()));
        assert_eq!(cookie_value(raw, "theme"), Some("dark".to_string()));
        assert_eq!(cookie_value(raw, "missing"), None);
    }

    #[test]
    fn cookie_value_ignores_name_substrings() {
        let raw = "xproctor_session=nope";
        assert_eq!(cookie_value(raw, "proctor_session"), None);
    }
}
