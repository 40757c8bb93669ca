use std::env;

use super::types::{ConfigError, Environment};

const DEFAULT_CORS_ORIGINS: &[&str] =
    &["http://localhost:5173", "http://localhost:3000", "http://localhost:8080"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

pub(super) fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_i64(field: &'static str, value: String) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

pub(super) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref() {
        Some("production") | Some("prod") => Environment::Production,
        Some("staging") => Environment::Staging,
        Some("test") => Environment::Test,
        _ => Environment::Development,
    }
}

pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let Some(raw) = value else {
        return Ok(default_cors_origins());
    };

    if raw.trim().is_empty() {
        return Ok(default_cors_origins());
    }

    if raw.trim_start().starts_with('[') {
        let parsed: Vec<String> =
            serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?;
        if parsed.is_empty() {
            return Ok(default_cors_origins());
        }
        return Ok(parsed);
    }

    let items: Vec<String> = raw
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();

    if items.is_empty() {
        return Ok(default_cors_origins());
    }

    Ok(items)
}

fn default_cors_origins() -> Vec<String> {
    DEFAULT_CORS_ORIGINS.iter().map(|origin| origin.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_accept_json_and_csv() {
        let json = parse_cors_origins(Some("[\"https://a.example\"]".to_string())).unwrap();
        assert_eq!(json, vec!["https://a.example"]);

        let csv = parse_cors_origins(Some("https://a.example, https://b.example".to_string()))
            .unwrap();
        assert_eq!(csv, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn empty_cors_value_falls_back_to_defaults() {
        let origins = parse_cors_origins(Some("  ".to_string())).unwrap();
        assert!(!origins.is_empty());
    }

    #[test]
    fn environment_parses_known_tags() {
        assert_eq!(parse_environment(Some("production".into())), Environment::Production);
        assert_eq!(parse_environment(Some("test".into())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }
}
