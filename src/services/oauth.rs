use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::{OpeneduSettings, Settings};

const OAUTH_TIMEOUT_SECONDS: u64 = 30;

/// Authorization-code client for the openedu provider. The profile fetch is
/// part of the strategy here rather than a patched library method: the
/// token-bearing GET and the JSON parse both surface as strategy errors.
#[derive(Debug, Clone)]
pub(crate) struct OpenEduOAuth {
    client: Client,
    settings: OpeneduSettings,
}

#[derive(Debug, Error)]
pub(crate) enum OAuthError {
    #[error("oauth transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("authorization url is invalid: {0}")]
    InvalidUrl(String),
    #[error("token endpoint responded with status {0}")]
    TokenStatus(StatusCode),
    #[error("token response missing access_token")]
    MissingAccessToken,
    #[error("failed to fetch user profile: status {0}")]
    ProfileStatus(StatusCode),
    #[error("malformed profile payload: {0}")]
    MalformedProfile(#[from] serde_json::Error),
}

/// The identity document the provider's profile endpoint returns.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProviderProfile {
    pub(crate) username: String,
    #[serde(default, alias = "name")]
    pub(crate) full_name: Option<String>,
}

impl OpenEduOAuth {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(OAUTH_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self { client, settings: settings.openedu().clone() })
    }

    pub(crate) fn authorize_url(&self, state: &str) -> Result<String, OAuthError> {
        let mut url = Url::parse(&self.settings.authorization_url)
            .map_err(|err| OAuthError::InvalidUrl(err.to_string()))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.callback_url)
            .append_pair("state", state);

        Ok(url.into())
    }

    pub(crate) async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("redirect_uri", self.settings.callback_url.as_str()),
        ];

        let response =
            self.client.post(&self.settings.token_url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::TokenStatus(status));
        }

        let body: Value = response.json().await?;
        body.get("access_token")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or(OAuthError::MissingAccessToken)
    }

    pub(crate) async fn fetch_profile(
        &self,
        access_token: &str,
    ) -> Result<ProviderProfile, OAuthError> {
        let response = self
            .client
            .get(&self.settings.user_profile_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OAuthError::ProfileStatus(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
