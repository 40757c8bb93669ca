use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use time::OffsetDateTime;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::Provider;
use crate::repositories;
use crate::schemas::profile::{
    IdentityResponse, LoginRequest, OAuthCallbackQuery, SsoCallbackPayload,
};

/// Max attempts per window for the local login endpoint.
const LOGIN_RATE_LIMIT: u64 = 10;
const LOGIN_RATE_WINDOW_SECONDS: u64 = 60;

/// One-time OAuth state parameters park here while the user is away at the
/// provider.
const OAUTH_STATE_PREFIX: &str = "oauth:state:";
const OAUTH_STATE_TTL_SECONDS: u64 = 600;

const SUCCESS_REDIRECT: &str = "/";
const FAILURE_REDIRECT: &str = "/#login";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(current_identity))
        .route("/login", post(login))
        .route("/openedu", get(openedu_begin))
        .route("/openedu/callback", get(openedu_callback))
        .route("/ifmosso/callback", post(ifmosso_callback))
        .route("/logout", get(logout))
}

async fn current_identity(CurrentUser(user): CurrentUser) -> Json<IdentityResponse> {
    Json(IdentityResponse::from_db(user))
}

async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let rate_key = format!("rl:login:{}", payload.username);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, LOGIN_RATE_LIMIT, LOGIN_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many login attempts, try again later"));
    }

    let user = repositories::users::find_by_username_provider(
        state.db(),
        &payload.username,
        Provider::Local,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load user"))?
    .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let hash = user
        .hashed_password
        .as_deref()
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(&payload.password, hash)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    let token = state
        .sessions()
        .create(&user)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create session"))?;

    log_access(&state, &user, &headers).await;

    let cookie = state.sessions().cookie_for(&token);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(IdentityResponse::from_db(user)),
    )
        .into_response())
}

async fn openedu_begin(State(state): State<AppState>) -> Response {
    let oauth_state = security::generate_token();
    let parked = state
        .redis()
        .set_ex(&format!("{OAUTH_STATE_PREFIX}{oauth_state}"), "1", OAUTH_STATE_TTL_SECONDS)
        .await;

    match parked {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!("OAuth state could not be parked; session backend unavailable");
            return Redirect::to(FAILURE_REDIRECT).into_response();
        }
        Err(err) => {
            tracing::warn!(error = %err, "Failed to park OAuth state");
            return Redirect::to(FAILURE_REDIRECT).into_response();
        }
    }

    match state.oauth().authorize_url(&oauth_state) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to build authorization URL");
            Redirect::to(FAILURE_REDIRECT).into_response()
        }
    }
}

async fn openedu_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    if let Some(error) = &query.error {
        tracing::warn!(%error, "Provider denied the authorization request");
        return Redirect::to(FAILURE_REDIRECT).into_response();
    }

    let (Some(code), Some(oauth_state)) = (&query.code, &query.state) else {
        return Redirect::to(FAILURE_REDIRECT).into_response();
    };

    let known = state.redis().get_del(&format!("{OAUTH_STATE_PREFIX}{oauth_state}")).await;
    if !matches!(known, Ok(Some(_))) {
        tracing::warn!("OAuth callback carried an unknown state parameter");
        return Redirect::to(FAILURE_REDIRECT).into_response();
    }

    let profile = async {
        let access_token = state.oauth().exchange_code(code).await?;
        state.oauth().fetch_profile(&access_token).await
    }
    .await;

    let profile = match profile {
        Ok(profile) => profile,
        Err(err) => {
            tracing::warn!(error = %err, "OAuth login failed");
            return Redirect::to(FAILURE_REDIRECT).into_response();
        }
    };

    complete_external_login(
        &state,
        &headers,
        Provider::Openedu,
        &profile.username,
        profile.full_name.as_deref(),
    )
    .await
}

async fn ifmosso_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(payload): Form<SsoCallbackPayload>,
) -> Response {
    let settings = state.settings().ifmosso();

    let skew = (OffsetDateTime::now_utc().unix_timestamp() - payload.ts).abs();
    if skew > settings.max_skew_seconds {
        tracing::warn!(username = %payload.username, skew, "SSO callback timestamp out of range");
        return Redirect::to(FAILURE_REDIRECT).into_response();
    }

    let valid = security::verify_sso_signature(
        &settings.secret_key,
        &payload.username,
        payload.ts,
        &payload.signature,
    );
    if !valid {
        tracing::warn!(username = %payload.username, "SSO callback signature rejected");
        return Redirect::to(FAILURE_REDIRECT).into_response();
    }

    complete_external_login(
        &state,
        &headers,
        Provider::Ifmosso,
        &payload.username,
        payload.full_name.as_deref(),
    )
    .await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = state.sessions().token_from_headers(&headers) {
        if let Err(err) = state.sessions().destroy(&token).await {
            tracing::warn!(error = %err, "Failed to destroy session");
        }
    }

    let cookie = state.sessions().clear_cookie();
    (AppendHeaders([(header::SET_COOKIE, cookie)]), StatusCode::OK).into_response()
}

/// Shared tail of the delegated strategies: resolve or create the identity,
/// open a session and send the browser back into the app.
async fn complete_external_login(
    state: &AppState,
    headers: &HeaderMap,
    provider: Provider,
    username: &str,
    full_name: Option<&str>,
) -> Response {
    let user = repositories::users::find_or_create(
        state.db(),
        provider,
        username,
        full_name,
        primitive_now_utc(),
    )
    .await;

    let user = match user {
        Ok(user) => user,
        Err(err) => {
            tracing::error!(error = %err, "Failed to resolve identity");
            return Redirect::to(FAILURE_REDIRECT).into_response();
        }
    };

    if !user.is_active {
        tracing::warn!(username = %user.username, "Inactive identity attempted login");
        return Redirect::to(FAILURE_REDIRECT).into_response();
    }

    let token = match state.sessions().create(&user).await {
        Ok(token) => token,
        Err(err) => {
            tracing::error!(error = %err, "Failed to create session");
            return Redirect::to(FAILURE_REDIRECT).into_response();
        }
    };

    log_access(state, &user, headers).await;

    let cookie = state.sessions().cookie_for(&token);
    (AppendHeaders([(header::SET_COOKIE, cookie)]), Redirect::to(SUCCESS_REDIRECT))
        .into_response()
}

async fn log_access(state: &AppState, user: &User, headers: &HeaderMap) {
    let ip = client_ip(headers);
    if let Err(err) =
        repositories::access_log::insert(state.db(), &user.id, &ip, primitive_now_utc()).await
    {
        tracing::warn!(error = %err, "Failed to record access log entry");
    }
}

fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        return real_ip.to_string();
    }

    "unknown".to_string()
}

#[cfg(test)]
mod tests {
    use super::client_ip;
    use axum::http::HeaderMap;

    #[test]
    fn client_ip_prefers_forwarded_chain_head() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_to_real_ip_then_unknown() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_ip(&headers), "10.0.0.2");

        assert_eq!(client_ip(&HeaderMap::new()), "unknown");
    }
}
