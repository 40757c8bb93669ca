use axum::{
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::bridge;
use crate::api::handlers;
use crate::api::profile;
use crate::api::users;
use crate::core::{config::Settings, state::AppState};

pub(crate) fn router(state: AppState) -> Router {
    let cors = build_cors_layer(state.settings());

    let api = Router::new()
        .nest("/exams", bridge::exams_router())
        .nest("/edx", bridge::edx_router())
        .nest("/users", users::router());

    let request_id_header = HeaderName::from_static("x-request-id");
    let request_id_header_for_span = request_id_header.clone();
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<_>| {
            let request_id = request
                .headers()
                .get(&request_id_header_for_span)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_response(|response: &Response<axum::body::Body>, latency: Duration, _span: &Span| {
            let status_label = response.status().as_u16().to_string();
            metrics::counter!(
                "http_requests_total",
                "status" => status_label.clone()
            )
            .increment(1);
            metrics::histogram!(
                "http_request_duration_seconds",
                "status" => status_label
            )
            .record(latency.as_secs_f64());
        });

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz))
        .nest("/profile", profile::router())
        .nest("/api", api)
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(trace_layer)
        .layer(cors);

    if state.settings().telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router.with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            COOKIE,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        // Wildcard origin cannot be combined with allow_credentials
        base.allow_origin(Any)
    } else {
        base.allow_credentials(true).allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use super::router;
    use axum::{body::to_bytes, body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::core::metrics;
    use crate::test_support;

    #[tokio::test]
    async fn root_returns_message() {
        let _guard = test_support::env_lock_blocking();
        test_support::set_test_env();
        std::env::remove_var("PROMETHEUS_ENABLED");

        let app = router(test_support::build_state());

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Proctor Portal API");
    }

    #[tokio::test]
    async fn metrics_disabled_returns_404() {
        let _guard = test_support::env_lock_blocking();
        test_support::set_test_env();
        std::env::remove_var("PROMETHEUS_ENABLED");

        let app = router(test_support::build_state());

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_enabled_returns_200() {
        let _guard = test_support::env_lock_blocking();
        test_support::set_test_env();
        std::env::set_var("PROMETHEUS_ENABLED", "1");

        let state = test_support::build_state();
        metrics::init(state.settings()).expect("metrics init");
        let app = router(state);

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn profile_without_cookie_is_unauthorized() {
        let _guard = test_support::env_lock_blocking();
        test_support::set_test_env();
        std::env::remove_var("PROMETHEUS_ENABLED");

        let app = router(test_support::build_state());

        let response = app
            .oneshot(Request::builder().uri("/profile").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn exams_without_cookie_is_unauthorized() {
        let _guard = test_support::env_lock_blocking();
        test_support::set_test_env();
        std::env::remove_var("PROMETHEUS_ENABLED");

        let app = router(test_support::build_state());

        let response = app
            .oneshot(Request::builder().uri("/api/exams").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn init_with_missing_fields_is_rejected() {
        let _guard = test_support::env_lock_blocking();
        test_support::set_test_env();
        std::env::remove_var("PROMETHEUS_ENABLED");

        let app = router(test_support::build_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/edx/init")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"examCode": "EX-1"}"#))
                    .unwrap(),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn logout_clears_the_session_cookie() {
        let _guard = test_support::env_lock_blocking();
        test_support::set_test_env();
        std::env::remove_var("PROMETHEUS_ENABLED");

        let app = router(test_support::build_state());

        let response = app
            .oneshot(Request::builder().uri("/profile/logout").body(Body::empty()).unwrap())
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get("set-cookie").expect("set-cookie").to_str().unwrap();
        assert!(cookie.starts_with("proctor_session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
