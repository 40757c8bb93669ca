use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::config::{EdxSettings, Settings};
use crate::db::types::Provider;

const API_KEY_HEADER: &str = "X-Edx-Api-Key";
const USERNAME_PLACEHOLDER: &str = "{username}";
const EXAM_CODE_PLACEHOLDER: &str = "{examCode}";

/// Forwards exam lifecycle operations to the learning-platform provider.
/// Only openedu is integrated; every other provider tag is a no-op so
/// business handlers keep working for identities without a bridge.
#[derive(Debug, Clone)]
pub(crate) struct ExamBridge {
    client: Client,
    settings: EdxSettings,
}

#[derive(Debug, Error)]
pub(crate) enum BridgeError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider responded with status {0}")]
    Status(StatusCode),
    #[error("malformed provider payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A flattened exam offering ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct NewExamRecord {
    pub(crate) exam_id: String,
    pub(crate) left_date: Value,
    pub(crate) right_date: Value,
    pub(crate) subject: String,
    pub(crate) duration: i64,
}

pub(crate) struct StopExamParams<'a> {
    pub exam_code: &'a str,
    pub record_locator: &'a str,
    pub resolution: bool,
    pub comment: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExamGroup {
    #[serde(default)]
    start: Value,
    #[serde(default)]
    end: Value,
    #[serde(default)]
    name: String,
    #[serde(default)]
    exams: Vec<ProviderExam>,
}

#[derive(Debug, Deserialize)]
struct ProviderExam {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    is_proctored: bool,
    #[serde(default)]
    exam_name: String,
    #[serde(default)]
    time_limit_mins: i64,
}

#[derive(Debug, Serialize)]
pub(crate) enum ReviewStatus {
    Clean,
    Suspicious,
    #[serde(rename = "Rules Violation")]
    #[allow(dead_code)]
    RulesViolation,
    #[serde(rename = "Not Reviewed")]
    #[allow(dead_code)]
    NotReviewed,
}

impl ReviewStatus {
    fn from_resolution(resolution: bool) -> Self {
        if resolution {
            Self::Clean
        } else {
            Self::Suspicious
        }
    }
}

#[derive(Debug, Serialize)]
struct ReviewOutcome<'a> {
    #[serde(rename = "examMetaData")]
    exam_meta_data: ExamMetaData<'a>,
    #[serde(rename = "reviewStatus")]
    review_status: ReviewStatus,
    #[serde(rename = "videoReviewLink")]
    video_review_link: &'a str,
}

#[derive(Debug, Serialize)]
struct ExamMetaData<'a> {
    #[serde(rename = "examCode")]
    exam_code: &'a str,
    #[serde(rename = "ssiRecordLocator")]
    ssi_record_locator: &'a str,
    #[serde(rename = "reviewedExam")]
    reviewed_exam: bool,
    #[serde(rename = "reviewerNotes")]
    reviewer_notes: &'a str,
}

impl ExamBridge {
    pub(crate) fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(settings.edx().timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build exam bridge HTTP client")?;

        Ok(Self { client, settings: settings.edx().clone() })
    }

    /// Best-effort sync of the identity's proctored exams. Provider outages
    /// and malformed payloads are logged and swallowed so the caller's
    /// request keeps going; the result is then simply empty.
    pub(crate) async fn fetch_exams(
        &self,
        provider: Provider,
        username: &str,
    ) -> Vec<NewExamRecord> {
        if provider != Provider::Openedu {
            return Vec::new();
        }

        let url = substitute(&self.settings.request_exams_url, USERNAME_PLACEHOLDER, username);
        tracing::debug!(%url, "provider request");

        match self.request_exam_groups(&url).await {
            Ok(groups) => flatten_exam_groups(groups),
            Err(err) => {
                tracing::warn!(error = %err, %url, "exam list fetch failed; continuing without sync");
                Vec::new()
            }
        }
    }

    pub(crate) async fn start_exam(
        &self,
        provider: Provider,
        exam_code: &str,
    ) -> Result<(), BridgeError> {
        if provider != Provider::Openedu {
            return Ok(());
        }

        let url = substitute(&self.settings.start_exam_url, EXAM_CODE_PLACEHOLDER, exam_code);
        self.get_expecting_success(&url).await
    }

    pub(crate) async fn stop_exam(
        &self,
        provider: Provider,
        params: StopExamParams<'_>,
    ) -> Result<(), BridgeError> {
        if provider != Provider::Openedu {
            return Ok(());
        }

        let outcome = ReviewOutcome {
            exam_meta_data: ExamMetaData {
                exam_code: params.exam_code,
                ssi_record_locator: params.record_locator,
                reviewed_exam: params.resolution,
                reviewer_notes: params.comment,
            },
            review_status: ReviewStatus::from_resolution(params.resolution),
            video_review_link: "",
        };

        let url = &self.settings.stop_exam_url;
        tracing::debug!(%url, "provider request");

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .json(&outcome)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Status(status));
        }
        Ok(())
    }

    pub(crate) async fn exam_status(
        &self,
        provider: Provider,
        exam_code: &str,
    ) -> Result<(), BridgeError> {
        if provider != Provider::Openedu {
            return Ok(());
        }

        let url = substitute(&self.settings.exam_status_url, EXAM_CODE_PLACEHOLDER, exam_code);
        self.get_expecting_success(&url).await
    }

    async fn request_exam_groups(
        &self,
        url: &str,
    ) -> Result<BTreeMap<String, ExamGroup>, BridgeError> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Status(status));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_expecting_success(&self, url: &str) -> Result<(), BridgeError> {
        tracing::debug!(%url, "provider request");

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.settings.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::Status(status));
        }
        Ok(())
    }
}

/// One record per exam item that is both active and proctored, labeled
/// `"<group name> (<exam name>)"` and windowed by the group dates.
fn flatten_exam_groups(groups: BTreeMap<String, ExamGroup>) -> Vec<NewExamRecord> {
    let mut records = Vec::new();
    for group in groups.into_values() {
        for exam in &group.exams {
            if !(exam.is_active && exam.is_proctored) {
                continue;
            }
            records.push(NewExamRecord {
                exam_id: value_to_string(&exam.id),
                left_date: group.start.clone(),
                right_date: group.end.clone(),
                subject: format!("{} ({})", group.name, exam.exam_name),
                duration: exam.time_limit_mins,
            });
        }
    }
    records
}

fn substitute(template: &str, placeholder: &str, value: &str) -> String {
    template.replace(placeholder, value)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_groups(value: Value) -> BTreeMap<String, ExamGroup> {
        serde_json::from_value(value).expect("exam groups")
    }

    #[test]
    fn flatten_keeps_only_active_proctored_exams() {
        let groups = parse_groups(json!({
            "A": {
                "start": 1,
                "end": 2,
                "name": "Math",
                "exams": [
                    {
                        "id": "e1",
                        "is_active": true,
                        "is_proctored": true,
                        "exam_name": "Final",
                        "time_limit_mins": 60
                    },
                    {
                        "id": "e2",
                        "is_active": false,
                        "is_proctored": true,
                        "exam_name": "Midterm",
                        "time_limit_mins": 30
                    }
                ]
            }
        }));

        let records = flatten_exam_groups(groups);
        assert_eq!(
            records,
            vec![NewExamRecord {
                exam_id: "e1".to_string(),
                left_date: json!(1),
                right_date: json!(2),
                subject: "Math (Final)".to_string(),
                duration: 60,
            }]
        );
    }

    #[test]
    fn flatten_skips_unproctored_and_tolerates_missing_exams() {
        let groups = parse_groups(json!({
            "A": {
                "start": "2026-01-01",
                "end": "2026-06-01",
                "name": "Physics",
                "exams": [
                    {
                        "id": 7,
                        "is_active": true,
                        "is_proctored": false,
                        "exam_name": "Quiz",
                        "time_limit_mins": 15
                    }
                ]
            },
            "B": {"start": 0, "end": 0, "name": "Empty"}
        }));

        assert!(flatten_exam_groups(groups).is_empty());
    }

    #[test]
    fn flatten_stringifies_numeric_exam_ids() {
        let groups = parse_groups(json!({
            "A": {
                "start": 1,
                "end": 2,
                "name": "Chem",
                "exams": [{
                    "id": 42,
                    "is_active": true,
                    "is_proctored": true,
                    "exam_name": "Lab",
                    "time_limit_mins": 45
                }]
            }
        }));

        let records = flatten_exam_groups(groups);
        assert_eq!(records[0].exam_id, "42");
    }

    #[test]
    fn review_outcome_wire_format() {
        let outcome = ReviewOutcome {
            exam_meta_data: ExamMetaData {
                exam_code: "EX-1",
                ssi_record_locator: "rec-9",
                reviewed_exam: false,
                reviewer_notes: "left the room",
            },
            review_status: ReviewStatus::from_resolution(false),
            video_review_link: "",
        };

        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({
                "examMetaData": {
                    "examCode": "EX-1",
                    "ssiRecordLocator": "rec-9",
                    "reviewedExam": false,
                    "reviewerNotes": "left the room"
                },
                "reviewStatus": "Suspicious",
                "videoReviewLink": ""
            })
        );
    }

    #[test]
    fn review_status_derivation() {
        assert!(matches!(ReviewStatus::from_resolution(true), ReviewStatus::Clean));
        assert!(matches!(ReviewStatus::from_resolution(false), ReviewStatus::Suspicious));
    }

    #[test]
    fn substitute_replaces_placeholders() {
        assert_eq!(
            substitute("https://edx.example/api/{username}/exams", "{username}", "ivanov"),
            "https://edx.example/api/ivanov/exams"
        );
        assert_eq!(
            substitute("https://edx.example/start/{examCode}", "{examCode}", "EX-1"),
            "https://edx.example/start/EX-1"
        );
    }

    mod live {
        use super::*;
        use axum::extract::Path;
        use axum::http::HeaderMap;
        use axum::routing::{get, post};
        use axum::{Json, Router};
        use serde_json::json;

        async fn spawn_provider(router: Router) -> String {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("addr");
            tokio::spawn(async move {
                axum::serve(listener, router).await.expect("serve");
            });
            format!("http://{addr}")
        }

        fn bridge_for(base: &str) -> ExamBridge {
            let _guard = crate::test_support::env_lock_blocking();
            crate::test_support::set_test_env();
            std::env::set_var(
                "EDX_REQUEST_EXAMS_URL",
                format!("{base}/exams/{{username}}"),
            );
            std::env::set_var("EDX_START_EXAM_URL", format!("{base}/start/{{examCode}}"));
            std::env::set_var("EDX_STOP_EXAM_URL", format!("{base}/stop"));
            std::env::set_var("EDX_EXAM_STATUS_URL", format!("{base}/status/{{examCode}}"));
            std::env::set_var("EDX_API_KEY", "test-api-key");
            let settings = Settings::load().expect("settings");
            ExamBridge::from_settings(&settings).expect("bridge")
        }

        #[tokio::test]
        async fn fetch_exams_flattens_provider_payload() {
            let provider = Router::new().route(
                "/exams/:username",
                get(|headers: HeaderMap, Path(username): Path<String>| async move {
                    assert_eq!(headers.get("X-Edx-Api-Key").unwrap(), "test-api-key");
                    assert_eq!(username, "ivanov");
                    Json(json!({
                        "course-1": {
                            "start": 10,
                            "end": 20,
                            "name": "Math",
                            "exams": [{
                                "id": "e1",
                                "is_active": true,
                                "is_proctored": true,
                                "exam_name": "Final",
                                "time_limit_mins": 60
                            }]
                        }
                    }))
                }),
            );
            let base = spawn_provider(provider).await;
            let bridge = bridge_for(&base);

            let records = bridge.fetch_exams(Provider::Openedu, "ivanov").await;
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].subject, "Math (Final)");
        }

        #[tokio::test]
        async fn fetch_exams_swallows_provider_errors() {
            let provider = Router::new().route(
                "/exams/:username",
                get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
            );
            let base = spawn_provider(provider).await;
            let bridge = bridge_for(&base);

            assert!(bridge.fetch_exams(Provider::Openedu, "ivanov").await.is_empty());
        }

        #[tokio::test]
        async fn fetch_exams_is_a_noop_for_other_providers() {
            // No server behind the configured URLs; the call must not reach out.
            let bridge = bridge_for("http://127.0.0.1:9");
            assert!(bridge.fetch_exams(Provider::Local, "ivanov").await.is_empty());
            assert!(bridge.fetch_exams(Provider::Unknown, "ivanov").await.is_empty());
        }

        #[tokio::test]
        async fn start_exam_maps_non_200_to_error() {
            let provider = Router::new()
                .route("/start/:code", get(|| async { axum::http::StatusCode::FORBIDDEN }));
            let base = spawn_provider(provider).await;
            let bridge = bridge_for(&base);

            let err = bridge.start_exam(Provider::Openedu, "EX-1").await.unwrap_err();
            assert!(matches!(err, BridgeError::Status(status) if status.as_u16() == 403));
            assert!(bridge.start_exam(Provider::Local, "EX-1").await.is_ok());
        }

        #[tokio::test]
        async fn stop_exam_posts_review_outcome() {
            let provider = Router::new().route(
                "/stop",
                post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(headers.get("X-Edx-Api-Key").unwrap(), "test-api-key");
                    assert_eq!(body["reviewStatus"], "Clean");
                    assert_eq!(body["examMetaData"]["examCode"], "EX-1");
                    assert_eq!(body["videoReviewLink"], "");
                    axum::http::StatusCode::OK
                }),
            );
            let base = spawn_provider(provider).await;
            let bridge = bridge_for(&base);

            bridge
                .stop_exam(
                    Provider::Openedu,
                    StopExamParams {
                        exam_code: "EX-1",
                        record_locator: "rec-1",
                        resolution: true,
                        comment: "ok",
                    },
                )
                .await
                .expect("stop exam");
        }

        #[tokio::test]
        async fn exam_status_maps_transport_failure_to_error() {
            // Nothing listens on port 9 (discard); connect fails fast.
            let bridge = bridge_for("http://127.0.0.1:9");
            let err = bridge.exam_status(Provider::Openedu, "EX-1").await.unwrap_err();
            assert!(matches!(err, BridgeError::Transport(_)));
        }
    }
}
