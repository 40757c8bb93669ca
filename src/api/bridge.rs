use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentInspector, CurrentStudent};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::Provider;
use crate::repositories;
use crate::schemas::exam::{
    ExamActionRequest, ExamRecordResponse, InitSessionRequest, InitSessionResponse,
    StopExamRequest,
};
use crate::services::edx::{BridgeError, StopExamParams};

pub(crate) fn exams_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_exams))
        .route("/start", post(start_exam))
        .route("/stop", post(stop_exam))
        .route("/status", post(exam_status))
}

pub(crate) fn edx_router() -> Router<AppState> {
    Router::new().route("/init", post(init_session))
}

/// Best-effort provider sync, then the caller's stored exam records. A dead
/// provider only means the list is served from what was synced before.
async fn list_exams(
    State(state): State<AppState>,
    CurrentStudent(user): CurrentStudent,
) -> Result<Json<Vec<ExamRecordResponse>>, ApiError> {
    let fetched = state.bridge().fetch_exams(user.provider, &user.username).await;

    if !fetched.is_empty() {
        let records: Vec<_> = fetched
            .iter()
            .map(|record| repositories::exams::UpsertExamRecord {
                exam_id: &record.exam_id,
                left_date: &record.left_date,
                right_date: &record.right_date,
                subject: &record.subject,
                duration: record.duration,
            })
            .collect();

        repositories::exams::add_many(state.db(), &user.id, &records, primitive_now_utc())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to store exam records"))?;
    }

    let stored = repositories::exams::list_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam records"))?;

    Ok(Json(stored.into_iter().map(ExamRecordResponse::from_db).collect()))
}

async fn start_exam(
    State(state): State<AppState>,
    CurrentInspector(_inspector): CurrentInspector,
    Json(payload): Json<ExamActionRequest>,
) -> Result<(), ApiError> {
    state
        .bridge()
        .start_exam(payload.provider, &payload.exam_code)
        .await
        .map_err(|err| bridge_failure(err, "start"))
}

async fn stop_exam(
    State(state): State<AppState>,
    CurrentInspector(_inspector): CurrentInspector,
    Json(payload): Json<StopExamRequest>,
) -> Result<(), ApiError> {
    let record_locator = match payload.record_locator {
        Some(locator) => locator,
        // Older proctoring clients omit the locator; the registered session
        // for the exam code carries it as the session id.
        None => {
            let session = repositories::exam_sessions::find_by_exam_code(
                state.db(),
                &payload.exam_code,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load exam session"))?
            .ok_or_else(|| {
                ApiError::BadRequest("No session registered for this exam code".to_string())
            })?;
            session.id
        }
    };

    state
        .bridge()
        .stop_exam(
            payload.provider,
            StopExamParams {
                exam_code: &payload.exam_code,
                record_locator: &record_locator,
                resolution: payload.resolution,
                comment: &payload.comment,
            },
        )
        .await
        .map_err(|err| bridge_failure(err, "stop"))
}

async fn exam_status(
    State(state): State<AppState>,
    CurrentInspector(_inspector): CurrentInspector,
    Json(payload): Json<ExamActionRequest>,
) -> Result<(), ApiError> {
    state
        .bridge()
        .exam_status(payload.provider, &payload.exam_code)
        .await
        .map_err(|err| bridge_failure(err, "status"))
}

/// Unauthenticated registration hook the provider calls when a proctored
/// attempt begins.
async fn init_session(
    State(state): State<AppState>,
    Json(payload): Json<InitSessionRequest>,
) -> Result<Json<InitSessionResponse>, ApiError> {
    let username = non_empty(payload.org_extra.username.as_deref())
        .ok_or_else(|| ApiError::BadRequest("orgExtra.username is required".to_string()))?;
    let exam_id = non_empty(payload.org_extra.exam_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("orgExtra.examID is required".to_string()))?;
    let exam_code = non_empty(payload.exam_code.as_deref())
        .ok_or_else(|| ApiError::BadRequest("examCode is required".to_string()))?;

    let session = repositories::exam_sessions::update_code(
        state.db(),
        repositories::exam_sessions::UpdateCode {
            username,
            exam_id,
            exam_code,
            provider: Provider::Openedu,
        },
        primitive_now_utc(),
    )
    .await
    .map_err(|err| {
        tracing::warn!(error = %err, "Failed to register exam session");
        ApiError::BadRequest("Failed to register exam session".to_string())
    })?;

    Ok(Json(InitSessionResponse { session_id: session.id }))
}

fn bridge_failure(err: BridgeError, operation: &str) -> ApiError {
    tracing::warn!(error = %err, operation, "Provider exam operation failed");
    ApiError::BadRequest(format!("Provider {operation} operation failed"))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::non_empty;

    #[test]
    fn non_empty_rejects_missing_and_blank() {
        assert_eq!(non_empty(None), None);
        assert_eq!(non_empty(Some("")), None);
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(Some(" ivanov ")), Some("ivanov"));
    }
}
