use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::{self, CurrentInspector, CurrentUser};
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::profile::IdentityResponse;

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_limit() -> i64 {
    100
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", get(list_users)).route("/:user_id", get(get_user))
}

async fn list_users(
    State(state): State<AppState>,
    CurrentInspector(_inspector): CurrentInspector,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<IdentityResponse>>, ApiError> {
    let users = repositories::users::list(state.db(), params.skip, params.limit)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(users.into_iter().map(IdentityResponse::from_db).collect()))
}

async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<IdentityResponse>, ApiError> {
    guards::require_inspector_or_myself(&caller, &user_id)?;

    let user = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(IdentityResponse::from_db(user)))
}
