use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;

use crate::api::errors::ApiError;
use crate::core::state::AppState;
use crate::db::models::User;
use crate::db::types::UserRole;

pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentStudent(pub(crate) User);
pub(crate) struct CurrentInspector(pub(crate) User);
#[allow(dead_code)]
pub(crate) struct CurrentAdministrator(pub(crate) User);

/// Core authorization predicate: an authenticated identity must be present,
/// and when a minimum role is asked for, the identity's role must be at
/// least that. Unauthenticated is 401, insufficient is 403.
pub(crate) fn check_role(user: Option<&User>, min_role: Option<UserRole>) -> Result<(), ApiError> {
    let Some(user) = user else {
        return Err(ApiError::Unauthorized("Not authenticated"));
    };

    if let Some(min_role) = min_role {
        if user.role < min_role {
            return Err(ApiError::Forbidden("Not enough permissions"));
        }
    }

    Ok(())
}

/// Path-parameter ownership check: the identity may only touch itself.
pub(crate) fn require_myself(user: &User, user_id: &str) -> Result<(), ApiError> {
    if user.id == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions"))
    }
}

/// Inspectors and administrators pass for any identity; everyone else only
/// for their own.
pub(crate) fn require_inspector_or_myself(user: &User, user_id: &str) -> Result<(), ApiError> {
    if user.role > UserRole::Student || user.id == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let token = app_state
            .sessions()
            .token_from_headers(&parts.headers)
            .ok_or(ApiError::Unauthorized("Not authenticated"))?;

        let user = app_state
            .sessions()
            .load(&token)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load session"))?
            .ok_or(ApiError::Unauthorized("Not authenticated"))?;

        if !user.is_active {
            return Err(ApiError::Unauthorized("Not authenticated"));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        check_role(Some(&user), Some(UserRole::Student))?;
        Ok(CurrentStudent(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentInspector {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        check_role(Some(&user), Some(UserRole::Inspector))?;
        Ok(CurrentInspector(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdministrator {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        check_role(Some(&user), Some(UserRole::Administrator))?;
        Ok(CurrentAdministrator(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::Provider;

    fn user_with_role(role: UserRole) -> User {
        let now = crate::core::time::primitive_now_utc();
        User {
            id: "u-1".to_string(),
            username: "ivanov".to_string(),
            full_name: "Ivan Ivanov".to_string(),
            role,
            provider: Provider::Local,
            hashed_password: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn missing_identity_is_unauthorized() {
        let err = check_role(None, None).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));

        let err = check_role(None, Some(UserRole::Inspector)).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn no_minimum_role_passes_any_identity() {
        let user = user_with_role(UserRole::Student);
        assert!(check_role(Some(&user), None).is_ok());
    }

    #[test]
    fn higher_roles_satisfy_lower_checks() {
        let admin = user_with_role(UserRole::Administrator);
        assert!(check_role(Some(&admin), Some(UserRole::Student)).is_ok());
        assert!(check_role(Some(&admin), Some(UserRole::Inspector)).is_ok());
        assert!(check_role(Some(&admin), Some(UserRole::Administrator)).is_ok());

        let inspector = user_with_role(UserRole::Inspector);
        assert!(check_role(Some(&inspector), Some(UserRole::Inspector)).is_ok());
    }

    #[test]
    fn insufficient_role_is_forbidden() {
        let student = user_with_role(UserRole::Student);
        let err = check_role(Some(&student), Some(UserRole::Inspector)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let inspector = user_with_role(UserRole::Inspector);
        let err = check_role(Some(&inspector), Some(UserRole::Administrator)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn myself_check_compares_ids() {
        let user = user_with_role(UserRole::Student);
        assert!(require_myself(&user, "u-1").is_ok());
        assert!(matches!(require_myself(&user, "u-2").unwrap_err(), ApiError::Forbidden(_)));
    }

    #[test]
    fn inspector_or_myself_accepts_either() {
        let student = user_with_role(UserRole::Student);
        assert!(require_inspector_or_myself(&student, "u-1").is_ok());
        assert!(matches!(
            require_inspector_or_myself(&student, "u-2").unwrap_err(),
            ApiError::Forbidden(_)
        ));

        let inspector = user_with_role(UserRole::Inspector);
        assert!(require_inspector_or_myself(&inspector, "someone-else").is_ok());
    }
}
