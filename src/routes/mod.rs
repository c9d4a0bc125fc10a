pub mod appointments;
pub mod auth;
pub mod companies;
pub mod otp;
pub mod slots;
pub mod two_factor;

use log::warn;
use mongodb::bson::{oid::ObjectId, DateTime};
use validator::ValidationErrors;

use crate::app_state::AppState;
use crate::guards::AuthGuard;
use crate::models::Company;
use crate::utils::ApiError;

pub(crate) fn parse_id(value: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(value).map_err(|_| ApiError::bad_request(format!("Invalid {} id", what)))
}

/// Fixed-window limiter backed by the shared store, so limits hold across
/// server processes.
pub(crate) async fn rate_limit(
    state: &AppState,
    key: &str,
    limit: i32,
    window_ms: i64,
) -> Result<(), ApiError> {
    let count = state.rate_limits.hit(key, window_ms, DateTime::now()).await?;
    if count > limit {
        warn!("Rate limit hit for {}", key);
        return Err(ApiError::too_many_requests(
            "Too many requests. Please try later.",
        ));
    }
    Ok(())
}

pub(crate) async fn find_company(state: &AppState, id: &ObjectId) -> Result<Company, ApiError> {
    state
        .companies
        .find_company(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Company not found"))
}

/// Loads the company and checks that the caller owns it.
pub(crate) async fn owned_company(
    state: &AppState,
    id: &ObjectId,
    auth: &AuthGuard,
) -> Result<Company, ApiError> {
    let company = find_company(state, id).await?;
    if company.owner_id != auth.user_id {
        return Err(ApiError::forbidden("You do not manage this company"));
    }
    Ok(company)
}

/// First message attached to any failed field.
pub(crate) fn validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid request".to_string())
}
