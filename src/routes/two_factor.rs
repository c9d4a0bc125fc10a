use log::{error, info};
use mongodb::bson::DateTime;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use serde_json::json;

use super::auth::{check_two_factor_code, send_two_factor_code};
use crate::app_state::AppState;
use crate::guards::AuthGuard;
use crate::models::{
    DisableTwoFactorDto, OneTimeCode, SetupTwoFactorDto, TwoFactorCredential, TwoFactorMethod,
    TwoFactorSetupResponse, TwoFactorState, User, VerifyTwoFactorDto,
};
use crate::services::{PasswordService, TotpService};
use crate::utils::{ApiError, ApiResponse};

async fn current_user(state: &AppState, auth: &AuthGuard) -> Result<User, ApiError> {
    state
        .users
        .find_user(&auth.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))
}

async fn save(state: &AppState, auth: &AuthGuard, credential: &TwoFactorCredential) -> Result<(), ApiError> {
    if !state.users.set_two_factor(&auth.user_id, credential).await? {
        return Err(ApiError::unauthorized("User not found"));
    }
    Ok(())
}

#[openapi(tag = "TwoFactor")]
#[get("/2fa/status")]
pub async fn status(
    state: &State<AppState>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = current_user(state, &auth).await?;
    let credential = &user.two_factor;

    Ok(Json(ApiResponse::success(json!({
        "enabled": credential.enabled,
        "method": credential.method,
        "pending": credential.state() == TwoFactorState::Pending
    }))))
}

/// Starts (or restarts) enrollment. The credential stays disabled until a
/// code is confirmed through `/2fa/verify`.
#[openapi(tag = "TwoFactor")]
#[post("/2fa/setup", data = "<dto>")]
pub async fn setup(
    state: &State<AppState>,
    auth: AuthGuard,
    dto: Option<Json<SetupTwoFactorDto>>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = current_user(state, &auth).await?;
    if user.two_factor.state() == TwoFactorState::Enabled {
        return Err(ApiError::conflict("Two-factor authentication is already enabled"));
    }

    let method = dto.and_then(|d| d.into_inner().method).unwrap_or_default();
    let now = DateTime::now();

    match method {
        TwoFactorMethod::App => {
            let secret = TotpService::generate_secret();
            let enrollment = TotpService::enrollment(&secret, &user.email).map_err(|e| {
                error!("TOTP enrollment failed: {}", e);
                ApiError::internal_error("Internal server error")
            })?;

            save(state, &auth, &TwoFactorCredential::pending_app(secret, now)).await?;

            let body = TwoFactorSetupResponse {
                provisioning_uri: enrollment.provisioning_uri,
                qr_image_data_url: enrollment.qr_image_data_url,
                secret: enrollment.secret_base32,
            };
            let body = serde_json::to_value(&body)
                .map_err(|e| ApiError::internal_error(format!("Serialization error: {}", e)))?;
            Ok(Json(ApiResponse::success(body)))
        }
        TwoFactorMethod::Whatsapp => {
            if user.phone.is_none() {
                return Err(ApiError::bad_request(
                    "A phone number is required for WhatsApp codes",
                ));
            }
            // a failed delivery leaves any earlier enrollment in place
            send_two_factor_code(state, &user).await?;
            save(state, &auth, &TwoFactorCredential::pending_whatsapp(now)).await?;

            Ok(Json(ApiResponse::success(json!({
                "method": TwoFactorMethod::Whatsapp,
                "message": "Verification code sent over WhatsApp"
            }))))
        }
    }
}

#[openapi(tag = "TwoFactor")]
#[post("/2fa/verify", data = "<dto>")]
pub async fn verify(
    state: &State<AppState>,
    auth: AuthGuard,
    dto: Json<VerifyTwoFactorDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = current_user(state, &auth).await?;
    match user.two_factor.state() {
        TwoFactorState::Uninitialized => {
            return Err(ApiError::bad_request("Two-factor authentication not initiated"));
        }
        TwoFactorState::Enabled => {
            return Err(ApiError::conflict("Two-factor authentication is already enabled"));
        }
        TwoFactorState::Pending => {}
    }

    if !check_two_factor_code(state, &user, dto.code.trim()).await? {
        return Err(ApiError::unauthorized("Invalid verification code"));
    }

    save(state, &auth, &user.two_factor.confirmed(DateTime::now())).await?;

    info!("Two-factor authentication enabled for {}", auth.user_id);
    Ok(Json(ApiResponse::success(json!({
        "message": "Two-factor authentication enabled"
    }))))
}

#[openapi(tag = "TwoFactor")]
#[post("/2fa/disable", data = "<dto>")]
pub async fn disable(
    state: &State<AppState>,
    auth: AuthGuard,
    dto: Json<DisableTwoFactorDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user = current_user(state, &auth).await?;

    if !PasswordService::verify(&dto.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid password"));
    }
    if user.two_factor.state() != TwoFactorState::Enabled {
        return Err(ApiError::bad_request("Two-factor authentication is not enabled"));
    }

    save(state, &auth, &TwoFactorCredential::default()).await?;
    state
        .codes
        .remove_code(&OneTimeCode::two_factor_subject(&auth.user_id.to_hex()))
        .await?;

    info!("Two-factor authentication disabled for {}", auth.user_id);
    Ok(Json(ApiResponse::success(json!({
        "message": "Two-factor authentication disabled"
    }))))
}
