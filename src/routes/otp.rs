use log::{error, info};
use mongodb::bson::DateTime;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use serde_json::json;

use super::rate_limit;
use crate::app_state::AppState;
use crate::config::Config;
use crate::models::{OneTimeCode, StartOtpDto, VerifyOtpDto};
use crate::services::whatsapp::mask_phone;
use crate::services::{JwtService, OtpCheck, OtpService, WhatsAppService};
use crate::utils::{is_numeric_code, normalize_phone, to_utc, validate_phone, ApiError, ApiResponse};

/// --------------------
/// Send code
/// --------------------
#[openapi(tag = "OTP")]
#[post("/otp/start", data = "<dto>")]
pub async fn start_otp(
    state: &State<AppState>,
    dto: Json<StartOtpDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let phone = normalize_phone(&dto.phone);
    if !validate_phone(&phone) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }

    rate_limit(
        state,
        &format!("otp:{}", phone),
        Config::otp_rate_limit(),
        Config::otp_rate_window_secs() * 1000,
    )
    .await?;

    let subject = OneTimeCode::phone_subject(&phone);
    let (code, record) = OtpService::start(state.codes.as_ref(), &subject, DateTime::now()).await?;

    if let Err(e) = state
        .messenger
        .send_text(&phone, &WhatsAppService::code_message(&code))
        .await
    {
        error!("OTP delivery to {} failed: {}", mask_phone(&phone), e);
        state.codes.remove_code(&subject).await?;
        return Err(ApiError::bad_gateway("Failed to send verification code"));
    }

    info!("OTP sent to {}", mask_phone(&phone));
    Ok(Json(ApiResponse::success(json!({
        "message": "Verification code sent",
        "expiresAt": to_utc(record.expires_at).to_rfc3339()
    }))))
}

/// --------------------
/// Verify code
/// --------------------
#[openapi(tag = "OTP")]
#[post("/otp/verify", data = "<dto>")]
pub async fn verify_otp(
    state: &State<AppState>,
    dto: Json<VerifyOtpDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let phone = normalize_phone(&dto.phone);
    if !validate_phone(&phone) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }
    let code = dto.code.trim();
    if !is_numeric_code(code, Config::otp_length() as usize) {
        return Err(ApiError::bad_request("Invalid code format"));
    }
    let subject = OneTimeCode::phone_subject(&phone);

    match OtpService::check(state.codes.as_ref(), &subject, code, DateTime::now()).await? {
        OtpCheck::Verified => {}
        OtpCheck::Expired => return Err(ApiError::unauthorized("Code expired")),
        OtpCheck::TooManyAttempts => {
            return Err(ApiError::too_many_requests(
                "Too many attempts. Request a new code.",
            ));
        }
        OtpCheck::Mismatch | OtpCheck::NotFound => {
            return Err(ApiError::unauthorized("Invalid verification code"));
        }
    }

    let phone_token = JwtService::generate_phone_token(&phone)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    info!("Phone {} verified", mask_phone(&phone));
    Ok(Json(ApiResponse::success(json!({
        "verified": true,
        "phoneToken": phone_token
    }))))
}
