use log::{error, info};
use mongodb::bson::DateTime;
use rocket::serde::json::Json;
use rocket::State;
use rocket_okapi::openapi;
use serde_json::json;
use validator::Validate;

use super::{rate_limit, validation_message};
use crate::app_state::AppState;
use crate::models::{
    LoginDto, LoginTwoFactorDto, OneTimeCode, RefreshTokenDto, RegisterDto, TwoFactorMethod, User,
    UserResponse,
};
use crate::services::{
    JwtService, OtpCheck, OtpService, PasswordService, TokenKind, TotpService, WhatsAppService,
};
use crate::stores::StoreError;
use crate::utils::{normalize_phone, validate_phone, ApiError, ApiResponse};

const REFRESH_LIMIT: i32 = 10;
const REFRESH_WINDOW_MS: i64 = 60 * 1000;

fn session(user: User) -> Result<serde_json::Value, ApiError> {
    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User has no id"))?;

    let access_token = JwtService::generate_access_token(&user_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;
    let refresh_token = JwtService::generate_refresh_token(&user_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(json!({
        "user": UserResponse::from(user),
        "accessToken": access_token,
        "refreshToken": refresh_token
    }))
}

/// Sends a fresh WhatsApp code for the user's second factor.
pub(crate) async fn send_two_factor_code(state: &AppState, user: &User) -> Result<(), ApiError> {
    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User has no id"))?;
    let phone = user
        .phone
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("A phone number is required for WhatsApp codes"))?;

    let subject = OneTimeCode::two_factor_subject(&user_id.to_hex());
    let (code, _) = OtpService::start(state.codes.as_ref(), &subject, DateTime::now()).await?;

    if let Err(e) = state
        .messenger
        .send_text(phone, &WhatsAppService::code_message(&code))
        .await
    {
        error!("Two-factor code delivery failed: {}", e);
        state.codes.remove_code(&subject).await?;
        return Err(ApiError::bad_gateway("Failed to deliver verification code"));
    }
    Ok(())
}

/// Checks a second-factor code for an enabled or pending credential.
pub(crate) async fn check_two_factor_code(
    state: &AppState,
    user: &User,
    code: &str,
) -> Result<bool, ApiError> {
    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User has no id"))?;

    match user.two_factor.method {
        TwoFactorMethod::App => {
            let secret = user
                .two_factor
                .secret_base32
                .as_deref()
                .ok_or_else(|| ApiError::bad_request("Two-factor authentication not initiated"))?;
            TotpService::verify(secret, &user.email, code).map_err(|e| {
                error!("TOTP check failed for {}: {}", user_id, e);
                ApiError::internal_error("Internal server error")
            })
        }
        TwoFactorMethod::Whatsapp => {
            let subject = OneTimeCode::two_factor_subject(&user_id.to_hex());
            match OtpService::check(state.codes.as_ref(), &subject, code, DateTime::now()).await? {
                OtpCheck::Verified => Ok(true),
                OtpCheck::TooManyAttempts => Err(ApiError::too_many_requests(
                    "Too many attempts. Request a new code.",
                )),
                _ => Ok(false),
            }
        }
    }
}

/// --------------------
/// Register
/// --------------------
#[openapi(tag = "Auth")]
#[post("/auth/register", data = "<dto>")]
pub async fn register(
    state: &State<AppState>,
    dto: Json<RegisterDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    dto.validate()
        .map_err(|e| ApiError::bad_request(validation_message(&e)))?;

    let phone = dto.phone.as_deref().map(normalize_phone);
    if phone.as_deref().is_some_and(|p| !validate_phone(p)) {
        return Err(ApiError::bad_request("Invalid phone number"));
    }

    let password_hash = PasswordService::hash(&dto.password)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    let now = DateTime::now();
    let user = User {
        id: None,
        name: dto.name.trim().to_string(),
        email: dto.email.trim().to_lowercase(),
        phone,
        password_hash,
        two_factor: Default::default(),
        last_login_at: Some(now),
        created_at: now,
        updated_at: now,
    };

    let user = match state.users.insert_user(user).await {
        Ok(user) => user,
        Err(StoreError::Duplicate(_)) => {
            return Err(ApiError::conflict("Email already registered"));
        }
        Err(e) => return Err(e.into()),
    };

    info!("Registered owner {}", user.email);
    Ok(Json(ApiResponse::success_with_message(
        "Registration successful",
        session(user)?,
    )))
}

/// --------------------
/// Login
/// --------------------
#[openapi(tag = "Auth")]
#[post("/auth/login", data = "<dto>")]
pub async fn login(
    state: &State<AppState>,
    dto: Json<LoginDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let email = dto.email.trim().to_lowercase();
    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .filter(|user| PasswordService::verify(&dto.password, &user.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let user_id = user
        .id
        .ok_or_else(|| ApiError::internal_error("User has no id"))?;

    if user.two_factor.enabled {
        if user.two_factor.method == TwoFactorMethod::Whatsapp {
            send_two_factor_code(state, &user).await?;
        }
        let challenge_token = JwtService::generate_challenge_token(&user_id)
            .map_err(|e| ApiError::internal_error(e.to_string()))?;

        return Ok(Json(ApiResponse::success(json!({
            "twoFactorRequired": true,
            "method": user.two_factor.method,
            "challengeToken": challenge_token
        }))));
    }

    state.users.touch_login(&user_id, DateTime::now()).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Login successful",
        session(user)?,
    )))
}

/// --------------------
/// Login, second step
/// --------------------
#[openapi(tag = "Auth")]
#[post("/auth/login/2fa", data = "<dto>")]
pub async fn login_two_factor(
    state: &State<AppState>,
    dto: Json<LoginTwoFactorDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user_id = JwtService::verify_user_token(&dto.challenge_token, TokenKind::Challenge)
        .map_err(|_| ApiError::unauthorized("Invalid or expired challenge"))?;

    let user = state
        .users
        .find_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired challenge"))?;

    if !user.two_factor.enabled {
        return Err(ApiError::bad_request("Two-factor authentication is not enabled"));
    }

    if !check_two_factor_code(state, &user, dto.code.trim()).await? {
        return Err(ApiError::unauthorized("Invalid verification code"));
    }

    state.users.touch_login(&user_id, DateTime::now()).await?;
    Ok(Json(ApiResponse::success_with_message(
        "Login successful",
        session(user)?,
    )))
}

/// --------------------
/// Refresh access token
/// --------------------
#[openapi(tag = "Auth")]
#[post("/auth/refresh", data = "<dto>")]
pub async fn refresh_token(
    state: &State<AppState>,
    dto: Json<RefreshTokenDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let user_id = JwtService::verify_user_token(&dto.refresh_token, TokenKind::Refresh)
        .map_err(|_| ApiError::unauthorized("Invalid refresh token"))?;

    rate_limit(
        state,
        &format!("refresh:{}", user_id),
        REFRESH_LIMIT,
        REFRESH_WINDOW_MS,
    )
    .await?;

    state
        .users
        .find_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found"))?;

    let access_token = JwtService::generate_access_token(&user_id)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    Ok(Json(ApiResponse::success(json!({
        "accessToken": access_token
    }))))
}
