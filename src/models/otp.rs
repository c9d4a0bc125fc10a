use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

/// Pending one-time code. Only the hash is kept; one document per subject.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OneTimeCode {
    /// `phone:<digits>` or `2fa:<user id>`.
    pub subject: String,
    pub code_hash: String,
    pub expires_at: DateTime,
    pub attempts: i32,
    pub created_at: DateTime,
}

impl OneTimeCode {
    pub fn phone_subject(phone: &str) -> String {
        format!("phone:{}", phone)
    }

    pub fn two_factor_subject(user_id: &str) -> String {
        format!("2fa:{}", user_id)
    }

    pub fn is_expired(&self, now: DateTime) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StartOtpDto {
    pub phone: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VerifyOtpDto {
    pub phone: String,
    pub code: String,
}
