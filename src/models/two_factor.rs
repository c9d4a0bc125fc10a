use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use schemars::JsonSchema;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TwoFactorMethod {
    /// Authenticator app (TOTP).
    #[default]
    App,
    /// One-time code sent to the account phone over WhatsApp.
    Whatsapp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoFactorState {
    Uninitialized,
    Pending,
    Enabled,
}

/// Second-factor settings embedded in the user document.
///
/// `enabled` is only ever set together with `confirmed_at`, and for the
/// app method only while a secret is present.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TwoFactorCredential {
    pub enabled: bool,
    pub method: TwoFactorMethod,
    pub secret_base32: Option<String>,
    pub confirmed_at: Option<DateTime>,
    /// Set while a setup is waiting for its first code.
    pub pending_since: Option<DateTime>,
}

impl TwoFactorCredential {
    pub fn state(&self) -> TwoFactorState {
        if self.enabled {
            TwoFactorState::Enabled
        } else if self.pending_since.is_some() {
            TwoFactorState::Pending
        } else {
            TwoFactorState::Uninitialized
        }
    }

    pub fn pending_app(secret_base32: String, now: DateTime) -> Self {
        TwoFactorCredential {
            enabled: false,
            method: TwoFactorMethod::App,
            secret_base32: Some(secret_base32),
            confirmed_at: None,
            pending_since: Some(now),
        }
    }

    pub fn pending_whatsapp(now: DateTime) -> Self {
        TwoFactorCredential {
            enabled: false,
            method: TwoFactorMethod::Whatsapp,
            secret_base32: None,
            confirmed_at: None,
            pending_since: Some(now),
        }
    }

    /// Confirms a pending setup; the secret (if any) is kept.
    pub fn confirmed(&self, now: DateTime) -> Self {
        TwoFactorCredential {
            enabled: true,
            method: self.method,
            secret_base32: self.secret_base32.clone(),
            confirmed_at: Some(now),
            pending_since: None,
        }
    }
}

#[derive(Debug, Deserialize, Default, JsonSchema)]
pub struct SetupTwoFactorDto {
    pub method: Option<TwoFactorMethod>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct VerifyTwoFactorDto {
    pub code: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DisableTwoFactorDto {
    pub password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetupResponse {
    pub provisioning_uri: String,
    pub qr_image_data_url: String,
    pub secret: String,
}
