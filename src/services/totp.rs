//! Authenticator-app codes (RFC 6238: SHA1, 6 digits, 30 s step).

use data_encoding::BASE32_NOPAD;
use rand::RngCore;
use thiserror::Error;
use totp_rs::{Algorithm, TOTP};

use crate::config::Config;

const SECRET_BYTES: usize = 20;
const DIGITS: usize = 6;
const STEP_SECS: u64 = 30;
/// Codes from one step before or after the current one are accepted.
const SKEW_STEPS: u8 = 1;

#[derive(Debug, Error)]
pub enum TotpError {
    #[error("invalid secret: {0}")]
    InvalidSecret(String),
    #[error("qr rendering failed: {0}")]
    Qr(String),
    #[error("system clock before unix epoch")]
    Clock,
}

#[derive(Debug, Clone)]
pub struct Enrollment {
    pub secret_base32: String,
    pub provisioning_uri: String,
    pub qr_image_data_url: String,
}

pub struct TotpService;

impl TotpService {
    /// 160 random bits, base32 without padding.
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        BASE32_NOPAD.encode(&bytes)
    }

    fn totp(secret_base32: &str, account: &str) -> Result<TOTP, TotpError> {
        let secret = BASE32_NOPAD
            .decode(secret_base32.as_bytes())
            .map_err(|e| TotpError::InvalidSecret(e.to_string()))?;

        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW_STEPS,
            STEP_SECS,
            secret,
            Some(Config::totp_issuer()),
            account.to_string(),
        )
        .map_err(|e| TotpError::InvalidSecret(e.to_string()))
    }

    pub fn enrollment(secret_base32: &str, account: &str) -> Result<Enrollment, TotpError> {
        let totp = Self::totp(secret_base32, account)?;
        let qr = totp.get_qr_base64().map_err(TotpError::Qr)?;

        Ok(Enrollment {
            secret_base32: secret_base32.to_string(),
            provisioning_uri: totp.get_url(),
            qr_image_data_url: format!("data:image/png;base64,{}", qr),
        })
    }

    pub fn verify_at(
        secret_base32: &str,
        account: &str,
        code: &str,
        unix_secs: u64,
    ) -> Result<bool, TotpError> {
        if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(false);
        }
        Ok(Self::totp(secret_base32, account)?.check(code, unix_secs))
    }

    pub fn verify(secret_base32: &str, account: &str, code: &str) -> Result<bool, TotpError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| TotpError::Clock)?
            .as_secs();
        Self::verify_at(secret_base32, account, code, now)
    }

    pub fn generate_at(secret_base32: &str, account: &str, unix_secs: u64) -> Result<String, TotpError> {
        Ok(Self::totp(secret_base32, account)?.generate(unix_secs))
    }
}
