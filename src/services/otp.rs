use hmac::{Hmac, Mac};
use mongodb::bson::DateTime;
use rand::Rng;
use sha2::Sha256;
use thiserror::Error;

use crate::config::Config;
use crate::models::OneTimeCode;
use crate::stores::{OneTimeCodeStore, StoreError};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("invalid OTP pepper")]
    InvalidKey,
    #[error("unsupported OTP length {0}")]
    UnsupportedLength(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of checking a submitted code against the pending one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Verified,
    Mismatch,
    Expired,
    TooManyAttempts,
    NotFound,
}

/// Lengths `issue` can honour; 10^19 - 1 still fits in a `u64`.
pub const CODE_LENGTHS: std::ops::RangeInclusive<u32> = 1..=19;

pub struct OtpService;

impl OtpService {
    /// Uniform over `[10^(length-1), 10^length - 1]`, so the result always has
    /// exactly `length` digits.
    pub fn issue(length: u32) -> Result<String, OtpError> {
        if !CODE_LENGTHS.contains(&length) {
            return Err(OtpError::UnsupportedLength(length));
        }
        let low = 10u64.pow(length - 1);
        let high = 10u64.pow(length) - 1;
        Ok(rand::thread_rng().gen_range(low..=high).to_string())
    }

    pub fn hash(code: &str) -> Result<String, OtpError> {
        Self::hash_with(Config::otp_pepper().as_bytes(), code)
    }

    pub fn hash_with(pepper: &[u8], code: &str) -> Result<String, OtpError> {
        let mut mac = HmacSha256::new_from_slice(pepper).map_err(|_| OtpError::InvalidKey)?;
        mac.update(code.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// True iff `code` hashes to `hash`. Expiry and attempts are the caller's job.
    pub fn verify(code: &str, hash: &str) -> bool {
        Self::verify_with(Config::otp_pepper().as_bytes(), code, hash)
    }

    pub fn verify_with(pepper: &[u8], code: &str, hash: &str) -> bool {
        let Ok(expected) = hex::decode(hash) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(pepper) else {
            return false;
        };
        mac.update(code.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    /// Issues a fresh code for `subject` and stores its hash, replacing any
    /// pending one. Returns the plaintext for delivery.
    pub async fn start(
        store: &dyn OneTimeCodeStore,
        subject: &str,
        now: DateTime,
    ) -> Result<(String, OneTimeCode), OtpError> {
        let code = Self::issue(Config::otp_length())?;
        let record = OneTimeCode {
            subject: subject.to_string(),
            code_hash: Self::hash(&code)?,
            expires_at: DateTime::from_millis(now.timestamp_millis() + Config::otp_ttl_secs() * 1000),
            attempts: 0,
            created_at: now,
        };
        store.replace_code(record.clone()).await?;
        Ok((code, record))
    }

    /// Checks expiry and the attempt budget before comparing hashes. A
    /// mismatch costs one attempt; a match consumes the code.
    pub async fn check(
        store: &dyn OneTimeCodeStore,
        subject: &str,
        code: &str,
        now: DateTime,
    ) -> Result<OtpCheck, StoreError> {
        let Some(pending) = store.find_code(subject).await? else {
            return Ok(OtpCheck::NotFound);
        };

        if pending.is_expired(now) {
            store.remove_code(subject).await?;
            return Ok(OtpCheck::Expired);
        }

        if pending.attempts >= Config::otp_max_attempts() {
            return Ok(OtpCheck::TooManyAttempts);
        }

        if !Self::verify(code, &pending.code_hash) {
            store.increment_attempts(subject).await?;
            return Ok(OtpCheck::Mismatch);
        }

        store.remove_code(subject).await?;
        Ok(OtpCheck::Verified)
    }
}
