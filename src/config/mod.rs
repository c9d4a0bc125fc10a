use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use std::env;
use std::sync::OnceLock;

pub struct Config;

impl Config {
    fn figment() -> &'static Figment {
        static FIGMENT: OnceLock<Figment> = OnceLock::new();
        FIGMENT.get_or_init(|| {
            let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

            Figment::from(RocketConfig::default())
                .merge(Toml::file("Rocket.toml").nested())
                .select(&profile)
                .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]))
        })
    }

    pub fn jwt_secret() -> String {
        Self::figment()
            .extract_inner("jwt_secret")
            .unwrap_or_else(|_| "default-secret".to_string())
    }

    pub fn jwt_refresh_secret() -> String {
        Self::figment()
            .extract_inner("jwt_refresh_secret")
            .unwrap_or_else(|_| "default-refresh-secret".to_string())
    }

    pub fn jwt_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_expiry")
            .unwrap_or(900)
    }

    pub fn jwt_refresh_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_refresh_expiry")
            .unwrap_or(604800)
    }

    /// Lifetime of the token handed out by login when a second factor is still owed.
    pub fn jwt_challenge_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_challenge_expiry")
            .unwrap_or(300)
    }

    /// Lifetime of the token proving a phone number passed OTP verification.
    pub fn jwt_phone_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_phone_expiry")
            .unwrap_or(1800)
    }

    /// `mongo` or `memory`.
    pub fn storage() -> String {
        Self::figment()
            .extract_inner("storage")
            .unwrap_or_else(|_| "mongo".to_string())
    }

    pub fn mongodb_uri() -> String {
        Self::figment()
            .extract_inner("mongodb_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
    }

    pub fn mongodb_database() -> String {
        Self::figment()
            .extract_inner("mongodb_database")
            .unwrap_or_else(|_| "booky".to_string())
    }

    pub fn bcrypt_cost() -> u32 {
        Self::figment()
            .extract_inner("bcrypt_cost")
            .unwrap_or(bcrypt::DEFAULT_COST)
    }

    pub fn otp_pepper() -> String {
        Self::figment()
            .extract_inner("otp_pepper")
            .unwrap_or_else(|_| "default-otp-pepper".to_string())
    }

    pub fn otp_length() -> u32 {
        Self::figment()
            .extract_inner("otp_length")
            .unwrap_or(6)
    }

    pub fn otp_ttl_secs() -> i64 {
        Self::figment()
            .extract_inner("otp_ttl_secs")
            .unwrap_or(600)
    }

    pub fn otp_max_attempts() -> i32 {
        Self::figment()
            .extract_inner("otp_max_attempts")
            .unwrap_or(5)
    }

    pub fn otp_rate_limit() -> i32 {
        Self::figment()
            .extract_inner("otp_rate_limit")
            .unwrap_or(3)
    }

    pub fn otp_rate_window_secs() -> i64 {
        Self::figment()
            .extract_inner("otp_rate_window_secs")
            .unwrap_or(600)
    }

    pub fn totp_issuer() -> String {
        Self::figment()
            .extract_inner("totp_issuer")
            .unwrap_or_else(|_| "Booky".to_string())
    }

    pub fn whatsapp_api_base() -> String {
        Self::figment()
            .extract_inner("whatsapp_api_base")
            .unwrap_or_else(|_| "https://graph.facebook.com/v19.0".to_string())
    }

    pub fn whatsapp_token() -> Option<String> {
        Self::figment()
            .extract_inner("whatsapp_token")
            .ok()
    }

    pub fn whatsapp_phone_number_id() -> Option<String> {
        Self::figment()
            .extract_inner("whatsapp_phone_number_id")
            .ok()
    }

    pub fn is_whatsapp_enabled() -> bool {
        Self::whatsapp_token().is_some()
            && Self::whatsapp_phone_number_id().is_some()
    }

    pub fn is_otp_pepper_set() -> bool {
        Self::figment().extract_inner::<String>("otp_pepper").is_ok()
    }
}
