use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

use crate::config::Config;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    /// Login passed the password check, second factor still owed.
    Challenge,
    /// Phone number passed OTP verification.
    Phone,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID, or phone digits for phone tokens
    pub kind: TokenKind,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtService;

impl JwtService {
    fn secret(kind: TokenKind) -> String {
        match kind {
            TokenKind::Refresh => Config::jwt_refresh_secret(),
            _ => Config::jwt_secret(),
        }
    }

    fn expiry(kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => Config::jwt_expiry(),
            TokenKind::Refresh => Config::jwt_refresh_expiry(),
            TokenKind::Challenge => Config::jwt_challenge_expiry(),
            TokenKind::Phone => Config::jwt_phone_expiry(),
        }
    }

    fn generate(sub: String, kind: TokenKind) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();

        let claims = Claims {
            sub,
            kind,
            exp: now + Self::expiry(kind),
            iat: now,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(Self::secret(kind).as_bytes()),
        )
    }

    pub fn generate_access_token(user_id: &ObjectId) -> Result<String, jsonwebtoken::errors::Error> {
        Self::generate(user_id.to_hex(), TokenKind::Access)
    }

    pub fn generate_refresh_token(user_id: &ObjectId) -> Result<String, jsonwebtoken::errors::Error> {
        Self::generate(user_id.to_hex(), TokenKind::Refresh)
    }

    pub fn generate_challenge_token(user_id: &ObjectId) -> Result<String, jsonwebtoken::errors::Error> {
        Self::generate(user_id.to_hex(), TokenKind::Challenge)
    }

    pub fn generate_phone_token(phone: &str) -> Result<String, jsonwebtoken::errors::Error> {
        Self::generate(phone.to_string(), TokenKind::Phone)
    }

    /// Decodes `token` and rejects it unless it was issued as `kind`.
    pub fn verify_token(token: &str, kind: TokenKind) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(Self::secret(kind).as_bytes()),
            &Validation::default(),
        )?;

        if token_data.claims.kind != kind {
            return Err(ErrorKind::InvalidToken.into());
        }

        Ok(token_data.claims)
    }

    /// Verifies a user-bound token and parses its subject.
    pub fn verify_user_token(token: &str, kind: TokenKind) -> Result<ObjectId, jsonwebtoken::errors::Error> {
        let claims = Self::verify_token(token, kind)?;
        ObjectId::parse_str(&claims.sub).map_err(|_| ErrorKind::InvalidSubject.into())
    }
}
