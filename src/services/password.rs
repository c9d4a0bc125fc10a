use crate::config::Config;

pub struct PasswordService;

impl PasswordService {
    pub fn hash(password: &str) -> Result<String, bcrypt::BcryptError> {
        bcrypt::hash(password, Config::bcrypt_cost())
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify(password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }
}
