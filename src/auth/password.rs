use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Prefix of a stored hash that can never match any password.
const UNUSABLE_PREFIX: char = '!';

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Marker stored for accounts created without a password.
pub fn unusable_password() -> String {
    format!("{UNUSABLE_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

pub fn has_usable_password(hash: &str) -> bool {
    !hash.starts_with(UNUSABLE_PREFIX)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    if !has_usable_password(hash) {
        return Ok(false);
    }
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}
