use argon2::{Argon2, password_hash::{PasswordHasher, PasswordVerifier, SaltString}, PasswordHash};
use rand::rngs::OsRng;

use super::errors::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation("password too short (>=8)".into()));
    }
    Ok(())
}

/// Argon2id hash in PHC string form.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::HashError(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashError(e.to_string()))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let h = hash_password("Passw0rd!").unwrap();
        assert!(h.starts_with("$argon2"));
        assert!(verify_password("Passw0rd!", &h).unwrap());
        assert!(!verify_password("wrong-pass", &h).unwrap());
    }

    #[test]
    fn short_password_rejected() {
        assert!(matches!(validate_password("1234567"), Err(AuthError::Validation(_))));
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn garbage_hash_is_error() {
        assert!(matches!(verify_password("x", "not-a-hash"), Err(AuthError::HashError(_))));
    }
}
