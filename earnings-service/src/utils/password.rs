use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;

/// Argon2id hash with a fresh random salt, in PHC string form.
pub fn hash_password(password: &Secret<String>) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to hash password: {}", e)))
}

/// `Ok(false)` on a wrong password; `Err` only for a malformed stored hash.
pub fn verify_password(password: &Secret<String>, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Invalid password hash format: {}", e))
    })?;

    Ok(Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> Secret<String> {
        Secret::new(s.to_string())
    }

    #[test]
    fn hash_is_argon2_phc_string() {
        let hash = hash_password(&secret("correct horse battery")).unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn verifies_only_the_original_password() {
        let hash = hash_password(&secret("correct horse battery")).unwrap();
        assert!(verify_password(&secret("correct horse battery"), &hash).unwrap());
        assert!(!verify_password(&secret("wrong horse battery"), &hash).unwrap());
    }

    #[test]
    fn salts_differ_between_hashes() {
        let a = hash_password(&secret("same-password")).unwrap();
        let b = hash_password(&secret("same-password")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password(&secret("x"), "not-a-phc-string").is_err());
    }
}
