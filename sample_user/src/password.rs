//! Password hashing with Argon2id.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};

/// PHC-formatted Argon2id hash of `password`. Empty on failure, which the `req` rule on the
/// password field then rejects.
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "password hashing failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::{PasswordHash, PasswordVerifier};

    #[test]
    fn hash_verifies_and_is_salted() {
        let hash = hash_password("correct-horse");
        assert!(hash.starts_with("$argon2"));
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct-horse", &parsed).is_ok());
        assert_ne!(hash, hash_password("correct-horse"));
    }
}
