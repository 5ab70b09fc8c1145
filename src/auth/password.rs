use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

/// Shortest password accepted at registration, in characters.
pub const MIN_PASSWORD_LEN: usize = 4;

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!("hash password: {e}")
        })?
        .to_string();
    Ok(hash)
}

/// Errors only when `hash` is not a PHC string.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("parse password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

lazy_static! {
    // hashed once so misses cost the same Argon2 work as a real check
    static ref DUMMY_HASH: Option<String> = hash_password("not-a-real-password").ok();
}

/// Runs a verification for a login that has no account. Always `false`.
pub fn verify_dummy(plain: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plain, hash);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hash = hash_password("s3cret").expect("hashing should succeed");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("s3cret", &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse").expect("hashing should succeed");
        assert!(!verify_password("wrong-horse", &hash).expect("verify should not error"));
    }

    #[test]
    fn same_password_gets_a_fresh_salt() {
        let a = hash_password("pass").unwrap();
        let b = hash_password("pass").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_unsalted_hex_digest() {
        // sha256("1234") as the old storage format wrote it
        let legacy = "03ac674216f3e15c761ee1a5e255f067953623c8b388b4459e13f978d7c846f4";
        assert!(verify_password("1234", legacy).is_err());
    }

    #[test]
    fn dummy_verification_never_matches() {
        assert!(DUMMY_HASH.as_deref().is_some_and(|h| h.starts_with("$argon2")));
        assert!(!verify_dummy("not-a-real-password"));
        assert!(!verify_dummy(""));
    }
}
