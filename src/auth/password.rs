//! Password hashing — PBKDF2-SHA256 with per-user random salt.
//!
//! Credentials are stored self-describing (`scheme$iterations$salt$digest`)
//! so the work factor can be raised later without invalidating rows
//! hashed under the old cost.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const SALT_LENGTH: usize = 16;
pub const HASH_LENGTH: usize = 32;

const SCHEME: &str = "pbkdf2-sha256";

/// Derive and encode a credential string for storage.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt = generate_salt();
    let digest = derive(password, &salt, iterations);
    format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD.encode(salt),
        STANDARD.encode(digest)
    )
}

/// Check a password against a stored credential. Comparison is
/// constant-time; malformed credentials verify as false rather than
/// erroring, so a corrupt row reads as a failed login.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(digest)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if scheme != SCHEME || parts.next().is_some() {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let Ok(salt) = STANDARD.decode(salt) else {
        return false;
    };
    let Ok(expected) = STANDARD.decode(digest) else {
        return false;
    };
    if expected.len() != HASH_LENGTH {
        return false;
    }

    let candidate = derive(password, &salt, iterations);
    candidate.ct_eq(&expected).unwrap_u8() == 1
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low cost keeps the suite fast; production cost comes from config.
    const TEST_ITERATIONS: u32 = 1_000;

    #[test]
    fn hash_then_verify_round_trips() {
        let stored = hash_password("correct horse", TEST_ITERATIONS);
        assert!(verify_password("correct horse", &stored));
    }

    #[test]
    fn wrong_password_rejected() {
        let stored = hash_password("correct horse", TEST_ITERATIONS);
        assert!(!verify_password("battery staple", &stored));
        assert!(!verify_password("", &stored));
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        let a = hash_password("password123", TEST_ITERATIONS);
        let b = hash_password("password123", TEST_ITERATIONS);
        assert_ne!(a, b);
        assert!(verify_password("password123", &a));
        assert!(verify_password("password123", &b));
    }

    #[test]
    fn credential_records_its_own_cost() {
        let stored = hash_password("x", 2_500);
        assert!(stored.starts_with("pbkdf2-sha256$2500$"));
        assert!(verify_password("x", &stored));
    }

    #[test]
    fn malformed_credentials_verify_false() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "nonsense"));
        assert!(!verify_password("x", "bcrypt$10$abc$def"));
        assert!(!verify_password("x", "pbkdf2-sha256$notanumber$abc$def"));
        assert!(!verify_password("x", "pbkdf2-sha256$0$YQ$YQ"));
        assert!(!verify_password("x", "pbkdf2-sha256$1000$!!$!!"));
        assert!(!verify_password("x", "pbkdf2-sha256$1000$YWJj$dG9vc2hvcnQ"));
    }
}
