//! Password hashing with PBKDF2-HMAC-SHA256.
//!
//! Credentials are self-describing strings:
//! `pbkdf2:<iterations>:<salt_b64url>:<key_b64url>`. A stored value without
//! the `pbkdf2:` marker is a legacy plain-text password from before hashing
//! was introduced; `verify_password` still matches it, and the login flow
//! re-hashes and persists the upgraded credential on success.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use sha2::Sha256;

/// KDF work factor. Raising it only affects newly written credentials;
/// verification reads the iteration count out of the stored string.
const PBKDF2_ITERATIONS: u32 = 50_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const CREDENTIAL_PREFIX: &str = "pbkdf2";

/// Hash a password into a stored credential string.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill(&mut salt);

    let key = derive_key(password, &salt, PBKDF2_ITERATIONS);

    format!(
        "{CREDENTIAL_PREFIX}:{PBKDF2_ITERATIONS}:{}:{}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    )
}

/// Verify a password against a stored credential.
///
/// Never errors: a malformed credential, like a wrong password, is just
/// `false`.
#[must_use]
pub fn verify_password(password: &str, credential: &str) -> bool {
    if is_legacy_credential(credential) {
        // Legacy plain-text row pending upgrade on next successful login
        return constant_time_compare(password.as_bytes(), credential.as_bytes());
    }

    let Some((iterations, salt, stored_key)) = parse_credential(credential) else {
        return false;
    };

    let key = derive_key(password, &salt, iterations);
    constant_time_compare(&key, &stored_key)
}

/// Whether a stored credential predates hashing.
#[must_use]
pub fn is_legacy_credential(credential: &str) -> bool {
    !credential.starts_with("pbkdf2:")
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn parse_credential(credential: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = credential.split(':');
    if parts.next() != Some(CREDENTIAL_PREFIX) {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok()?;
    let salt = URL_SAFE_NO_PAD.decode(parts.next()?).ok()?;
    let key = URL_SAFE_NO_PAD.decode(parts.next()?).ok()?;
    if parts.next().is_some() || iterations == 0 {
        return None;
    }
    Some((iterations, salt, key))
}

/// Compare two byte strings without short-circuiting on the first mismatch.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let credential = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &credential));
        assert!(!verify_password("correct horse battery stapls", &credential));
    }

    #[test]
    fn each_hash_gets_a_fresh_salt() {
        let a = hash_password("same password");
        let b = hash_password("same password");
        assert_ne!(a, b);
        assert!(verify_password("same password", &a));
        assert!(verify_password("same password", &b));
    }

    #[test]
    fn credential_carries_the_marker_and_work_factor() {
        let credential = hash_password("secret");
        assert!(credential.starts_with("pbkdf2:50000:"));
        assert!(!is_legacy_credential(&credential));
    }

    #[test]
    fn legacy_plain_text_still_matches_directly() {
        assert!(is_legacy_credential("hunter2"));
        assert!(verify_password("hunter2", "hunter2"));
        assert!(!verify_password("hunter3", "hunter2"));
    }

    #[test]
    fn malformed_credentials_never_verify() {
        assert!(!verify_password("x", "pbkdf2:"));
        assert!(!verify_password("x", "pbkdf2:0:AAAA:AAAA"));
        assert!(!verify_password("x", "pbkdf2:50000:!!!:AAAA"));
        assert!(!verify_password("x", "pbkdf2:50000:AAAA:AAAA:extra"));
    }
}
