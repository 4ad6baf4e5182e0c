//! Stateless session tokens.
//!
//! Compact JWT-shaped tokens: three dot-joined base64url segments (header,
//! claims, HMAC-SHA256 signature over the first two), signed with the
//! configured secret. There is no refresh and no server-side revocation
//! list; an expired token is fully invalid and a leaked one stays valid
//! until expiry, so rotating the secret is the only kill-switch.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use tamarind_core::{Role, UserId};

use crate::models::User;

type HmacSha256 = Hmac<Sha256>;

/// Fixed token lifetime: 8 hours.
pub const TOKEN_LIFETIME_SECS: i64 = 8 * 60 * 60;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Identity claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub username: String,
    pub name: String,
    pub role: Role,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

impl Claims {
    /// The claimed user id as a typed value.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::new(self.sub)
    }
}

/// Token verification failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

impl TokenError {
    /// Stable machine-readable reason for 401 payloads.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Malformed | Self::InvalidSignature => "invalid_token",
            Self::Expired => "expired_token",
        }
    }
}

/// Issues and verifies session tokens with a shared secret.
pub struct TokenService {
    secret: SecretString,
}

impl TokenService {
    /// Create a token service from the configured signing secret.
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Issue a token for a user, valid for [`TOKEN_LIFETIME_SECS`].
    #[must_use]
    pub fn issue(&self, user: &User) -> String {
        self.issue_at(user, Utc::now().timestamp())
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is malformed, carries a bad
    /// signature, or has expired.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    fn issue_at(&self, user: &User, iat: i64) -> String {
        let claims = Claims {
            sub: user.id.as_i64(),
            username: user.username.clone(),
            name: user.name.clone(),
            role: user.role,
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };

        // Claims are plain serializable data; serialization cannot fail.
        let payload = serde_json::to_string(&claims).unwrap_or_default();

        let header_b64 = URL_SAFE_NO_PAD.encode(HEADER);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signature = self.sign(&header_b64, &payload_b64);

        format!(
            "{header_b64}.{payload_b64}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;

        // verify_slice is a constant-time comparison; it must not
        // short-circuit on an early byte mismatch
        let mut mac = self.mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if now >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, header_b64: &str, payload_b64: &str) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(header_b64.as_bytes());
        mac.update(b".");
        mac.update(payload_b64.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"))
    }
}
