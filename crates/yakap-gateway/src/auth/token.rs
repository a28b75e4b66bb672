//! Session token codec.
//!
//! Signs and verifies the compact, time-limited token that proves a prior
//! successful login. Verification fails closed: a bad signature, a
//! malformed token, and an expired token are all the same `InvalidToken`
//! value, never a fault.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::AuthError;
use super::users::Role;

/// Minimum accepted signing-secret length in bytes.
const MIN_SECRET_BYTES: usize = 32;

/// Session claims carried by the signed token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Username.
    pub username: String,
    /// Display name.
    pub name: Option<String>,
    /// User role.
    pub role: Role,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
}

/// Codec for creating and validating session tokens.
pub struct SessionCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionCodec {
    /// Create a new codec over a secret key.
    ///
    /// # Errors
    ///
    /// Returns error if the secret is shorter than 32 bytes. A missing or
    /// unusable secret is fatal to the caller; there is no degraded mode.
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AuthError::Config(format!(
                "Session secret must be at least {MIN_SECRET_BYTES} bytes, got {}",
                secret.len()
            )));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl,
        })
    }

    /// Create a codec from a hex-encoded secret.
    ///
    /// # Errors
    ///
    /// Returns error if hex decoding fails or the secret is too short.
    pub fn from_hex_secret(hex_secret: &str, ttl: Duration) -> Result<Self, AuthError> {
        let secret = hex::decode(hex_secret)
            .map_err(|e| AuthError::Config(format!("Invalid hex secret: {e}")))?;
        Self::new(&secret, ttl)
    }

    /// The configured session lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a signed session token for an authenticated principal.
    ///
    /// # Errors
    ///
    /// Returns error if token encoding fails.
    pub fn issue(
        &self,
        user_id: &str,
        username: &str,
        name: Option<&str>,
        role: Role,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        self.issue_at(user_id, username, name, role, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: &str,
        username: &str,
        name: Option<&str>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AuthError> {
        let exp = now + chrono::Duration::from_std(self.ttl).unwrap_or_default();

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            name: name.map(String::from),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Config(format!("Token encoding failed: {e}")))?;

        Ok((token, exp))
    }

    /// Validate and decode a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for any signature mismatch,
    /// malformed encoding, or expired token. Expiry has zero leeway.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data: TokenData<Claims> = decode(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(token_data.claims)
    }
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCodec")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(8 * 3600);

    fn create_codec() -> SessionCodec {
        SessionCodec::new(&[42u8; 32], TTL).unwrap()
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = SessionCodec::new(&[1u8; 8], TTL);
        assert!(matches!(result, Err(AuthError::Config(_))));
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let codec = create_codec();
        let (token, expires) = codec
            .issue("user_123", "maria", Some("Maria Clara"), Role::Encoder)
            .unwrap();

        assert!(!token.is_empty());
        assert!(expires > Utc::now());

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.username, "maria");
        assert_eq!(claims.name.as_deref(), Some("Maria Clara"));
        assert_eq!(claims.role, Role::Encoder);
        assert!(claims.iat < claims.exp);
    }

    #[test]
    fn test_malformed_token() {
        let codec = create_codec();
        assert!(codec.verify("not.a.token").is_err());
        assert!(codec.verify("").is_err());
    }

    #[test]
    fn test_tampered_token() {
        let codec = create_codec();
        let (token, _) = codec
            .issue("user_123", "maria", None, Role::Admin)
            .unwrap();

        // Flip the first character of the signature segment (every bit of
        // a leading base64 character is significant)
        let sig_start = token.rfind('.').unwrap() + 1;
        let mut tampered = token.clone();
        let original = tampered.remove(sig_start);
        tampered.insert(sig_start, if original == 'A' { 'B' } else { 'A' });
        assert_ne!(token, tampered);

        assert!(matches!(
            codec.verify(&tampered),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_payload() {
        let codec = create_codec();
        let (token, _) = codec
            .issue("user_123", "maria", None, Role::Encoder)
            .unwrap();

        // Swap the payload segment for another token's payload
        let (other, _) = codec.issue("user_999", "admin", None, Role::Admin).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let spliced = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(
            codec.verify(&spliced),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let codec = create_codec();

        // Issue a token whose whole lifetime is already in the past
        let issued = Utc::now() - chrono::Duration::hours(9);
        let (token, expires) = codec
            .issue_at("user_123", "maria", None, Role::Encoder, issued)
            .unwrap();

        assert!(expires < Utc::now());
        assert!(matches!(codec.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let codec = create_codec();
        let other = SessionCodec::new(&[7u8; 32], TTL).unwrap();

        let (token, _) = codec
            .issue("user_123", "maria", None, Role::Encoder)
            .unwrap();

        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_hex_secret() {
        let hex_secret = hex::encode([9u8; 32]);
        let codec = SessionCodec::from_hex_secret(&hex_secret, TTL).unwrap();

        let (token, _) = codec
            .issue("user_123", "test", None, Role::Admin)
            .unwrap();
        assert!(codec.verify(&token).is_ok());
    }
}
