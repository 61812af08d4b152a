//! Session token handling
//!
//! Issues and verifies the signed, time-limited credentials handed out at
//! signup and login.
//!
//! Security notes:
//! - Tokens are signed with HS256 (HMAC-SHA256)
//! - The subject claim is the identity's ObjectId in hex
//! - Lifetime is configurable (`SESSION_TTL_DAYS`, 15 days by default)

use bson::oid::ObjectId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::MIN_SECRET_LEN;
use crate::types::ChorusError;

/// Payload stored in the session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Identity reference (ObjectId hex)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

impl Claims {
    /// Identity reference carried by the token
    pub fn user_id(&self) -> Result<ObjectId, ChorusError> {
        ObjectId::parse_str(&self.sub)
            .map_err(|_| ChorusError::InvalidToken("Malformed subject".into()))
    }
}

/// A freshly issued credential
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Expiration time (Unix timestamp)
    pub expires_at: u64,
}

/// Session issuer and verifier
#[derive(Clone)]
pub struct JwtValidator {
    secret: String,
    ttl: Duration,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    /// Create a new validator.
    ///
    /// Fails when the secret is missing or too short; an unusable signing
    /// key must stop startup instead of producing tokens nobody can verify.
    pub fn new(secret: Option<String>, ttl: Duration) -> Result<Self, ChorusError> {
        let secret = secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ChorusError::Config("JWT_SECRET is not configured".into()))?;

        if secret.len() < MIN_SECRET_LEN {
            return Err(ChorusError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self { secret, ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a session token for an authenticated identity
    pub fn issue(&self, user_id: &ObjectId) -> Result<IssuedToken, ChorusError> {
        let now = unix_now()?;
        let claims = Claims {
            sub: user_id.to_hex(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };
        let token = self.encode_claims(&claims)?;

        Ok(IssuedToken {
            token,
            expires_at: claims.exp,
        })
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, ChorusError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| ChorusError::Internal(format!("Failed to generate token: {}", e)))
    }

    /// Verify signature and expiry and decode the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, ChorusError> {
        let validation = Validation::default();

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            use jsonwebtoken::errors::ErrorKind;
            let msg = match err.kind() {
                ErrorKind::ExpiredSignature => "Token expired",
                ErrorKind::InvalidToken => "Invalid token",
                ErrorKind::InvalidSignature => "Invalid signature",
                _ => "Token validation failed",
            };
            ChorusError::InvalidToken(msg.into())
        })
    }
}

fn unix_now() -> Result<u64, ChorusError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| ChorusError::Internal(format!("System time error: {}", e)))
}
