//! Signed token issuance and verification (HS256 JWT)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::role::Role;

/// Identity fields carried by a token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Token payload: identity plus the timing claims added at issuance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthClaims {
    #[serde(flatten)]
    pub identity: Identity,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

impl AuthClaims {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Token errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid token lifetime '{0}'")]
    InvalidExpiry(String),

    #[error("Signing secret must not be empty")]
    EmptySecret,

    #[error("JWT encoding error: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Issues and verifies HMAC-SHA256 tokens with a process-wide secret
///
/// Verification checks the signature and expiry only; there is no issuer or
/// audience to match since a single service both issues and consumes tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    expires_in: String,
}

impl TokenService {
    /// Create a token service
    ///
    /// `expires_in` is the configured lifetime as written in configuration
    /// (`"1h"`, `"30m"`, `"3600"`); it is echoed back to clients at login.
    pub fn new(secret: &[u8], expires_in: &str) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        // Lifetimes past the representable calendar range are rejected up front
        let ttl = parse_expiry(expires_in)
            .filter(|ttl| Utc::now().checked_add_signed(*ttl).is_some())
            .ok_or_else(|| TokenError::InvalidExpiry(expires_in.into()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            expires_in: expires_in.trim().to_string(),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn expires_in(&self) -> &str {
        &self.expires_in
    }

    /// Sign a token for `identity`, valid from now for the configured lifetime
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, Utc::now())
    }

    /// Sign a token as if issued at `issued_at`
    pub fn issue_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::InvalidExpiry(self.expires_in.clone()))?;
        let claims = AuthClaims {
            identity: identity.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature and expiry, returning the embedded claims
    ///
    /// Anything that is not a well-formed token signed with our secret is
    /// reported as [`TokenError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<AuthClaims, TokenError> {
        let data = decode::<AuthClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::InvalidToken,
            },
        )?;

        if data.claims.is_expired_at(Utc::now()) {
            return Err(TokenError::ExpiredToken);
        }

        Ok(data.claims)
    }
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("expires_in", &self.expires_in)
            .finish_non_exhaustive()
    }
}

/// Parse a token lifetime: `<n>s`, `<n>m`, `<n>h`, `<n>d` or bare seconds
pub fn parse_expiry(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&value[..idx], c.to_ascii_lowercase()),
        _ => (value, 's'),
    };

    let amount: i64 = digits.parse().ok().filter(|n| *n > 0)?;

    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
}
