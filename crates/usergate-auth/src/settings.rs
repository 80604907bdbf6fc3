//! Process-wide authentication settings

use thiserror::Error;
use tracing::warn;

use crate::jwt::{TokenError, TokenService};
use crate::password::{PasswordError, PasswordHasher, DEFAULT_HASH_COST};

/// Secret used when none is configured outside production
pub const DEV_FALLBACK_SECRET: &str = "usergate-development-secret-change-me";

#[derive(Debug, Error)]
pub enum AuthConfigError {
    #[error("No JWT secret configured; set JWT_SECRET (required in production)")]
    MissingSecret,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Signing secret, token lifetime and hash cost, loaded once at startup
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub jwt_secret: Option<String>,
    pub expires_in: String,
    pub hash_cost: u32,
    /// Refuse to start without an explicit secret
    pub production: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            expires_in: "1h".to_string(),
            hash_cost: DEFAULT_HASH_COST,
            production: false,
        }
    }
}

impl AuthSettings {
    /// Resolve the signing secret
    ///
    /// Falls back to [`DEV_FALLBACK_SECRET`] with a warning, unless running in
    /// production posture where a missing secret is an error.
    pub fn resolve_secret(&self) -> Result<String, AuthConfigError> {
        match self.jwt_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(secret.to_string()),
            _ if self.production => Err(AuthConfigError::MissingSecret),
            _ => {
                warn!(
                    "No JWT secret configured, using the built-in development secret. \
                     Tokens can be forged by anyone who knows it; set JWT_SECRET."
                );
                Ok(DEV_FALLBACK_SECRET.to_string())
            }
        }
    }

    pub fn token_service(&self) -> Result<TokenService, AuthConfigError> {
        let secret = self.resolve_secret()?;
        Ok(TokenService::new(secret.as_bytes(), &self.expires_in)?)
    }

    pub fn password_hasher(&self) -> Result<PasswordHasher, AuthConfigError> {
        Ok(PasswordHasher::new(self.hash_cost)?)
    }
}
