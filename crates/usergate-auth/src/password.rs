//! Password hashing and verification using bcrypt

use thiserror::Error;

/// Work factor used when no cost is configured
pub const DEFAULT_HASH_COST: u32 = 10;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Error types for password operations
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Cost outside the range bcrypt accepts
    #[error("Hash cost {0} is out of range (4..=31)")]
    InvalidCost(u32),

    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Stored hash could not be parsed
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),
}

/// Salted one-way password hasher with a fixed work factor
///
/// The cost is chosen once from configuration and reused for every hash;
/// verification reads the cost embedded in the stored hash, so raising the
/// configured cost does not invalidate existing passwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost(cost));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password
    ///
    /// # Returns
    /// * `Ok(String)` - modular crypt string suitable for storage
    /// * `Err(PasswordError)` - if hashing fails
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// The comparison is done by the bcrypt primitive, never by string
    /// equality.
    ///
    /// # Returns
    /// * `Ok(true)` - password matches
    /// * `Ok(false)` - password does not match
    /// * `Err(PasswordError)` - the stored hash is malformed
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(password, hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_HASH_COST,
        }
    }
}

/// A password value on its way to storage
///
/// Carries an explicit flag saying whether the value is still plaintext.
/// Callers hash through [`PendingPassword::into_hash`] before persisting;
/// a value that is already hashed passes through untouched.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingPassword {
    value: String,
    needs_hashing: bool,
}

impl PendingPassword {
    pub fn plaintext(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            needs_hashing: true,
        }
    }

    pub fn hashed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            needs_hashing: false,
        }
    }

    pub fn needs_hashing(&self) -> bool {
        self.needs_hashing
    }

    pub fn into_hash(self, hasher: &PasswordHasher) -> Result<String, PasswordError> {
        if self.needs_hashing {
            hasher.hash(&self.value)
        } else {
            Ok(self.value)
        }
    }
}

impl std::fmt::Debug for PendingPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingPassword")
            .field("value", &"<redacted>")
            .field("needs_hashing", &self.needs_hashing)
            .finish()
    }
}
