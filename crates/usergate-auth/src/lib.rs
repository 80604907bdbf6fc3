//! Authentication primitives for the user management service
//!
//! Password hashing, signed token issuance/verification and the closed set of
//! role levels. Nothing in this crate touches storage or the network.

pub mod jwt;
pub mod password;
pub mod role;
pub mod settings;

pub use jwt::{parse_expiry, AuthClaims, Identity, IssuedToken, TokenError, TokenService};
pub use password::{PasswordError, PasswordHasher, PendingPassword, DEFAULT_HASH_COST};
pub use role::{Role, UnknownRole};
pub use settings::{AuthConfigError, AuthSettings, DEV_FALLBACK_SECRET};
