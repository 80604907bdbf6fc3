//! Application services behind the HTTP handlers

pub mod auth;
pub mod avatars;
pub mod roles;
pub mod users;

pub use auth::AuthService;
pub use avatars::{AvatarStore, AvatarUpload};
pub use roles::RoleService;
pub use users::UserService;

use usergate_auth::{PasswordHasher, PendingPassword};

use crate::error::ApiError;

/// Hash a pending password off the async runtime
pub(crate) async fn hash_pending(
    hasher: PasswordHasher,
    password: PendingPassword,
) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || password.into_hash(&hasher))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)
}

/// Verify a password off the async runtime
///
/// An unreadable stored hash counts as a mismatch.
pub(crate) async fn verify_password(
    hasher: PasswordHasher,
    password: &str,
    hash: String,
) -> Result<bool, ApiError> {
    let password = password.to_owned();
    let result = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
        .await
        .map_err(ApiError::internal)?;

    match result {
        Ok(matches) => Ok(matches),
        Err(e) => {
            tracing::warn!("Stored password hash could not be read: {}", e);
            Ok(false)
        }
    }
}
