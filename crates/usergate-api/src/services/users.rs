//! User account management

use std::sync::Arc;

use tracing::info;
use usergate_auth::{PasswordHasher, PendingPassword, Role};
use usergate_db::{CredentialStore, NewUser, UserChanges, UserRecord};

use crate::error::ApiError;
use crate::models::{stored_role, CreateUserRequest, UpdateUserRequest};
use crate::validation::{check, normalize_email};

use super::hash_pending;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Create a user on behalf of an administrator
    pub async fn create(&self, request: CreateUserRequest) -> Result<UserRecord, ApiError> {
        let new_user = self.prepare(request).await?;
        let user = self.store.insert(new_user).await?;
        info!(user_id = %user.user_id, role = ?user.role, "User created");
        Ok(user)
    }

    /// Create the very first account
    ///
    /// Fails if any user exists by the time the insert runs.
    pub async fn bootstrap(&self, request: CreateUserRequest) -> Result<UserRecord, ApiError> {
        if request.role != Role::Admin {
            return Err(ApiError::InvalidBootstrapRole);
        }

        let new_user = self.prepare(request).await?;
        let user = self.store.insert_first(new_user).await?;
        info!(user_id = %user.user_id, "Created first user with the ADMIN role");
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<UserRecord>, ApiError> {
        Ok(self.store.list().await?)
    }

    pub async fn get(&self, user_id: &str) -> Result<UserRecord, ApiError> {
        self.store
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User with ID {} not found", user_id)))
    }

    pub async fn update(
        &self,
        user_id: &str,
        mut request: UpdateUserRequest,
    ) -> Result<UserRecord, ApiError> {
        request.email = request.email.as_deref().map(normalize_email);
        check(&request)?;

        let password_hash = match request.password {
            Some(password) => {
                Some(hash_pending(self.hasher, PendingPassword::plaintext(password)).await?)
            }
            None => None,
        };

        let changes = UserChanges {
            email: request.email,
            name: request.name,
            password_hash,
            role: request.role.map(stored_role),
            is_active: request.is_active,
            avatar: None,
        };

        let user = self.store.update(user_id, changes).await?;
        info!(user_id = %user.user_id, "User updated");
        Ok(user)
    }

    pub async fn remove(&self, user_id: &str) -> Result<(), ApiError> {
        self.store.remove(user_id).await?;
        info!(user_id = %user_id, "User deleted");
        Ok(())
    }

    /// Mark an account inactive; its tokens stop working on the next request
    pub async fn deactivate(&self, user_id: &str) -> Result<UserRecord, ApiError> {
        let changes = UserChanges {
            is_active: Some(false),
            ..Default::default()
        };
        let user = self.store.update(user_id, changes).await?;
        info!(user_id = %user.user_id, "User deactivated");
        Ok(user)
    }

    pub async fn set_avatar(&self, user_id: &str, filename: String) -> Result<UserRecord, ApiError> {
        let changes = UserChanges {
            avatar: Some(filename),
            ..Default::default()
        };
        Ok(self.store.update(user_id, changes).await?)
    }

    /// Validate a creation request and hash its password
    async fn prepare(&self, mut request: CreateUserRequest) -> Result<NewUser, ApiError> {
        request.email = normalize_email(&request.email);
        check(&request)?;

        let password_hash =
            hash_pending(self.hasher, PendingPassword::plaintext(request.password)).await?;

        Ok(NewUser {
            user_id: request.user_id,
            email: request.email,
            name: request.name,
            password_hash,
            role: stored_role(request.role),
            is_active: true,
        })
    }
}
