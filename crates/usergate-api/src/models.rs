//! Request and response payloads
//!
//! User and role payloads use camelCase field names; the login response keeps
//! the snake_case `access_token`/`expires_in` pair clients already expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use usergate_auth::Role;
use usergate_db::{RoleDefinition, UserRecord, UserRole};
use validator::Validate;

use crate::validation::{no_whitespace, password_strength};

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Convert a stored role into the token-level role
pub fn auth_role(role: UserRole) -> Role {
    match role {
        UserRole::Admin => Role::Admin,
        UserRole::User => Role::User,
    }
}

/// Convert a token-level role into the stored role
pub fn stored_role(role: Role) -> UserRole {
    match role {
        Role::Admin => UserRole::Admin,
        Role::User => UserRole::User,
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// User email address
    pub email: String,
    /// User password
    pub password: String,
}

/// Identity summary returned by login and profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: auth_role(user.role),
        }
    }
}

/// User login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Signed bearer token
    pub access_token: String,
    /// Configured token lifetime, e.g. "1h"
    pub expires_in: String,
    /// Logged in user
    pub user: UserSummary,
}

// ============================================================================
// Users
// ============================================================================

/// User as exposed over the API; never carries the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    /// Stored avatar filename
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            role: auth_role(user.role),
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            avatar: user.avatar,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Create user request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    /// Caller-chosen unique identifier
    #[validate(
        length(min = 1, max = 64, message = "userId must be 1 to 64 characters"),
        custom(function = "no_whitespace", message = "userId must not contain whitespace")
    )]
    pub user_id: String,
    #[validate(length(max = 255, message = "name must be at most 255 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    /// Plaintext password; hashed before storage
    #[validate(
        length(min = 8, max = 32, message = "password must be 8 to 32 characters"),
        custom(function = "password_strength", message = "password too weak")
    )]
    pub password: String,
    pub role: Role,
}

/// Partial user update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(max = 255, message = "name must be at most 255 characters"))]
    pub name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[validate(
        length(min = 8, max = 32, message = "password must be 8 to 32 characters"),
        custom(function = "password_strength", message = "password too weak")
    )]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Owner details echoed after an avatar upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarOwner {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// Avatar upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarUploadResponse {
    pub message: String,
    /// Stored filename
    pub avatar: String,
    /// Public path the file is served from
    pub url: String,
    pub user: AvatarOwner,
}

// ============================================================================
// Roles
// ============================================================================

/// Role catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleResponse {
    pub level: Role,
    pub is_active: bool,
}

impl From<RoleDefinition> for RoleResponse {
    fn from(role: RoleDefinition) -> Self {
        Self {
            level: auth_role(role.level),
            is_active: role.is_active,
        }
    }
}

/// Create role request
///
/// `level` is taken as a string so unknown values produce a validation error
/// rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub level: String,
    pub is_active: Option<bool>,
}

/// Update role request; only the active flag may change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub level: Option<String>,
    pub is_active: Option<bool>,
}

/// Query parameters for listing roles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleListQuery {
    /// Include deactivated roles
    #[serde(default)]
    pub include_inactive: bool,
}
