use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::{CurrentUser, RequestContext};
use crate::models::*;
use crate::services::avatars::avatar_url;
use crate::services::AvatarUpload;
use crate::AppState;

/// Callers other than ADMIN may only act on their own account
fn ensure_self_or_admin(actor: &CurrentUser, user_id: &str, message: &str) -> Result<(), ApiError> {
    if actor.is_admin() || actor.user_id == user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message.to_string()))
    }
}

// ============================================================================
// System
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============================================================================
// Authentication
// ============================================================================

/// Exchange email and password for a bearer token
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    debug!("Login attempt");
    Ok(Json(state.auth.login(&req.email, &req.password).await?))
}

/// The authenticated caller
pub async fn profile(Extension(user): Extension<CurrentUser>) -> Json<UserSummary> {
    Json(UserSummary {
        user_id: user.user_id,
        email: user.email,
        name: user.name,
        role: user.role,
    })
}

/// Acknowledge logout; tokens stay valid until they expire
pub async fn logout(Extension(user): Extension<CurrentUser>) -> Json<MessageResponse> {
    info!(user_id = %user.user_id, "User logged out");
    Json(MessageResponse {
        message: "Logout successful.".to_string(),
    })
}

// ============================================================================
// Users
// ============================================================================

/// Create a user; on an empty store this is the unauthenticated bootstrap path
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = match ctx {
        RequestContext::Bootstrap => state.users.bootstrap(req).await?,
        RequestContext::Authenticated(actor) => {
            debug!(actor = %actor.user_id, "Creating user");
            state.users.create(req).await?
        }
    };

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_self_or_admin(&actor, &user_id, "You can only access your own data")?;
    Ok(Json(state.users.get(&user_id).await?.into()))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<CurrentUser>,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_self_or_admin(&actor, &user_id, "You can only update your own data")?;

    if !actor.is_admin() && (req.role.is_some() || req.is_active.is_some()) {
        return Err(ApiError::Forbidden(
            "Only administrators can change role or account status".to_string(),
        ));
    }

    Ok(Json(state.users.update(&user_id, req).await?.into()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<CurrentUser>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    debug!(actor = %actor.user_id, target = %user_id, "Deleting user");
    state.users.remove(&user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.users.deactivate(&user_id).await?.into()))
}

/// Store a profile picture from the multipart field `avatar`
pub async fn upload_avatar(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<CurrentUser>,
    Path(user_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<AvatarUploadResponse>, ApiError> {
    ensure_self_or_admin(&actor, &user_id, "You can only upload your own avatar")?;

    // 404 before touching the disk
    state.users.get(&user_id).await?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("avatar") {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(format!("Failed to read upload: {}", e)))?;

        upload = Some(AvatarUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| ApiError::Validation("No file uploaded".to_string()))?;
    let filename = state.avatars.save(&user_id, upload).await?;
    let user = state.users.set_avatar(&user_id, filename.clone()).await?;

    Ok(Json(AvatarUploadResponse {
        message: "Avatar uploaded successfully".to_string(),
        url: avatar_url(&filename),
        avatar: filename,
        user: AvatarOwner {
            user_id: user.user_id,
            email: user.email,
            name: user.name,
            avatar: user.avatar,
        },
    }))
}

// ============================================================================
// Roles
// ============================================================================

pub async fn create_role(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateRoleRequest>,
) -> Result<(StatusCode, Json<RoleResponse>), ApiError> {
    let role = state.roles.create(req).await?;
    Ok((StatusCode::CREATED, Json(role.into())))
}

pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<RoleListQuery>,
) -> Result<Json<Vec<RoleResponse>>, ApiError> {
    let roles = state.roles.list(query.include_inactive).await?;
    Ok(Json(roles.into_iter().map(RoleResponse::from).collect()))
}

pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(level): Path<String>,
) -> Result<Json<RoleResponse>, ApiError> {
    Ok(Json(state.roles.get(&level).await?.into()))
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(level): Path<String>,
    ApiJson(req): ApiJson<UpdateRoleRequest>,
) -> Result<Json<RoleResponse>, ApiError> {
    Ok(Json(state.roles.update(&level, req).await?.into()))
}

/// Deactivate a role; catalog entries are never removed
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(level): Path<String>,
) -> Result<Json<RoleResponse>, ApiError> {
    Ok(Json(state.roles.remove(&level).await?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use usergate_auth::Role;

    fn actor(user_id: &str, role: Role) -> CurrentUser {
        CurrentUser {
            user_id: user_id.to_string(),
            email: format!("{}@b.com", user_id),
            name: None,
            role,
        }
    }

    #[test]
    fn test_ownership_rule() {
        let admin = actor("admin", Role::Admin);
        let alice = actor("alice", Role::User);

        assert!(ensure_self_or_admin(&admin, "alice", "no").is_ok());
        assert!(ensure_self_or_admin(&alice, "alice", "no").is_ok());
        assert!(matches!(
            ensure_self_or_admin(&alice, "bob", "no"),
            Err(ApiError::Forbidden(msg)) if msg == "no"
        ));
    }
}
