//! Role catalog management

use tracing::info;
use usergate_auth::Role;
use usergate_db::{RoleDefinition, RoleRepository};

use crate::error::ApiError;
use crate::models::{auth_role, stored_role, CreateRoleRequest, UpdateRoleRequest};

#[derive(Clone)]
pub struct RoleService {
    repo: RoleRepository,
}

/// Parse a role level, reporting unknown values as a validation error
pub fn parse_level(level: &str) -> Result<Role, ApiError> {
    level.parse::<Role>().map_err(|_| {
        ApiError::Validation(format!(
            "Unknown role level '{}'; expected one of ADMIN, USER",
            level
        ))
    })
}

impl RoleService {
    pub fn new(repo: RoleRepository) -> Self {
        Self { repo }
    }

    pub async fn create(&self, request: CreateRoleRequest) -> Result<RoleDefinition, ApiError> {
        let level = parse_level(&request.level)?;
        let role = self
            .repo
            .create(stored_role(level), request.is_active.unwrap_or(true))
            .await?;
        info!(level = %level, "Role created");
        Ok(role)
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<RoleDefinition>, ApiError> {
        Ok(self.repo.list(include_inactive).await?)
    }

    pub async fn get(&self, level: &str) -> Result<RoleDefinition, ApiError> {
        let level = parse_level(level)?;
        self.repo
            .find(stored_role(level))
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Role with level {} not found", level)))
    }

    /// Only the active flag is mutable; the level is the role's identity
    pub async fn update(
        &self,
        level: &str,
        request: UpdateRoleRequest,
    ) -> Result<RoleDefinition, ApiError> {
        let current = self.get(level).await?;

        if let Some(requested) = request.level.as_deref() {
            if parse_level(requested)? != auth_role(current.level) {
                return Err(ApiError::Validation("Cannot change role level".into()));
            }
        }

        match request.is_active {
            Some(is_active) if is_active != current.is_active => {
                let role = self.repo.set_active(current.level, is_active).await?;
                info!(level = ?role.level, is_active, "Role updated");
                Ok(role)
            }
            _ => Ok(current),
        }
    }

    /// Soft delete: the role is deactivated, never removed
    pub async fn remove(&self, level: &str) -> Result<RoleDefinition, ApiError> {
        let current = self.get(level).await?;
        let role = self.repo.set_active(current.level, false).await?;
        info!(level = ?role.level, "Role deactivated");
        Ok(role)
    }
}
