//! Role catalog repository

use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    QueryFilter, QueryOrder, Set,
};
use tracing::warn;

use crate::entities::role;
use crate::entities::user::UserRole;
use crate::store::StoreError;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinition {
    pub level: UserRole,
    pub is_active: bool,
}

impl RoleDefinition {
    /// Rows whose level is not a known role value are skipped with a warning
    fn from_model(model: role::Model) -> Option<Self> {
        match UserRole::try_from_value(&model.level) {
            Ok(level) => Some(Self {
                level,
                is_active: model.is_active,
            }),
            Err(_) => {
                warn!(level = %model.level, "Ignoring role catalog row with unknown level");
                None
            }
        }
    }
}

#[derive(Clone)]
pub struct RoleRepository {
    db: DatabaseConnection,
}

impl RoleRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<RoleDefinition>, StoreError> {
        let mut query = role::Entity::find().order_by_asc(role::Column::Level);
        if !include_inactive {
            query = query.filter(role::Column::IsActive.eq(true));
        }

        Ok(query
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(RoleDefinition::from_model)
            .collect())
    }

    pub async fn find(&self, level: UserRole) -> Result<Option<RoleDefinition>, StoreError> {
        Ok(role::Entity::find_by_id(level.to_value())
            .one(&self.db)
            .await?
            .and_then(RoleDefinition::from_model))
    }

    pub async fn create(
        &self,
        level: UserRole,
        is_active: bool,
    ) -> Result<RoleDefinition, StoreError> {
        if self.find(level).await?.is_some() {
            return Err(StoreError::DuplicateRole(level.to_value()));
        }

        role::ActiveModel {
            level: Set(level.to_value()),
            is_active: Set(is_active),
        }
        .insert(&self.db)
        .await?;

        Ok(RoleDefinition { level, is_active })
    }

    pub async fn set_active(
        &self,
        level: UserRole,
        is_active: bool,
    ) -> Result<RoleDefinition, StoreError> {
        let model = role::Entity::find_by_id(level.to_value())
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Role with level {}", level.to_value())))?;

        let mut active = model.into_active_model();
        active.is_active = Set(is_active);
        active.update(&self.db).await?;

        Ok(RoleDefinition { level, is_active })
    }
}
