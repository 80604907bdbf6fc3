//! Role catalog entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog row describing a role level and whether it is in use.
///
/// `level` holds a [`super::user::UserRole`] string value. It is not a
/// foreign key of `users.role`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub level: String,

    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
