//! User entity for authentication and user management

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role level stored on a user row
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum UserRole {
    /// Administrator with full access
    #[sea_orm(string_value = "ADMIN")]
    Admin,

    /// Regular user
    #[sea_orm(string_value = "USER")]
    User,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Caller-chosen identifier (primary key, immutable)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Login identifier, stored lower-cased (unique)
    #[sea_orm(unique)]
    pub email: String,

    /// Display name (optional)
    pub name: Option<String>,

    /// bcrypt hash, never plaintext
    pub password_hash: String,

    pub role: UserRole,

    /// Avatar file name (optional)
    pub avatar: Option<String>,

    /// Inactive users can neither log in nor pass the access guard
    pub is_active: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
