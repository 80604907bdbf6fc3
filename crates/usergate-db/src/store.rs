//! Credential store: persistence of user records

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use thiserror::Error;
use tracing::debug;

use crate::entities::user::{self, UserRole};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("User with ID {0} already exists")]
    DuplicateUserId(String),

    #[error("Email {0} is already in use")]
    DuplicateEmail(String),

    #[error("Role with level {0} already exists")]
    DuplicateRole(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Users already exist; bootstrap creation is closed")]
    BootstrapClosed,

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A user as returned by default lookups (no password material)
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<user::Model> for UserRecord {
    fn from(model: user::Model) -> Self {
        Self {
            user_id: model.user_id,
            email: model.email,
            name: model.name,
            role: model.role,
            avatar: model.avatar,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A user together with the stored password hash, for credential checks only
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: UserRecord,
    pub password_hash: String,
}

/// A user ready to be inserted; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
}

/// Field-wise update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub avatar: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.name.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
            && self.avatar.is_none()
    }
}

/// Persistence operations the authentication layer depends on
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Number of stored users
    async fn count(&self) -> Result<u64, StoreError>;

    async fn list(&self) -> Result<Vec<UserRecord>, StoreError>;

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Exact match on the stored (lower-cased) email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError>;

    /// Insert a user; fails on duplicate id or email
    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Insert a user only if the store is empty
    ///
    /// Count and insert run in one transaction; fails with
    /// [`StoreError::BootstrapClosed`] when any user exists.
    async fn insert_first(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    async fn update(&self, user_id: &str, changes: UserChanges) -> Result<UserRecord, StoreError>;

    /// Hard delete; fails with [`StoreError::NotFound`] if absent
    async fn remove(&self, user_id: &str) -> Result<(), StoreError>;
}

/// [`CredentialStore`] backed by a SeaORM connection
#[derive(Clone)]
pub struct DbCredentialStore {
    db: DatabaseConnection,
}

impl DbCredentialStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

async fn insert_on<C: ConnectionTrait>(conn: &C, user: NewUser) -> Result<UserRecord, StoreError> {
    if user::Entity::find_by_id(user.user_id.clone())
        .one(conn)
        .await?
        .is_some()
    {
        return Err(StoreError::DuplicateUserId(user.user_id));
    }

    if user::Entity::find()
        .filter(user::Column::Email.eq(user.email.as_str()))
        .one(conn)
        .await?
        .is_some()
    {
        return Err(StoreError::DuplicateEmail(user.email));
    }

    let now = Utc::now();
    let user_id = user.user_id.clone();
    let email = user.email.clone();

    let model = user::ActiveModel {
        user_id: Set(user.user_id),
        email: Set(user.email),
        name: Set(user.name),
        password_hash: Set(user.password_hash),
        role: Set(user.role),
        avatar: Set(None),
        is_active: Set(user.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let inserted = model
        .insert(conn)
        .await
        .map_err(|e| unique_violation(e, &user_id, &email))?;

    Ok(inserted.into())
}

/// Concurrent writers can slip past the existence checks; the unique
/// constraints catch them here.
fn unique_violation(err: DbErr, user_id: &str, email: &str) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            if detail.contains("email") {
                StoreError::DuplicateEmail(email.to_string())
            } else {
                StoreError::DuplicateUserId(user_id.to_string())
            }
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl CredentialStore for DbCredentialStore {
    async fn count(&self) -> Result<u64, StoreError> {
        Ok(user::Entity::find().count(&self.db).await?)
    }

    async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::UserId)
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(UserRecord::from).collect())
    }

    async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(user::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .map(UserRecord::from))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(UserRecord::from))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        Ok(user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?
            .map(|model| {
                let password_hash = model.password_hash.clone();
                UserCredentials {
                    user: model.into(),
                    password_hash,
                }
            }))
    }

    async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        insert_on(&self.db, user).await
    }

    async fn insert_first(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let txn = self.db.begin().await?;

        let existing = user::Entity::find().count(&txn).await?;
        if existing > 0 {
            debug!(existing, "Bootstrap insert refused");
            txn.rollback().await?;
            return Err(StoreError::BootstrapClosed);
        }

        let record = insert_on(&txn, user).await?;
        txn.commit().await?;

        Ok(record)
    }

    async fn update(&self, user_id: &str, changes: UserChanges) -> Result<UserRecord, StoreError> {
        let model = user::Entity::find_by_id(user_id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("User with ID {}", user_id)))?;

        if let Some(ref email) = changes.email {
            let taken = user::Entity::find()
                .filter(user::Column::Email.eq(email.as_str()))
                .filter(user::Column::UserId.ne(user_id))
                .one(&self.db)
                .await?
                .is_some();
            if taken {
                return Err(StoreError::DuplicateEmail(email.clone()));
            }
        }

        let email_for_error = changes.email.clone().unwrap_or_default();
        let mut active = model.into_active_model();

        if let Some(email) = changes.email {
            active.email = Set(email);
        }
        if let Some(name) = changes.name {
            active.name = Set(Some(name));
        }
        if let Some(hash) = changes.password_hash {
            active.password_hash = Set(hash);
        }
        if let Some(role) = changes.role {
            active.role = Set(role);
        }
        if let Some(is_active) = changes.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(avatar) = changes.avatar {
            active.avatar = Set(Some(avatar));
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| unique_violation(e, user_id, &email_for_error))?;

        Ok(updated.into())
    }

    async fn remove(&self, user_id: &str) -> Result<(), StoreError> {
        let result = user::Entity::delete_by_id(user_id.to_string())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(format!("User with ID {}", user_id)));
        }

        Ok(())
    }
}
