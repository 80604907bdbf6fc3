//! Integration tests for usergate-db
//!
//! Exercises the credential store and role catalog against an in-memory SQLite database

use usergate_db::{
    connect, migrate, CredentialStore, DbCredentialStore, NewUser, RoleRepository, StoreError,
    UserChanges, UserRole,
};

async fn setup_test_db() -> sea_orm::DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

fn new_user(user_id: &str, email: &str, role: UserRole) -> NewUser {
    NewUser {
        user_id: user_id.to_string(),
        email: email.to_string(),
        name: Some(format!("{} name", user_id)),
        password_hash: "$2b$04$not-a-real-hash-but-opaque-to-the-store".to_string(),
        role,
        is_active: true,
    }
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    assert!(migrate(&db).await.is_ok());
}

#[tokio::test]
async fn test_insert_and_lookup() {
    let store = DbCredentialStore::new(setup_test_db().await);

    assert_eq!(store.count().await.unwrap(), 0);

    let created = store
        .insert(new_user("user001", "a@b.com", UserRole::Admin))
        .await
        .unwrap();
    assert_eq!(created.user_id, "user001");
    assert_eq!(created.role, UserRole::Admin);
    assert!(created.is_active);
    assert!(created.avatar.is_none());

    assert_eq!(store.count().await.unwrap(), 1);

    let by_id = store.find_by_id("user001").await.unwrap().unwrap();
    assert_eq!(by_id.email, "a@b.com");

    let by_email = store.find_by_email("a@b.com").await.unwrap().unwrap();
    assert_eq!(by_email.user_id, "user001");

    let creds = store
        .find_credentials_by_email("a@b.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        creds.password_hash,
        "$2b$04$not-a-real-hash-but-opaque-to-the-store"
    );

    assert!(store.find_by_id("missing").await.unwrap().is_none());
    assert!(store.find_by_email("nobody@b.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_user_id_rejected() {
    let store = DbCredentialStore::new(setup_test_db().await);
    store
        .insert(new_user("user001", "a@b.com", UserRole::Admin))
        .await
        .unwrap();

    let err = store
        .insert(new_user("user001", "other@b.com", UserRole::User))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateUserId(id) if id == "user001"));
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let store = DbCredentialStore::new(setup_test_db().await);
    store
        .insert(new_user("user001", "a@b.com", UserRole::Admin))
        .await
        .unwrap();

    let err = store
        .insert(new_user("user002", "a@b.com", UserRole::User))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail(email) if email == "a@b.com"));
}

#[tokio::test]
async fn test_insert_first_only_on_empty_store() {
    let store = DbCredentialStore::new(setup_test_db().await);

    let founder = store
        .insert_first(new_user("root", "root@b.com", UserRole::Admin))
        .await
        .unwrap();
    assert_eq!(founder.user_id, "root");

    let err = store
        .insert_first(new_user("second", "second@b.com", UserRole::Admin))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::BootstrapClosed));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_fields() {
    let store = DbCredentialStore::new(setup_test_db().await);
    let created = store
        .insert(new_user("user001", "a@b.com", UserRole::User))
        .await
        .unwrap();

    let updated = store
        .update(
            "user001",
            UserChanges {
                email: Some("new@b.com".to_string()),
                name: Some("Renamed".to_string()),
                role: Some(UserRole::Admin),
                is_active: Some(false),
                avatar: Some("user001-1.png".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.email, "new@b.com");
    assert_eq!(updated.name.as_deref(), Some("Renamed"));
    assert_eq!(updated.role, UserRole::Admin);
    assert!(!updated.is_active);
    assert_eq!(updated.avatar.as_deref(), Some("user001-1.png"));
    assert!(updated.updated_at >= created.updated_at);

    let creds = store
        .find_credentials_by_email("new@b.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        creds.password_hash,
        "$2b$04$not-a-real-hash-but-opaque-to-the-store"
    );
}

#[tokio::test]
async fn test_update_email_conflict() {
    let store = DbCredentialStore::new(setup_test_db().await);
    store
        .insert(new_user("user001", "a@b.com", UserRole::User))
        .await
        .unwrap();
    store
        .insert(new_user("user002", "b@b.com", UserRole::User))
        .await
        .unwrap();

    let err = store
        .update(
            "user002",
            UserChanges {
                email: Some("a@b.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateEmail(_)));

    // Re-saving your own email is not a conflict
    store
        .update(
            "user001",
            UserChanges {
                email: Some("a@b.com".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_update_missing_user() {
    let store = DbCredentialStore::new(setup_test_db().await);

    let err = store
        .update("ghost", UserChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_remove_user() {
    let store = DbCredentialStore::new(setup_test_db().await);
    store
        .insert(new_user("user001", "a@b.com", UserRole::User))
        .await
        .unwrap();

    store.remove("user001").await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);

    let err = store.remove("user001").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_list_users() {
    let store = DbCredentialStore::new(setup_test_db().await);
    store
        .insert(new_user("user001", "a@b.com", UserRole::Admin))
        .await
        .unwrap();
    store
        .insert(new_user("user002", "b@b.com", UserRole::User))
        .await
        .unwrap();

    let users = store.list().await.unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(users.len(), 2);
    assert!(ids.contains(&"user001"));
    assert!(ids.contains(&"user002"));
}

#[tokio::test]
async fn test_role_catalog_seeded() {
    let roles = RoleRepository::new(setup_test_db().await);

    let all = roles.list(false).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.is_active));

    let admin = roles.find(UserRole::Admin).await.unwrap().unwrap();
    assert!(admin.is_active);
}

#[tokio::test]
async fn test_role_create_conflict_and_deactivate() {
    let roles = RoleRepository::new(setup_test_db().await);

    let err = roles.create(UserRole::User, true).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateRole(level) if level == "USER"));

    let deactivated = roles.set_active(UserRole::User, false).await.unwrap();
    assert!(!deactivated.is_active);

    let active = roles.list(false).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].level, UserRole::Admin);

    let everything = roles.list(true).await.unwrap();
    assert_eq!(everything.len(), 2);
}
