pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod services;
pub mod validation;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::info;
use usergate_auth::{AuthConfigError, AuthSettings};
use usergate_db::{CredentialStore, DbCredentialStore, RoleRepository};

pub use error::ApiError;
pub use middleware::{AccessGuard, CurrentUser, GuardState, RequestContext};
pub use policy::{Operation, RoutePolicy};
pub use services::{AuthService, AvatarStore, RoleService, UserService};

use services::avatars::{AVATAR_URL_PREFIX, MAX_AVATAR_BYTES};

/// Multipart framing on top of the largest accepted avatar
const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 64 * 1024;

/// Application state shared across handlers
pub struct AppState {
    pub auth: AuthService,
    pub users: UserService,
    pub roles: RoleService,
    pub avatars: AvatarStore,
    pub guard: Arc<AccessGuard>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS for local development origins
    pub enable_cors: bool,
    /// Token secret, lifetime and hash cost
    pub auth: AuthSettings,
    /// Directory avatars are written to and served from
    pub avatar_dir: PathBuf,
    /// Roles required per operation
    pub policy: RoutePolicy,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            enable_cors: false,
            auth: AuthSettings::default(),
            avatar_dir: PathBuf::from("./uploads/avatars"),
            policy: RoutePolicy::standard(),
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server over a migrated database
    ///
    /// Fails when the auth settings are unusable, e.g. no secret in production.
    pub fn new(config: ApiServerConfig, db: DatabaseConnection) -> Result<Self, AuthConfigError> {
        let tokens = Arc::new(config.auth.token_service()?);
        let hasher = config.auth.password_hasher()?;
        let store: Arc<dyn CredentialStore> = Arc::new(DbCredentialStore::new(db.clone()));

        let state = Arc::new(AppState {
            auth: AuthService::new(store.clone(), hasher, tokens.clone()),
            users: UserService::new(store.clone(), hasher),
            roles: RoleService::new(RoleRepository::new(db)),
            avatars: AvatarStore::new(config.avatar_dir.clone()),
            guard: Arc::new(AccessGuard::new(store, tokens, config.policy.clone())),
        });

        Ok(Self { config, state })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let guard = |operation: Operation| {
            axum_middleware::from_fn_with_state(
                GuardState::new(self.state.guard.clone(), operation),
                middleware::enforce_access,
            )
        };

        let router = Router::new()
            // Public
            .route("/health", get(handlers::health_check))
            .route("/auth/login", post(handlers::login))
            // Guarded, one operation per route and method
            .route(
                "/auth/profile",
                get(handlers::profile).route_layer(guard(Operation::Profile)),
            )
            .route(
                "/auth/logout",
                post(handlers::logout).route_layer(guard(Operation::Logout)),
            )
            .route(
                "/users",
                post(handlers::create_user)
                    .route_layer(guard(Operation::CreateUser))
                    .merge(get(handlers::list_users).route_layer(guard(Operation::ListUsers))),
            )
            .route(
                "/users/{user_id}",
                get(handlers::get_user)
                    .route_layer(guard(Operation::GetUser))
                    .merge(post(handlers::update_user).route_layer(guard(Operation::UpdateUser)))
                    .merge(
                        axum::routing::delete(handlers::delete_user)
                            .route_layer(guard(Operation::DeleteUser)),
                    ),
            )
            .route(
                "/users/{user_id}/deactivate",
                post(handlers::deactivate_user).route_layer(guard(Operation::DeactivateUser)),
            )
            .route(
                "/users/{user_id}/avatar",
                post(handlers::upload_avatar)
                    .route_layer(guard(Operation::UploadAvatar))
                    .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
            )
            .route(
                "/roles",
                post(handlers::create_role)
                    .route_layer(guard(Operation::CreateRole))
                    .merge(get(handlers::list_roles).route_layer(guard(Operation::ListRoles))),
            )
            .route(
                "/roles/level/{level}",
                get(handlers::get_role).route_layer(guard(Operation::GetRole)),
            )
            .route(
                "/roles/{level}",
                post(handlers::update_role)
                    .route_layer(guard(Operation::UpdateRole))
                    .merge(
                        axum::routing::delete(handlers::delete_role)
                            .route_layer(guard(Operation::DeleteRole)),
                    ),
            )
            .nest_service(
                AVATAR_URL_PREFIX,
                ServeDir::new(self.state.avatars.dir().to_path_buf()),
            )
            .with_state(self.state.clone());

        // Build middleware stack
        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(dev_cors());
        }

        router
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "Serving avatars from {} at {}",
            self.config.avatar_dir.display(),
            AVATAR_URL_PREFIX
        );

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

/// CORS for browser clients on localhost
fn dev_cors() -> CorsLayer {
    use tower_http::cors::AllowOrigin;

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            let origin_str = origin.to_str().unwrap_or("");
            origin_str.starts_with("http://localhost:")
                || origin_str.starts_with("http://127.0.0.1:")
                || origin_str.starts_with("https://localhost:")
                || origin_str.starts_with("https://127.0.0.1:")
        }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use chrono::Utc;
    use usergate_db::{
        CredentialStore, NewUser, StoreError, UserChanges, UserCredentials, UserRecord, UserRole,
    };

    mockall::mock! {
        pub Store {}

        #[async_trait]
        impl CredentialStore for Store {
            async fn count(&self) -> Result<u64, StoreError>;
            async fn list(&self) -> Result<Vec<UserRecord>, StoreError>;
            async fn find_by_id(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError>;
            async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
            async fn find_credentials_by_email(
                &self,
                email: &str,
            ) -> Result<Option<UserCredentials>, StoreError>;
            async fn insert(&self, user: NewUser) -> Result<UserRecord, StoreError>;
            async fn insert_first(&self, user: NewUser) -> Result<UserRecord, StoreError>;
            async fn update(
                &self,
                user_id: &str,
                changes: UserChanges,
            ) -> Result<UserRecord, StoreError>;
            async fn remove(&self, user_id: &str) -> Result<(), StoreError>;
        }
    }

    pub fn record(user_id: &str, role: UserRole, is_active: bool) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            user_id: user_id.to_string(),
            email: format!("{}@b.com", user_id),
            name: None,
            role,
            avatar: None,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn credentials(
        user_id: &str,
        email: &str,
        role: UserRole,
        is_active: bool,
        password_hash: &str,
    ) -> UserCredentials {
        let mut user = record(user_id, role, is_active);
        user.email = email.to_string();
        UserCredentials {
            user,
            password_hash: password_hash.to_string(),
        }
    }
}
