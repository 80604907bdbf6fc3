//! Access guard middleware
//!
//! Runs in front of every protected route. It extracts the bearer token,
//! verifies it, re-reads the account so deactivation and role changes take
//! effect on the next request, checks the route's required roles and makes
//! the caller available to handlers via Axum's Extension.
//!
//! While the user table is empty, the create-user route is admitted without
//! a token provided the body asks for the ADMIN role.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use usergate_auth::{Role, TokenService};
use usergate_db::{CredentialStore, UserRecord};

use crate::error::ApiError;
use crate::models::auth_role;
use crate::policy::{Operation, RoutePolicy};

/// Largest body buffered while inspecting a bootstrap request
const MAX_BOOTSTRAP_BODY: usize = 64 * 1024;

/// The authenticated caller, as currently stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&UserRecord> for CurrentUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: auth_role(user.role),
        }
    }
}

/// How a request got past the guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestContext {
    /// First account creation on an empty store
    Bootstrap,
    Authenticated(CurrentUser),
}

impl RequestContext {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Bootstrap => None,
            Self::Authenticated(user) => Some(user),
        }
    }
}

pub struct AccessGuard {
    store: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    policy: RoutePolicy,
}

impl AccessGuard {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        policy: RoutePolicy,
    ) -> Self {
        Self {
            store,
            tokens,
            policy,
        }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// True when `operation` is user creation and no user exists yet
    pub async fn bootstrap_open(&self, operation: Operation) -> Result<bool, ApiError> {
        if operation != Operation::CreateUser {
            return Ok(false);
        }
        Ok(self.store.count().await? == 0)
    }

    /// Accept a bootstrap request only when it asks for the ADMIN role
    pub fn admit_bootstrap(&self, requested_role: Option<&str>) -> Result<(), ApiError> {
        match requested_role {
            Some(role) if role == Role::Admin.as_str() => {
                info!("No users exist, admitting unauthenticated creation of the first ADMIN");
                Ok(())
            }
            other => {
                error!(
                    requested_role = ?other,
                    "Rejected first account creation: the first user must have the ADMIN role"
                );
                Err(ApiError::InvalidBootstrapRole)
            }
        }
    }

    /// Authenticate `authorization` and authorize it for `operation`
    pub async fn authenticate(
        &self,
        operation: Operation,
        authorization: Option<&str>,
    ) -> Result<CurrentUser, ApiError> {
        let token = authorization.and_then(bearer_token).ok_or_else(|| {
            ApiError::Unauthenticated(
                "Missing or malformed Authorization header. Expected 'Bearer <token>'".into(),
            )
        })?;

        let claims = self.tokens.verify(token).map_err(|e| {
            debug!("Token rejected: {}", e);
            ApiError::Unauthenticated("Invalid or expired token".into())
        })?;

        let record = self
            .store
            .find_by_id(&claims.identity.user_id)
            .await?
            .ok_or_else(|| {
                debug!(user_id = %claims.identity.user_id, "Token subject no longer exists");
                ApiError::Unauthenticated("Invalid or expired token".into())
            })?;

        if !record.is_active {
            debug!(user_id = %record.user_id, "Token subject is inactive");
            return Err(ApiError::Unauthenticated("Account is inactive".into()));
        }

        let user = CurrentUser::from(&record);

        if !self.policy.permits(operation, user.role) {
            let required = self
                .policy
                .required_roles(operation)
                .first()
                .map(Role::as_str)
                .unwrap_or_default();
            warn!(
                user_id = %user.user_id,
                role = %user.role,
                ?operation,
                "Access denied"
            );
            return Err(ApiError::Forbidden(format!(
                "This action requires permission {}",
                required
            )));
        }

        Ok(user)
    }
}

/// Per-route middleware state: the shared guard and the route's operation
#[derive(Clone)]
pub struct GuardState {
    pub guard: Arc<AccessGuard>,
    pub operation: Operation,
}

impl GuardState {
    pub fn new(guard: Arc<AccessGuard>, operation: Operation) -> Self {
        Self { guard, operation }
    }
}

/// Access guard middleware
///
/// On success inserts a [`RequestContext`] and, for authenticated callers,
/// a [`CurrentUser`] into the request extensions.
///
/// # Errors
/// - 400 when the first account is requested with a non-ADMIN role
/// - 401 when the token is missing, invalid, expired or its account is gone or inactive
/// - 403 when the caller's role is not allowed for the route
pub async fn enforce_access(
    State(state): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let guard = &state.guard;

    if guard.bootstrap_open(state.operation).await? {
        let (parts, body) = request.into_parts();
        let bytes = to_bytes(body, MAX_BOOTSTRAP_BODY)
            .await
            .map_err(|_| ApiError::InvalidBootstrapRole)?;

        guard.admit_bootstrap(requested_role(&bytes).as_deref())?;

        let mut request = Request::from_parts(parts, Body::from(bytes));
        request.extensions_mut().insert(RequestContext::Bootstrap);
        return Ok(next.run(request).await);
    }

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_owned);

    let user = guard
        .authenticate(state.operation, authorization.as_deref())
        .await?;

    request.extensions_mut().insert(user.clone());
    request
        .extensions_mut()
        .insert(RequestContext::Authenticated(user));

    Ok(next.run(request).await)
}

/// Token from an `Authorization: Bearer <token>` header value
fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[derive(Deserialize)]
struct RequestedRole {
    role: Option<String>,
}

/// The `role` field of a JSON body, if it parses
fn requested_role(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<RequestedRole>(body)
        .ok()
        .and_then(|requested| requested.role)
}
