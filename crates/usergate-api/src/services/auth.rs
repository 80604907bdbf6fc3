//! Credential checks and token issuance

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info};
use usergate_auth::{AuthClaims, Identity, PasswordHasher, PendingPassword, TokenService};
use usergate_db::{CredentialStore, UserRecord};

use crate::error::ApiError;
use crate::models::{auth_role, LoginResponse, UserSummary};
use crate::validation::normalize_email;

use super::{hash_pending, verify_password};

/// Plaintext behind the hash checked when there is no real one to check
const DECOY_PASSWORD: &str = "usergate-decoy-password";

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
    /// Verified in place of a stored hash on rejected logins; computed once at the configured cost
    decoy: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
            decoy: Arc::new(OnceCell::new()),
        }
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    /// Check credentials and issue a token
    ///
    /// Unknown email, wrong password and inactive account all fail with
    /// [`ApiError::InvalidCredentials`].
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let user = self
            .validate_credentials(email, password)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let access_token = self.generate_token(&user)?;
        info!(user_id = %user.user_id, "User logged in");

        Ok(LoginResponse {
            access_token,
            expires_in: self.tokens.expires_in().to_string(),
            user: UserSummary::from(&user),
        })
    }

    /// The matching active user, or `None` when the credentials do not check out
    pub async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, ApiError> {
        let email = normalize_email(email);

        let Some(credentials) = self.store.find_credentials_by_email(&email).await? else {
            debug!("Login rejected: unknown email");
            self.verify_decoy(password).await?;
            return Ok(None);
        };

        if !credentials.user.is_active {
            debug!(user_id = %credentials.user.user_id, "Login rejected: account inactive");
            self.verify_decoy(password).await?;
            return Ok(None);
        }

        if !verify_password(self.hasher, password, credentials.password_hash).await? {
            debug!(user_id = %credentials.user.user_id, "Login rejected: wrong password");
            return Ok(None);
        }

        Ok(Some(credentials.user))
    }

    /// Spend the same bcrypt work as a real check and discard the result
    async fn verify_decoy(&self, password: &str) -> Result<(), ApiError> {
        let decoy = self
            .decoy
            .get_or_try_init(|| {
                hash_pending(self.hasher, PendingPassword::plaintext(DECOY_PASSWORD))
            })
            .await?
            .clone();
        verify_password(self.hasher, password, decoy).await?;
        Ok(())
    }

    /// Sign a token for `user` with the configured lifetime
    pub fn generate_token(&self, user: &UserRecord) -> Result<String, ApiError> {
        let identity = Identity {
            user_id: user.user_id.clone(),
            email: user.email.clone(),
            role: auth_role(user.role),
            name: user.name.clone(),
        };

        Ok(self
            .tokens
            .issue(&identity)
            .map_err(ApiError::internal)?
            .token)
    }

    pub fn verify_token(&self, token: &str) -> Result<AuthClaims, ApiError> {
        self.tokens.verify(token).map_err(|e| {
            debug!("Token rejected: {}", e);
            ApiError::InvalidOrExpiredToken
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{credentials, MockStore};
    use usergate_auth::Role;
    use usergate_db::UserRole;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4).unwrap()
    }

    fn service(store: MockStore) -> AuthService {
        AuthService::new(
            Arc::new(store),
            hasher(),
            Arc::new(TokenService::new(b"auth-service-secret", "1h").unwrap()),
        )
    }

    fn store_with(email: &'static str, password: &str, active: bool) -> MockStore {
        let hash = hasher().hash(password).unwrap();
        let mut store = MockStore::new();
        store
            .expect_find_credentials_by_email()
            .returning(move |requested| {
                if requested == email {
                    Ok(Some(credentials("user001", email, UserRole::Admin, active, &hash)))
                } else {
                    Ok(None)
                }
            });
        store
    }

    #[tokio::test]
    async fn test_login_success() {
        let auth = service(store_with("a@b.com", "Secret123", true));

        let response = auth.login("a@b.com", "Secret123").await.unwrap();

        assert_eq!(response.expires_in, "1h");
        assert_eq!(response.user.user_id, "user001");
        assert_eq!(response.user.role, Role::Admin);

        let claims = auth.verify_token(&response.access_token).unwrap();
        assert_eq!(claims.identity.user_id, "user001");
        assert_eq!(claims.identity.role, Role::Admin);
        assert_eq!(claims.identity.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_login_email_is_case_insensitive() {
        let auth = service(store_with("a@b.com", "Secret123", true));
        assert!(auth.login("  A@B.com ", "Secret123").await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let auth = service(store_with("a@b.com", "Secret123", true));

        let wrong = auth.login("a@b.com", "Wrong1234").await.unwrap_err();
        let unknown = auth.login("x@b.com", "Secret123").await.unwrap_err();

        assert!(matches!(wrong, ApiError::InvalidCredentials));
        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_inactive_account_cannot_log_in() {
        let auth = service(store_with("a@b.com", "Secret123", false));

        let err = auth.login("a@b.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
        assert!(auth
            .validate_credentials("a@b.com", "Secret123")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_rejected_logins_still_run_a_hash_check() {
        let auth = service(store_with("a@b.com", "Secret123", true));
        assert!(auth.decoy.get().is_none());

        let err = auth.login("x@b.com", "Secret123").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));

        let decoy = auth.decoy.get().expect("decoy hash computed");
        assert!(decoy.starts_with("$2"));
        assert!(hasher().verify(DECOY_PASSWORD, decoy).unwrap());

        let inactive = service(store_with("a@b.com", "Secret123", false));
        assert!(inactive.login("a@b.com", "Secret123").await.is_err());
        assert!(inactive.decoy.get().is_some());
    }

    #[tokio::test]
    async fn test_decoy_password_does_not_log_in() {
        let auth = service(store_with("a@b.com", "Secret123", true));
        let err = auth.login("x@b.com", DECOY_PASSWORD).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_a_mismatch() {
        let mut store = MockStore::new();
        store.expect_find_credentials_by_email().returning(|_| {
            Ok(Some(credentials(
                "user001",
                "a@b.com",
                UserRole::User,
                true,
                "not-a-bcrypt-hash",
            )))
        });

        let err = service(store)
            .login("a@b.com", "Secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_verify_token_rejects_garbage() {
        let auth = service(MockStore::new());
        assert!(matches!(
            auth.verify_token("not.a.token"),
            Err(ApiError::InvalidOrExpiredToken)
        ));
    }
}
