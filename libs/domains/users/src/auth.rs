use std::sync::Arc;
use tracing::instrument;

use crate::error::{UserError, UserResult};
use crate::models::{AuthenticatedUser, LoginResponse, TokenResponse, UserResponse};
use crate::oauth::{CredentialBuilder, TokenExchange, TokenStore};
use crate::repository::UserRepository;

/// Login, refresh and logout on top of the token endpoint
pub struct AuthService<R: UserRepository> {
    users: Arc<R>,
    credentials: CredentialBuilder,
    exchange: Arc<dyn TokenExchange>,
    tokens: Arc<dyn TokenStore>,
}

impl<R: UserRepository> Clone for AuthService<R> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            credentials: self.credentials.clone(),
            exchange: Arc::clone(&self.exchange),
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<R: UserRepository> AuthService<R> {
    pub fn new(
        users: Arc<R>,
        credentials: CredentialBuilder,
        exchange: Arc<dyn TokenExchange>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            users,
            credentials,
            exchange,
            tokens,
        }
    }

    /// Password grant for a username or email.
    ///
    /// An unknown identifier fails before the token endpoint is called.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> UserResult<LoginResponse> {
        let Some(user) = self.users.find_by_username_or_email(username).await? else {
            tracing::info!("Login for unknown user");
            return Err(UserError::incorrect_credentials());
        };

        let credentials = self.credentials.password(username, password, None);
        let token = self.exchange.exchange(&credentials).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginResponse {
            user: user.into(),
            token,
        })
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> UserResult<TokenResponse> {
        let credentials = self.credentials.refresh_token(refresh_token, None);
        self.exchange.exchange(&credentials).await
    }

    /// Revoke the caller's access token and every refresh token issued with it
    #[instrument(skip_all, fields(user_id = %identity.user.id, token_id = %identity.token_id))]
    pub async fn logout(&self, identity: &AuthenticatedUser) -> UserResult<UserResponse> {
        if !self.tokens.revoke_access_token(identity.token_id).await? {
            return Err(UserError::Unauthorized("Unauthenticated.".to_string()));
        }
        let refresh_revoked = self
            .tokens
            .revoke_refresh_tokens_by_access_token_id(identity.token_id)
            .await?;

        tracing::info!(refresh_revoked, "User logged out");
        Ok(identity.user.clone().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateUser, User};
    use crate::oauth::exchange::MockTokenExchange;
    use crate::oauth::store::MockTokenStore;
    use crate::oauth::{GrantType, OAuthClientConfig};
    use crate::repository::MockUserRepository;
    use mockall::predicate;
    use uuid::Uuid;

    fn alice() -> User {
        User::new(
            CreateUser {
                username: "alice".into(),
                email: "alice@example.com".into(),
                first_name: "Alice".into(),
                middle_name: None,
                last_name: "Liddell".into(),
                password: String::new(),
            },
            "hash".into(),
        )
    }

    fn tokens() -> TokenResponse {
        TokenResponse::bearer(60, "access".into(), "refresh".into())
    }

    fn service(
        repo: MockUserRepository,
        exchange: MockTokenExchange,
        store: MockTokenStore,
    ) -> AuthService<MockUserRepository> {
        AuthService::new(
            Arc::new(repo),
            CredentialBuilder::new(OAuthClientConfig::new("client", "secret")),
            Arc::new(exchange),
            Arc::new(store),
        )
    }

    #[tokio::test]
    async fn test_login_unknown_user_skips_exchange() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username_or_email()
            .with(predicate::eq("ghost"))
            .returning(|_| Ok(None));
        let mut exchange = MockTokenExchange::new();
        exchange.expect_exchange().never();

        let err = service(repo, exchange, MockTokenStore::new())
            .login("ghost", "pw")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Incorrect username or password");
    }

    #[tokio::test]
    async fn test_login_sends_password_credentials() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username_or_email()
            .returning(|_| Ok(Some(alice())));
        let mut exchange = MockTokenExchange::new();
        exchange
            .expect_exchange()
            .withf(|creds| {
                creds.grant_type == GrantType::Password
                    && creds.field("username") == Some("alice@example.com")
                    && creds.field("password") == Some("pw")
                    && creds.client_id == "client"
                    && creds.scope.is_empty()
            })
            .times(1)
            .returning(|_| Ok(tokens()));

        let response = service(repo, exchange, MockTokenStore::new())
            .login("alice@example.com", "pw")
            .await
            .unwrap();
        assert_eq!(response.user.username, "alice");
        assert_eq!(response.token, tokens());
    }

    #[tokio::test]
    async fn test_login_propagates_exchange_error() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_by_username_or_email()
            .returning(|_| Ok(Some(alice())));
        let mut exchange = MockTokenExchange::new();
        exchange
            .expect_exchange()
            .returning(|_| Err(UserError::incorrect_credentials()));

        let err = service(repo, exchange, MockTokenStore::new())
            .login("alice", "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_refresh_sends_refresh_credentials() {
        let mut exchange = MockTokenExchange::new();
        exchange
            .expect_exchange()
            .withf(|creds| {
                creds.grant_type == GrantType::RefreshToken
                    && creds.field("refresh_token") == Some("rt")
            })
            .returning(|_| Ok(tokens()));

        let response = service(MockUserRepository::new(), exchange, MockTokenStore::new())
            .refresh("rt")
            .await
            .unwrap();
        assert_eq!(response.refresh_token, "refresh");
    }

    #[tokio::test]
    async fn test_logout_revokes_token_chain() {
        let token_id = Uuid::now_v7();
        let mut store = MockTokenStore::new();
        store
            .expect_revoke_access_token()
            .with(predicate::eq(token_id))
            .times(1)
            .returning(|_| Ok(true));
        store
            .expect_revoke_refresh_tokens_by_access_token_id()
            .with(predicate::eq(token_id))
            .times(1)
            .returning(|_| Ok(2));

        let identity = AuthenticatedUser {
            user: alice(),
            token_id,
        };
        let user = service(MockUserRepository::new(), MockTokenExchange::new(), store)
            .logout(&identity)
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_logout_unknown_token_is_unauthorized() {
        let mut store = MockTokenStore::new();
        store.expect_revoke_access_token().returning(|_| Ok(false));
        store
            .expect_revoke_refresh_tokens_by_access_token_id()
            .never();

        let identity = AuthenticatedUser {
            user: alice(),
            token_id: Uuid::now_v7(),
        };
        let err = service(MockUserRepository::new(), MockTokenExchange::new(), store)
            .logout(&identity)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Unauthorized(_)));
    }
}
