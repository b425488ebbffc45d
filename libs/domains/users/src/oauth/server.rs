use async_trait::async_trait;
use axum_helpers::{AppError, Authenticator, JwtCodec};
use chrono::{DateTime, Duration, Utc};
use core_config::{ConfigError, FromEnv, env_parse_or};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::credentials::{GrantType, OAuthClientConfig};
use super::error::OAuthError;
use super::store::{AccessTokenRecord, RefreshTokenRecord, TokenStore};
use crate::error::{UserError, UserResult};
use crate::models::{AuthenticatedUser, TokenResponse};
use crate::password::verify_password;
use crate::repository::UserRepository;

const ACCESS_KIND: &str = "access";
const REFRESH_KIND: &str = "refresh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::days(15),
            refresh: Duration::days(30),
        }
    }
}

impl FromEnv for TokenLifetimes {
    /// - PGC_ACCESS_TOKEN_EXPIRY_DAYS: defaults to 15
    /// - PGC_REFRESH_TOKEN_EXPIRY_DAYS: defaults to 30
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access: Duration::days(env_parse_or("PGC_ACCESS_TOKEN_EXPIRY_DAYS", 15i64)?),
            refresh: Duration::days(env_parse_or("PGC_REFRESH_TOKEN_EXPIRY_DAYS", 30i64)?),
        })
    }
}

/// Form body of `POST /oauth/token`. Every field is optional so that a
/// missing one can be reported by name.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: String,
    jti: String,
    aud: String,
    kind: String,
    scopes: Vec<String>,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RefreshClaims {
    sub: String,
    jti: String,
    aud: String,
    kind: String,
    access_token_id: String,
    exp: i64,
}

fn required<'a>(value: &'a Option<String>, parameter: &'static str) -> Result<&'a str, OAuthError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(OAuthError::InvalidRequest { parameter })
}

fn normalize_scopes(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unauthenticated() -> UserError {
    UserError::Unauthorized("Unauthenticated.".to_string())
}

/// Issues and validates the bearer tokens handed out by `POST /oauth/token`.
pub struct TokenServer<R: UserRepository> {
    users: Arc<R>,
    store: Arc<dyn TokenStore>,
    codec: JwtCodec,
    client: OAuthClientConfig,
    lifetimes: TokenLifetimes,
}

impl<R: UserRepository> Clone for TokenServer<R> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            store: Arc::clone(&self.store),
            codec: self.codec.clone(),
            client: self.client.clone(),
            lifetimes: self.lifetimes,
        }
    }
}

impl<R: UserRepository> TokenServer<R> {
    pub fn new(
        users: Arc<R>,
        store: Arc<dyn TokenStore>,
        codec: JwtCodec,
        client: OAuthClientConfig,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            users,
            store,
            codec,
            client,
            lifetimes,
        }
    }

    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    /// Handle one token request
    #[instrument(skip_all, fields(grant_type = request.grant_type.as_deref()))]
    pub async fn issue(&self, request: TokenRequest) -> Result<TokenResponse, OAuthError> {
        let grant = match request.grant_type.as_deref() {
            Some("password") => GrantType::Password,
            Some("refresh_token") => GrantType::RefreshToken,
            _ => return Err(OAuthError::UnsupportedGrantType),
        };

        self.authenticate_client(&request)?;

        match grant {
            GrantType::Password => self.password_grant(&request).await,
            GrantType::RefreshToken => self.refresh_grant(&request).await,
        }
    }

    fn authenticate_client(&self, request: &TokenRequest) -> Result<(), OAuthError> {
        let client_id = required(&request.client_id, "client_id")?;
        let secret = request.client_secret.as_deref().unwrap_or_default();

        if client_id != self.client.client_id || secret != self.client.client_secret {
            tracing::info!(client_id, "Client authentication failed");
            return Err(OAuthError::InvalidClient);
        }
        Ok(())
    }

    async fn password_grant(&self, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
        let username = required(&request.username, "username")?;
        let password = required(&request.password, "password")?;

        let user = self
            .users
            .find_by_username_or_email(username)
            .await?
            .ok_or_else(OAuthError::invalid_credentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(OAuthError::invalid_credentials());
        }

        let scopes = normalize_scopes(request.scope.as_deref().unwrap_or_default());
        let (_, tokens) = self.issue_pair(user.id, scopes).await?;
        Ok(tokens)
    }

    async fn refresh_grant(&self, request: &TokenRequest) -> Result<TokenResponse, OAuthError> {
        let token = required(&request.refresh_token, "refresh_token")?;

        let claims: RefreshClaims = self
            .codec
            .decode(token, &self.client.client_id)
            .map_err(|_| OAuthError::invalid_refresh_token("Cannot decrypt the refresh token"))?;
        if claims.kind != REFRESH_KIND {
            return Err(OAuthError::invalid_refresh_token("Cannot decrypt the refresh token"));
        }
        let refresh_id = Uuid::parse_str(&claims.jti)
            .map_err(|_| OAuthError::invalid_refresh_token("Cannot decrypt the refresh token"))?;

        let now = Utc::now();
        let record = self
            .store
            .find_refresh_token(refresh_id)
            .await?
            .filter(|r| r.is_usable(now))
            .ok_or_else(|| OAuthError::invalid_refresh_token("Token has been revoked"))?;

        let access = self
            .store
            .find_access_token(record.access_token_id)
            .await?
            .ok_or_else(|| OAuthError::invalid_refresh_token("Token is not linked to client"))?;
        if access.client_id != self.client.client_id {
            return Err(OAuthError::invalid_refresh_token("Token is not linked to client"));
        }

        let user = self
            .users
            .find_by_id(access.user_id)
            .await?
            .ok_or_else(|| OAuthError::invalid_refresh_token("Token has been revoked"))?;

        let scopes = match request.scope.as_deref().map(normalize_scopes) {
            Some(requested) if !requested.is_empty() => requested,
            _ => access.scopes,
        };
        // The old pair stays valid until the new one is stored.
        let (issued, tokens) = self.issue_pair(user.id, scopes).await?;

        if !self.store.revoke_refresh_token(record.id).await? {
            tracing::info!(refresh_id = %record.id, "Refresh token already used, discarding new pair");
            self.store.revoke_access_token(issued.id).await?;
            self.store
                .revoke_refresh_tokens_by_access_token_id(issued.id)
                .await?;
            return Err(OAuthError::invalid_refresh_token("Token has been revoked"));
        }
        self.store.revoke_access_token(access.id).await?;
        Ok(tokens)
    }

    async fn issue_pair(
        &self,
        user_id: Uuid,
        scopes: String,
    ) -> UserResult<(AccessTokenRecord, TokenResponse)> {
        let now = Utc::now();
        let access = AccessTokenRecord {
            id: Uuid::now_v7(),
            user_id,
            client_id: self.client.client_id.clone(),
            scopes,
            revoked: false,
            created_at: now,
            expires_at: now + self.lifetimes.access,
        };
        let refresh = RefreshTokenRecord {
            id: Uuid::now_v7(),
            access_token_id: access.id,
            revoked: false,
            expires_at: now + self.lifetimes.refresh,
        };

        let access_token = self.sign_access(&access, now)?;
        let refresh_token = self.sign_refresh(&refresh, user_id)?;

        self.store.store_access_token(access.clone()).await?;
        self.store.store_refresh_token(refresh).await?;

        tracing::info!(%user_id, token_id = %access.id, "Issued token pair");
        let response = TokenResponse::bearer(
            self.lifetimes.access.num_seconds(),
            access_token,
            refresh_token,
        );
        Ok((access, response))
    }

    fn sign_access(&self, record: &AccessTokenRecord, now: DateTime<Utc>) -> UserResult<String> {
        let claims = AccessClaims {
            sub: record.user_id.to_string(),
            jti: record.id.to_string(),
            aud: record.client_id.clone(),
            kind: ACCESS_KIND.to_string(),
            scopes: record.scopes.split_whitespace().map(String::from).collect(),
            iat: now.timestamp(),
            exp: record.expires_at.timestamp(),
        };
        self.codec
            .encode(&claims)
            .map_err(|e| UserError::Internal(format!("Failed to sign access token: {e}")))
    }

    fn sign_refresh(&self, record: &RefreshTokenRecord, user_id: Uuid) -> UserResult<String> {
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            jti: record.id.to_string(),
            aud: self.client.client_id.clone(),
            kind: REFRESH_KIND.to_string(),
            access_token_id: record.access_token_id.to_string(),
            exp: record.expires_at.timestamp(),
        };
        self.codec
            .encode(&claims)
            .map_err(|e| UserError::Internal(format!("Failed to sign refresh token: {e}")))
    }

    /// Resolve a bearer access token to its active user
    pub async fn authenticate(&self, bearer: &str) -> UserResult<AuthenticatedUser> {
        let claims: AccessClaims = self
            .codec
            .decode(bearer, &self.client.client_id)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                unauthenticated()
            })?;
        if claims.kind != ACCESS_KIND {
            return Err(unauthenticated());
        }
        let token_id = Uuid::parse_str(&claims.jti).map_err(|_| unauthenticated())?;

        let record = self
            .store
            .find_access_token(token_id)
            .await?
            .filter(|r| r.is_usable(Utc::now()))
            .ok_or_else(unauthenticated)?;

        let user = self
            .users
            .find_by_id(record.user_id)
            .await?
            .ok_or_else(unauthenticated)?;

        Ok(AuthenticatedUser { user, token_id })
    }
}

#[async_trait]
impl<R: UserRepository + 'static> Authenticator for TokenServer<R> {
    type Identity = AuthenticatedUser;

    async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        TokenServer::authenticate(self, token)
            .await
            .map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateUser, User};
    use crate::oauth::store::InMemoryTokenStore;
    use crate::password::hash_password;
    use crate::repository::InMemoryUserRepository;
    use axum_helpers::JwtConfig;
    use std::sync::atomic::{AtomicBool, Ordering};

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    /// In-memory store that yields inside lookups and can be told to fail writes
    #[derive(Default)]
    struct ContendedStore {
        inner: InMemoryTokenStore,
        fail_writes: AtomicBool,
    }

    impl ContendedStore {
        fn check_write(&self) -> UserResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(UserError::Internal("token storage unavailable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TokenStore for ContendedStore {
        async fn store_access_token(&self, record: AccessTokenRecord) -> UserResult<()> {
            self.check_write()?;
            self.inner.store_access_token(record).await
        }

        async fn find_access_token(&self, id: Uuid) -> UserResult<Option<AccessTokenRecord>> {
            self.inner.find_access_token(id).await
        }

        async fn revoke_access_token(&self, id: Uuid) -> UserResult<bool> {
            self.inner.revoke_access_token(id).await
        }

        async fn store_refresh_token(&self, record: RefreshTokenRecord) -> UserResult<()> {
            self.check_write()?;
            self.inner.store_refresh_token(record).await
        }

        async fn find_refresh_token(&self, id: Uuid) -> UserResult<Option<RefreshTokenRecord>> {
            let found = self.inner.find_refresh_token(id).await;
            tokio::task::yield_now().await;
            found
        }

        async fn revoke_refresh_token(&self, id: Uuid) -> UserResult<bool> {
            self.inner.revoke_refresh_token(id).await
        }

        async fn revoke_refresh_tokens_by_access_token_id(
            &self,
            access_token_id: Uuid,
        ) -> UserResult<u64> {
            self.inner
                .revoke_refresh_tokens_by_access_token_id(access_token_id)
                .await
        }
    }

    async fn setup() -> (TokenServer<InMemoryUserRepository>, Arc<InMemoryUserRepository>, User) {
        setup_with(Arc::new(InMemoryTokenStore::new())).await
    }

    async fn setup_with(
        store: Arc<dyn TokenStore>,
    ) -> (TokenServer<InMemoryUserRepository>, Arc<InMemoryUserRepository>, User) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let user = repo
            .insert(User::new(
                CreateUser {
                    username: "alice".into(),
                    email: "alice@example.com".into(),
                    first_name: "Alice".into(),
                    middle_name: None,
                    last_name: "Liddell".into(),
                    password: String::new(),
                },
                hash_password("wonderland").unwrap(),
            ))
            .await
            .unwrap();

        let server = TokenServer::new(
            Arc::clone(&repo),
            store,
            JwtCodec::new(&JwtConfig::new(SECRET).unwrap()),
            OAuthClientConfig::new("client-1", "client-secret"),
            TokenLifetimes::default(),
        );
        (server, repo, user)
    }

    fn password_request(username: &str, password: &str) -> TokenRequest {
        TokenRequest {
            grant_type: Some("password".into()),
            client_id: Some("client-1".into()),
            client_secret: Some("client-secret".into()),
            username: Some(username.into()),
            password: Some(password.into()),
            ..Default::default()
        }
    }

    fn refresh_request(token: &str) -> TokenRequest {
        TokenRequest {
            grant_type: Some("refresh_token".into()),
            client_id: Some("client-1".into()),
            client_secret: Some("client-secret".into()),
            refresh_token: Some(token.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_password_grant_issues_usable_tokens() {
        let (server, _, user) = setup().await;

        let tokens = server
            .issue(password_request("alice", "wonderland"))
            .await
            .unwrap();
        assert_eq!(tokens.token_type, "Bearer");
        assert_eq!(tokens.expires_in, 15 * 24 * 3600);

        let identity = server.authenticate(&tokens.access_token).await.unwrap();
        assert_eq!(identity.user.id, user.id);
    }

    #[tokio::test]
    async fn test_password_grant_accepts_email() {
        let (server, _, _) = setup().await;
        assert!(
            server
                .issue(password_request("alice@example.com", "wonderland"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_grant() {
        let (server, _, _) = setup().await;
        let err = server
            .issue(password_request("alice", "nope"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "invalid_grant");
        assert_eq!(err.body().message, super::super::error::INVALID_GRANT_MESSAGE);
    }

    #[tokio::test]
    async fn test_client_and_parameter_checks() {
        let (server, _, _) = setup().await;

        let mut bad_client = password_request("alice", "wonderland");
        bad_client.client_secret = Some("wrong".into());
        assert!(matches!(
            server.issue(bad_client).await.unwrap_err(),
            OAuthError::InvalidClient
        ));

        let mut missing = password_request("alice", "wonderland");
        missing.password = None;
        assert!(matches!(
            server.issue(missing).await.unwrap_err(),
            OAuthError::InvalidRequest {
                parameter: "password"
            }
        ));

        let mut unknown = password_request("alice", "wonderland");
        unknown.grant_type = Some("authorization_code".into());
        assert!(matches!(
            server.issue(unknown).await.unwrap_err(),
            OAuthError::UnsupportedGrantType
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens() {
        let (server, _, _) = setup().await;
        let first = server
            .issue(password_request("alice", "wonderland"))
            .await
            .unwrap();

        let second = server
            .issue(refresh_request(&first.refresh_token))
            .await
            .unwrap();
        assert_ne!(first.access_token, second.access_token);

        assert!(server.authenticate(&first.access_token).await.is_err());
        assert!(server.authenticate(&second.access_token).await.is_ok());

        let reused = server
            .issue(refresh_request(&first.refresh_token))
            .await
            .unwrap_err();
        assert_eq!(reused.body().message, "The refresh token is invalid.");
    }

    #[tokio::test]
    async fn test_concurrent_refresh_with_same_token_succeeds_once() {
        let (server, _, _) = setup_with(Arc::new(ContendedStore::default())).await;
        let tokens = server
            .issue(password_request("alice", "wonderland"))
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            server.issue(refresh_request(&tokens.refresh_token)),
            server.issue(refresh_request(&tokens.refresh_token)),
        );

        let (winner, loser) = match (first, second) {
            (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
            (first, second) => panic!(
                "expected exactly one refresh to succeed: {:?} / {:?}",
                first.is_ok(),
                second.is_ok()
            ),
        };
        assert_eq!(loser.error_type(), "invalid_grant");
        assert!(server.authenticate(&winner.access_token).await.is_ok());
        assert!(server.authenticate(&tokens.access_token).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_rotation_keeps_previous_pair() {
        let store = Arc::new(ContendedStore::default());
        let (server, _, _) = setup_with(store.clone()).await;
        let tokens = server
            .issue(password_request("alice", "wonderland"))
            .await
            .unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        assert!(
            server
                .issue(refresh_request(&tokens.refresh_token))
                .await
                .is_err()
        );
        assert!(server.authenticate(&tokens.access_token).await.is_ok());

        store.fail_writes.store(false, Ordering::SeqCst);
        let rotated = server
            .issue(refresh_request(&tokens.refresh_token))
            .await
            .unwrap();
        assert!(server.authenticate(&rotated.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_access_token_cannot_be_used_as_refresh_token() {
        let (server, _, _) = setup().await;
        let tokens = server
            .issue(password_request("alice", "wonderland"))
            .await
            .unwrap();

        let err = server
            .issue(refresh_request(&tokens.access_token))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "invalid_grant");
        assert!(server.authenticate(&tokens.refresh_token).await.is_err());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_deleted_user() {
        let (server, repo, mut user) = setup().await;
        let tokens = server
            .issue(password_request("alice", "wonderland"))
            .await
            .unwrap();

        user.deleted_at = Some(Utc::now());
        repo.update(user).await.unwrap();

        let err = server.authenticate(&tokens.access_token).await.unwrap_err();
        assert_eq!(err.to_string(), "Unauthenticated.");
    }

    #[tokio::test]
    async fn test_authenticate_rejects_garbage() {
        let (server, _, _) = setup().await;
        assert!(matches!(
            server.authenticate("not-a-jwt").await.unwrap_err(),
            UserError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_lifetimes_from_env() {
        temp_env::with_vars(
            [
                ("PGC_ACCESS_TOKEN_EXPIRY_DAYS", Some("1")),
                ("PGC_REFRESH_TOKEN_EXPIRY_DAYS", None),
            ],
            || {
                let lifetimes = TokenLifetimes::from_env().unwrap();
                assert_eq!(lifetimes.access, Duration::days(1));
                assert_eq!(lifetimes.refresh, Duration::days(30));
            },
        );
    }

    #[test]
    fn test_normalize_scopes() {
        assert_eq!(normalize_scopes("  read   write "), "read write");
        assert_eq!(normalize_scopes(""), "");
    }
}
