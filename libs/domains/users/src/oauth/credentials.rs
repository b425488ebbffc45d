use core_config::{ConfigError, FromEnv, env_required};
use std::fmt;

/// The password-grant client this service authenticates as
#[derive(Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl OAuthClientConfig {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

impl FromEnv for OAuthClientConfig {
    /// - PGC_ID: required
    /// - PGC_SECRET: required
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: env_required("PGC_ID")?,
            client_secret: env_required("PGC_SECRET")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complete token request. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Caller-supplied fields such as `username`/`password` or `refresh_token`
    pub fields: Vec<(String, String)>,
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: GrantType,
    pub scope: String,
}

impl Credentials {
    /// Form fields in submission order
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = self.fields.clone();
        form.push(("client_id".into(), self.client_id.clone()));
        form.push(("client_secret".into(), self.client_secret.clone()));
        form.push(("grant_type".into(), self.grant_type.as_str().into()));
        form.push(("scope".into(), self.scope.clone()));
        form
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.fields.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("Credentials")
            .field("fields", &keys)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Assembles token requests for the configured client
#[derive(Debug, Clone)]
pub struct CredentialBuilder {
    client: OAuthClientConfig,
}

impl CredentialBuilder {
    pub fn new(client: OAuthClientConfig) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &OAuthClientConfig {
        &self.client
    }

    pub fn build<K, V>(
        &self,
        fields: impl IntoIterator<Item = (K, V)>,
        scope: Option<&str>,
        grant_type: GrantType,
    ) -> Credentials
    where
        K: Into<String>,
        V: Into<String>,
    {
        Credentials {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            client_id: self.client.client_id.clone(),
            client_secret: self.client.client_secret.clone(),
            grant_type,
            scope: scope.unwrap_or_default().to_string(),
        }
    }

    pub fn password(&self, username: &str, password: &str, scope: Option<&str>) -> Credentials {
        self.build(
            [("username", username), ("password", password)],
            scope,
            GrantType::Password,
        )
    }

    pub fn refresh_token(&self, refresh_token: &str, scope: Option<&str>) -> Credentials {
        self.build(
            [("refresh_token", refresh_token)],
            scope,
            GrantType::RefreshToken,
        )
    }
}
