use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

static USERNAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").expect("username pattern is valid"));

/// Static route segments under `/user/` that a username would shadow
const RESERVED_USERNAMES: [&str; 3] = ["login", "logout", "refresh"];

/// Usernames are route keys: URL-safe characters only, and never a static route segment
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !USERNAME_CHARS.is_match(username) {
        return Err(ValidationError::new("invalid_username").with_message(Cow::Borrowed(
            "The username may only contain letters, numbers, dots, dashes and underscores.",
        )));
    }
    if RESERVED_USERNAMES.contains(&username.to_ascii_lowercase().as_str()) {
        return Err(ValidationError::new("reserved_username")
            .with_message(Cow::Borrowed("The username is reserved.")));
    }
    Ok(())
}

/// User record. `username` is the public key used in routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Argon2 PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set when soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a new record; the password must already be hashed.
    pub fn new(input: CreateUser, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            username: input.username,
            email: input.email,
            first_name: input.first_name,
            middle_name: input.middle_name,
            last_name: input.last_name,
            password_hash,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply changes in place; the new password must already be hashed.
    pub fn apply_update(&mut self, update: UpdateUser, new_password_hash: Option<String>) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(middle_name) = update.middle_name {
            self.middle_name = Some(middle_name).filter(|m| !m.is_empty());
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(hash) = new_password_hash {
            self.password_hash = hash;
        }
        self.updated_at = Utc::now();
    }
}

/// Public representation of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            middle_name: user.middle_name,
            last_name: user.last_name,
            email_verified_at: user.email_verified_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
            deleted_at: user.deleted_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(
        length(min = 3, max = 50, message = "The username must be between 3 and 50 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        email(message = "The email must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: String,
    #[validate(length(min = 1, max = 100, message = "The first name field is required."))]
    pub first_name: String,
    #[validate(length(max = 100, message = "The middle name may not be greater than 100 characters."))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "The last name field is required."))]
    pub last_name: String,
    #[validate(length(min = 8, max = 128, message = "The password must be at least 8 characters."))]
    pub password: String,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(
        length(min = 3, max = 50, message = "The username must be between 3 and 50 characters."),
        custom(function = "validate_username")
    )]
    pub username: Option<String>,
    #[validate(
        email(message = "The email must be a valid email address."),
        length(max = 255, message = "The email may not be greater than 255 characters.")
    )]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100, message = "The first name field is required."))]
    pub first_name: Option<String>,
    /// An empty string clears the middle name
    #[validate(length(max = 100, message = "The middle name may not be greater than 100 characters."))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "The last name field is required."))]
    pub last_name: Option<String>,
    #[validate(length(min = 8, max = 128, message = "The password must be at least 8 characters."))]
    pub password: Option<String>,
}

/// Columns a listing can be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Username,
    Email,
    FirstName,
    LastName,
}

/// Search, filter and pagination parameters for `GET /user`
#[derive(Debug, Clone, Deserialize, Validate, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    /// Case-insensitive substring over username, email and names
    pub q: Option<String>,
    /// Exact match
    pub username: Option<String>,
    /// Exact match
    pub email: Option<String>,
    /// Substring match
    pub first_name: Option<String>,
    /// Substring match
    pub middle_name: Option<String>,
    /// Substring match
    pub last_name: Option<String>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub descending: bool,
    /// Return every match instead of one page
    #[serde(default)]
    pub full_data: bool,
    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 1000, message = "The per page must be between 1 and 1000."))]
    pub per_page: u64,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 1_000_000, message = "The page must be between 1 and 1000000."))]
    pub page: u64,
}

fn default_per_page() -> u64 {
    15
}

fn default_page() -> u64 {
    1
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            q: None,
            username: None,
            email: None,
            first_name: None,
            middle_name: None,
            last_name: None,
            sort_by: SortField::default(),
            descending: false,
            full_data: false,
            per_page: default_per_page(),
            page: default_page(),
        }
    }
}

impl UserFilter {
    /// `None` when every match is requested
    pub fn page_request(&self) -> Option<PageRequest> {
        (!self.full_data).then_some(PageRequest {
            page: self.page.max(1),
            per_page: self.per_page.max(1),
        })
    }

    /// In-process evaluation, used by the in-memory repository.
    pub fn matches(&self, user: &User) -> bool {
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            let needle = q.to_lowercase();
            let hit = [
                Some(user.username.as_str()),
                Some(user.email.as_str()),
                Some(user.first_name.as_str()),
                user.middle_name.as_deref(),
                Some(user.last_name.as_str()),
            ]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        let exact = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().is_none_or(|w| w == actual)
        };
        let like = |wanted: &Option<String>, actual: Option<&str>| match wanted.as_deref() {
            None => true,
            Some(w) => actual.is_some_and(|a| a.contains(w)),
        };

        exact(&self.username, &user.username)
            && exact(&self.email, &user.email)
            && like(&self.first_name, Some(&user.first_name))
            && like(&self.middle_name, user.middle_name.as_deref())
            && like(&self.last_name, Some(&user.last_name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Rows to skip, capped at `i64::MAX` so it always fits a SQL OFFSET
    pub fn offset(&self) -> u64 {
        self.page
            .saturating_sub(1)
            .saturating_mul(self.per_page)
            .min(i64::MAX as u64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    pub current_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub last_page: u64,
    /// 1-based index of the first item on the page, null when empty
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl PageMeta {
    pub fn new(page: PageRequest, total: u64, items_on_page: u64) -> Self {
        let last_page = total.div_ceil(page.per_page).max(1);
        let (from, to) = if items_on_page == 0 {
            (None, None)
        } else {
            let from = page.offset().saturating_add(1);
            (Some(from), Some(from.saturating_add(items_on_page - 1)))
        };
        Self {
            current_page: page.page,
            per_page: page.per_page,
            total,
            last_page,
            from,
            to,
        }
    }
}

/// Result of a listing: a bare array for `full_data`, otherwise one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum UserListing {
    Paginated {
        data: Vec<UserResponse>,
        meta: PageMeta,
    },
    Full(Vec<UserResponse>),
}

impl UserListing {
    pub fn len(&self) -> usize {
        match self {
            Self::Paginated { data, .. } | Self::Full(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "The username field is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "The password field is required."))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "The refresh token field is required."))]
    pub refresh_token: String,
}

/// Token endpoint success payload, passed through to callers as-is.
/// Fields beyond the standard four are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: i64,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenResponse {
    pub fn bearer(expires_in: i64, access_token: String, refresh_token: String) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            expires_in,
            access_token,
            refresh_token,
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: TokenResponse,
}

/// Caller identity resolved from a bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    /// Id of the access token the request was made with
    pub token_id: Uuid,
}
