use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{UserError, UserResult};
use crate::models::{PageRequest, SortField, User, UserFilter};

/// Columns that must be unique among active users
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Email => "email",
        }
    }
}

/// Repository trait for User persistence
///
/// "Active" means `deleted_at` is null. Lookups are exact and case-sensitive.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> UserResult<User>;

    /// Persist every column of an existing record, trashed or not
    async fn update(&self, user: User) -> UserResult<User>;

    /// Active user by id
    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>>;

    async fn find_active_by_username(&self, username: &str) -> UserResult<Option<User>>;

    /// First active user, by creation order, whose username or email equals `identifier`
    async fn find_by_username_or_email(&self, identifier: &str) -> UserResult<Option<User>>;

    /// Most recently deleted user with this username
    async fn find_trashed_by_username(&self, username: &str) -> UserResult<Option<User>>;

    /// Whether an active user other than `exclude` holds `value`
    async fn exists_active(
        &self,
        field: UniqueField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool>;

    /// Active users matching the filter plus the total match count.
    /// `page = None` returns every match.
    async fn search(
        &self,
        filter: &UserFilter,
        page: Option<PageRequest>,
    ) -> UserResult<(Vec<User>, u64)>;
}

/// In-memory implementation of UserRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn holds(user: &User, field: UniqueField, value: &str) -> bool {
        match field {
            UniqueField::Username => user.username == value,
            UniqueField::Email => user.email == value,
        }
    }
}

fn sort_users(users: &mut [User], field: SortField, descending: bool) {
    users.sort_by(|a, b| {
        let ordering = match field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Username => a.username.cmp(&b.username),
            SortField::Email => a.email.cmp(&b.email),
            SortField::FirstName => a.first_name.cmp(&b.first_name),
            SortField::LastName => a.last_name.cmp(&b.last_name),
        }
        .then_with(|| a.id.cmp(&b.id));
        if descending { ordering.reverse() } else { ordering }
    });
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        let active = users.values().filter(|u| !u.is_trashed());
        for existing in active {
            if existing.username == user.username {
                return Err(UserError::taken("username"));
            }
            if existing.email == user.email {
                return Err(UserError::taken("email"));
            }
        }

        users.insert(user.id, user.clone());
        tracing::info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let mut users = self.users.write().await;

        if !users.contains_key(&user.id) {
            return Err(UserError::NotFound(user.username));
        }

        if !user.is_trashed() {
            let clash = users
                .values()
                .filter(|u| u.id != user.id && !u.is_trashed())
                .find_map(|u| {
                    if u.username == user.username {
                        Some("username")
                    } else if u.email == user.email {
                        Some("email")
                    } else {
                        None
                    }
                });
            if let Some(field) = clash {
                return Err(UserError::taken(field));
            }
        }

        users.insert(user.id, user.clone());
        tracing::info!(user_id = %user.id, "Updated user");
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| !u.is_trashed()).cloned())
    }

    async fn find_active_by_username(&self, username: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| !u.is_trashed() && u.username == username)
            .cloned())
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| !u.is_trashed() && (u.username == identifier || u.email == identifier))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn find_trashed_by_username(&self, username: &str) -> UserResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| u.username == username)
            .filter(|u| u.deleted_at.is_some())
            .max_by_key(|u| u.deleted_at)
            .cloned())
    }

    async fn exists_active(
        &self,
        field: UniqueField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool> {
        let users = self.users.read().await;
        Ok(users.values().any(|u| {
            !u.is_trashed() && Some(u.id) != exclude && Self::holds(u, field, value)
        }))
    }

    async fn search(
        &self,
        filter: &UserFilter,
        page: Option<PageRequest>,
    ) -> UserResult<(Vec<User>, u64)> {
        let users = self.users.read().await;

        let mut result: Vec<User> = users
            .values()
            .filter(|u| !u.is_trashed() && filter.matches(u))
            .cloned()
            .collect();
        let total = result.len() as u64;

        sort_users(&mut result, filter.sort_by, filter.descending);

        let result = match page {
            Some(page) => result
                .into_iter()
                .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
                .take(usize::try_from(page.per_page).unwrap_or(usize::MAX))
                .collect(),
            None => result,
        };

        Ok((result, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateUser;
    use chrono::{Duration, Utc};

    fn user(username: &str, email: &str) -> User {
        User::new(
            CreateUser {
                username: username.into(),
                email: email.into(),
                first_name: "Test".into(),
                middle_name: None,
                last_name: "User".into(),
                password: "unused".into(),
            },
            "hash".into(),
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_active_duplicates() {
        let repo = InMemoryUserRepository::new();
        repo.insert(user("alice", "alice@example.com")).await.unwrap();

        let err = repo
            .insert(user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation { field: "username", .. }));

        let err = repo
            .insert(user("other", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation { field: "email", .. }));
    }

    #[tokio::test]
    async fn test_trashed_users_free_their_username() {
        let repo = InMemoryUserRepository::new();
        let mut alice = repo.insert(user("alice", "alice@example.com")).await.unwrap();
        alice.deleted_at = Some(Utc::now());
        repo.update(alice).await.unwrap();

        assert!(repo.find_active_by_username("alice").await.unwrap().is_none());
        assert!(repo.insert(user("alice", "alice@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_find_by_username_or_email_is_exact() {
        let repo = InMemoryUserRepository::new();
        let alice = repo.insert(user("alice", "alice@example.com")).await.unwrap();

        let by_name = repo.find_by_username_or_email("alice").await.unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(alice.id));

        let by_email = repo.find_by_username_or_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(alice.id));

        assert!(repo.find_by_username_or_email("ALICE").await.unwrap().is_none());
        assert!(repo.find_by_username_or_email("ali").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_username_or_email_prefers_oldest() {
        let repo = InMemoryUserRepository::new();
        let mut older = user("bob", "carol@example.com");
        older.created_at = Utc::now() - Duration::hours(1);
        let older = repo.insert(older).await.unwrap();
        repo.insert(user("carol@example.com", "bob@example.com"))
            .await
            .unwrap();

        let found = repo
            .find_by_username_or_email("carol@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, older.id);
    }

    #[tokio::test]
    async fn test_find_trashed_returns_latest_deletion() {
        let repo = InMemoryUserRepository::new();
        let now = Utc::now();

        let mut first = user("dave", "dave1@example.com");
        first.deleted_at = Some(now - Duration::days(2));
        repo.users.write().await.insert(first.id, first.clone());

        let mut second = user("dave", "dave2@example.com");
        second.deleted_at = Some(now - Duration::days(1));
        repo.users.write().await.insert(second.id, second.clone());

        let found = repo.find_trashed_by_username("dave").await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
    }

    #[tokio::test]
    async fn test_exists_active_honours_exclusion() {
        let repo = InMemoryUserRepository::new();
        let alice = repo.insert(user("alice", "alice@example.com")).await.unwrap();

        assert!(
            repo.exists_active(UniqueField::Email, "alice@example.com", None)
                .await
                .unwrap()
        );
        assert!(
            !repo
                .exists_active(UniqueField::Email, "alice@example.com", Some(alice.id))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_search_paginates_and_sorts() {
        let repo = InMemoryUserRepository::new();
        for name in ["carol", "alice", "bob"] {
            repo.insert(user(name, &format!("{name}@example.com")))
                .await
                .unwrap();
        }

        let filter = UserFilter {
            sort_by: SortField::Username,
            ..Default::default()
        };
        let (page, total) = repo
            .search(&filter, Some(PageRequest { page: 2, per_page: 2 }))
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].username, "carol");

        let (all, total) = repo.search(&filter, None).await.unwrap();
        assert_eq!(total, 3);
        let names: Vec<_> = all.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["alice", "bob", "carol"]);
    }
}
