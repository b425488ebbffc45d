use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, PageMeta, UpdateUser, User, UserFilter, UserListing, UserResponse};
use crate::password::hash_password;
use crate::repository::{UniqueField, UserRepository};

/// Service layer for User business logic
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> Clone for UserService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Active user whose username or email equals `identifier` exactly
    #[instrument(skip(self))]
    pub async fn find_by_username_or_email(&self, identifier: &str) -> UserResult<Option<User>> {
        self.repository.find_by_username_or_email(identifier).await
    }

    #[instrument(skip(self, filter), fields(full_data = filter.full_data))]
    pub async fn list_users(&self, filter: &UserFilter) -> UserResult<UserListing> {
        let page = filter.page_request();
        let (users, total) = self.repository.search(filter, page).await?;
        let data: Vec<UserResponse> = users.into_iter().map(Into::into).collect();

        Ok(match page {
            Some(page) => {
                let meta = PageMeta::new(page, total, data.len() as u64);
                UserListing::Paginated { data, meta }
            }
            None => UserListing::Full(data),
        })
    }

    #[instrument(skip(self, input), fields(username = %input.username))]
    pub async fn create_user(&self, input: CreateUser) -> UserResult<UserResponse> {
        self.ensure_available(UniqueField::Username, &input.username, None)
            .await?;
        self.ensure_available(UniqueField::Email, &input.email, None)
            .await?;

        let password_hash = hash_password(&input.password)?;
        let created = self.repository.insert(User::new(input, password_hash)).await?;

        let fresh = self
            .repository
            .find_by_id(created.id)
            .await?
            .ok_or_else(|| UserError::Internal("created user could not be reloaded".to_string()))?;
        Ok(fresh.into())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, username: &str) -> UserResult<UserResponse> {
        Ok(self.active(username).await?.into())
    }

    #[instrument(skip(self, input))]
    pub async fn update_user(&self, username: &str, input: UpdateUser) -> UserResult<UserResponse> {
        let mut user = self.active(username).await?;

        if let Some(new_username) = input.username.as_deref().filter(|u| *u != user.username) {
            self.ensure_available(UniqueField::Username, new_username, Some(user.id))
                .await?;
        }
        if let Some(new_email) = input.email.as_deref().filter(|e| *e != user.email) {
            self.ensure_available(UniqueField::Email, new_email, Some(user.id))
                .await?;
        }

        let new_password_hash = input.password.as_deref().map(hash_password).transpose()?;
        user.apply_update(input, new_password_hash);

        Ok(self.repository.update(user).await?.into())
    }

    /// Soft delete
    #[instrument(skip(self))]
    pub async fn delete_user(&self, username: &str) -> UserResult<UserResponse> {
        let mut user = self.active(username).await?;
        let now = Utc::now();
        user.deleted_at = Some(now);
        user.updated_at = now;

        Ok(self.repository.update(user).await?.into())
    }

    /// Bring back the most recently deleted record with this username.
    ///
    /// Fails when an active user has since taken its username or email.
    #[instrument(skip(self))]
    pub async fn restore_user(&self, username: &str) -> UserResult<UserResponse> {
        let mut user = self
            .repository
            .find_trashed_by_username(username)
            .await?
            .ok_or_else(|| UserError::NotFound(username.to_string()))?;

        self.ensure_available(UniqueField::Username, &user.username, Some(user.id))
            .await?;
        self.ensure_available(UniqueField::Email, &user.email, Some(user.id))
            .await?;

        user.deleted_at = None;
        user.updated_at = Utc::now();
        Ok(self.repository.update(user).await?.into())
    }

    async fn active(&self, username: &str) -> UserResult<User> {
        self.repository
            .find_active_by_username(username)
            .await?
            .ok_or_else(|| UserError::NotFound(username.to_string()))
    }

    async fn ensure_available(
        &self,
        field: UniqueField,
        value: &str,
        exclude: Option<uuid::Uuid>,
    ) -> UserResult<()> {
        if self.repository.exists_active(field, value, exclude).await? {
            return Err(UserError::taken(field.name()));
        }
        Ok(())
    }
}
