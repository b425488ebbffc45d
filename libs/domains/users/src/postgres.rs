use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Order};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, SqlErr,
};
use uuid::Uuid;

use crate::entity::user::{self, Column, Entity};
use crate::error::{UserError, UserResult};
use crate::models::{PageRequest, SortField, User, UserFilter};
use crate::repository::{UniqueField, UserRepository};

/// PostgreSQL implementation of UserRepository using SeaORM
#[derive(Clone)]
pub struct PgUserRepository {
    db: DatabaseConnection,
}

impl PgUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn active() -> Select<Entity> {
        Entity::find().filter(Column::DeletedAt.is_null())
    }
}

/// Partial unique indexes surface as SQL errors; map them back to the field.
fn map_write_error(err: DbErr) -> UserError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) if detail.contains("email") => {
            UserError::taken("email")
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => UserError::taken("username"),
        _ => UserError::Database(err),
    }
}

fn sort_column(field: SortField) -> Column {
    match field {
        SortField::CreatedAt => Column::CreatedAt,
        SortField::Username => Column::Username,
        SortField::Email => Column::Email,
        SortField::FirstName => Column::FirstName,
        SortField::LastName => Column::LastName,
    }
}

fn filter_condition(filter: &UserFilter) -> Condition {
    let mut condition = Condition::all().add(Column::DeletedAt.is_null());

    if let Some(q) = filter.q.as_deref().filter(|q| !q.is_empty()) {
        let pattern = format!("%{}%", escape_like(q));
        condition = condition.add(Expr::cust_with_values(
            "(username ILIKE $1 OR email ILIKE $2 OR first_name ILIKE $3 \
             OR COALESCE(middle_name, '') ILIKE $4 OR last_name ILIKE $5)",
            std::iter::repeat_n(pattern, 5),
        ));
    }
    if let Some(username) = &filter.username {
        condition = condition.add(Column::Username.eq(username.as_str()));
    }
    if let Some(email) = &filter.email {
        condition = condition.add(Column::Email.eq(email.as_str()));
    }
    if let Some(first_name) = &filter.first_name {
        condition = condition.add(Column::FirstName.contains(first_name.as_str()));
    }
    if let Some(middle_name) = &filter.middle_name {
        condition = condition.add(Column::MiddleName.contains(middle_name.as_str()));
    }
    if let Some(last_name) = &filter.last_name {
        condition = condition.add(Column::LastName.contains(last_name.as_str()));
    }

    condition
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: User) -> UserResult<User> {
        let active_model: user::ActiveModel = user.into();
        let model = active_model.insert(&self.db).await.map_err(map_write_error)?;

        tracing::info!(user_id = %model.id, username = %model.username, "Created user");
        Ok(model.into())
    }

    async fn update(&self, user: User) -> UserResult<User> {
        let username = user.username.clone();
        let active_model: user::ActiveModel = user.into();
        let model = active_model
            .update(&self.db)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated => UserError::NotFound(username),
                other => map_write_error(other),
            })?;

        tracing::info!(user_id = %model.id, "Updated user");
        Ok(model.into())
    }

    async fn find_by_id(&self, id: Uuid) -> UserResult<Option<User>> {
        let model = Self::active()
            .filter(Column::Id.eq(id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_active_by_username(&self, username: &str) -> UserResult<Option<User>> {
        let model = Self::active()
            .filter(Column::Username.eq(username))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_username_or_email(&self, identifier: &str) -> UserResult<Option<User>> {
        let model = Self::active()
            .filter(
                Condition::any()
                    .add(Column::Username.eq(identifier))
                    .add(Column::Email.eq(identifier)),
            )
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_trashed_by_username(&self, username: &str) -> UserResult<Option<User>> {
        let model = Entity::find()
            .filter(Column::DeletedAt.is_not_null())
            .filter(Column::Username.eq(username))
            .order_by_desc(Column::DeletedAt)
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn exists_active(
        &self,
        field: UniqueField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> UserResult<bool> {
        let column = match field {
            UniqueField::Username => Column::Username,
            UniqueField::Email => Column::Email,
        };
        let mut query = Self::active().filter(column.eq(value));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }
        Ok(query.count(&self.db).await? > 0)
    }

    async fn search(
        &self,
        filter: &UserFilter,
        page: Option<PageRequest>,
    ) -> UserResult<(Vec<User>, u64)> {
        let order = if filter.descending { Order::Desc } else { Order::Asc };
        let query = Entity::find().filter(filter_condition(filter));

        let total = query.clone().count(&self.db).await?;

        let mut query = query
            .order_by(sort_column(filter.sort_by), order.clone())
            .order_by(Column::Id, order);
        if let Some(page) = page {
            query = query.limit(page.per_page).offset(page.offset());
        }

        let models = query.all(&self.db).await?;
        Ok((models.into_iter().map(Into::into).collect(), total))
    }
}
