use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use super::store::{AccessTokenRecord, RefreshTokenRecord, TokenStore};
use crate::entity::{access_token, refresh_token};
use crate::error::UserResult;

/// Token store backed by the `oauth_access_tokens` and `oauth_refresh_tokens` tables
#[derive(Clone)]
pub struct PgTokenStore {
    db: DatabaseConnection,
}

impl PgTokenStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn store_access_token(&self, record: AccessTokenRecord) -> UserResult<()> {
        let model: access_token::ActiveModel = record.into();
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn find_access_token(&self, id: Uuid) -> UserResult<Option<AccessTokenRecord>> {
        let model = access_token::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn revoke_access_token(&self, id: Uuid) -> UserResult<bool> {
        let result = access_token::Entity::update_many()
            .col_expr(access_token::Column::Revoked, Expr::value(true))
            .filter(access_token::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn store_refresh_token(&self, record: RefreshTokenRecord) -> UserResult<()> {
        let model: refresh_token::ActiveModel = record.into();
        model.insert(&self.db).await?;
        Ok(())
    }

    async fn find_refresh_token(&self, id: Uuid) -> UserResult<Option<RefreshTokenRecord>> {
        let model = refresh_token::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> UserResult<bool> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .filter(refresh_token::Column::Id.eq(id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn revoke_refresh_tokens_by_access_token_id(
        &self,
        access_token_id: Uuid,
    ) -> UserResult<u64> {
        let result = refresh_token::Entity::update_many()
            .col_expr(refresh_token::Column::Revoked, Expr::value(true))
            .filter(refresh_token::Column::AccessTokenId.eq(access_token_id))
            .filter(refresh_token::Column::Revoked.eq(false))
            .exec(&self.db)
            .await?;

        tracing::debug!(%access_token_id, revoked = result.rows_affected, "Revoked refresh tokens");
        Ok(result.rows_affected)
    }
}
