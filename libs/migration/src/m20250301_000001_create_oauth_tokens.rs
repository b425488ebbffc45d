use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000000_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OauthAccessTokens::Table)
                    .if_not_exists()
                    .col(pk_uuid(OauthAccessTokens::Id))
                    .col(uuid(OauthAccessTokens::UserId))
                    .col(string(OauthAccessTokens::ClientId))
                    .col(text(OauthAccessTokens::Scopes).default(""))
                    .col(boolean(OauthAccessTokens::Revoked).default(false))
                    .col(
                        timestamp_with_time_zone(OauthAccessTokens::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(timestamp_with_time_zone(OauthAccessTokens::ExpiresAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_access_tokens_user")
                            .from(OauthAccessTokens::Table, OauthAccessTokens::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_access_tokens_user_id")
                    .table(OauthAccessTokens::Table)
                    .col(OauthAccessTokens::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OauthRefreshTokens::Table)
                    .if_not_exists()
                    .col(pk_uuid(OauthRefreshTokens::Id))
                    .col(uuid(OauthRefreshTokens::AccessTokenId))
                    .col(boolean(OauthRefreshTokens::Revoked).default(false))
                    .col(timestamp_with_time_zone(OauthRefreshTokens::ExpiresAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_refresh_tokens_access_token")
                            .from(OauthRefreshTokens::Table, OauthRefreshTokens::AccessTokenId)
                            .to(OauthAccessTokens::Table, OauthAccessTokens::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_oauth_refresh_tokens_access_token_id")
                    .table(OauthRefreshTokens::Table)
                    .col(OauthRefreshTokens::AccessTokenId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(OauthRefreshTokens::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(OauthAccessTokens::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum OauthAccessTokens {
    Table,
    Id,
    UserId,
    ClientId,
    Scopes,
    Revoked,
    CreatedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum OauthRefreshTokens {
    Table,
    Id,
    AccessTokenId,
    Revoked,
    ExpiresAt,
}
