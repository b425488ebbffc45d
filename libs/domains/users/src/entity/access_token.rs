use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

use crate::oauth::store::AccessTokenRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_access_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: String,
    /// Space separated
    pub scopes: String,
    pub revoked: bool,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::refresh_token::Entity")]
    RefreshTokens,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::refresh_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RefreshTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AccessTokenRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            client_id: model.client_id,
            scopes: model.scopes,
            revoked: model.revoked,
            created_at: model.created_at.into(),
            expires_at: model.expires_at.into(),
        }
    }
}

impl From<AccessTokenRecord> for ActiveModel {
    fn from(record: AccessTokenRecord) -> Self {
        ActiveModel {
            id: Set(record.id),
            user_id: Set(record.user_id),
            client_id: Set(record.client_id),
            scopes: Set(record.scopes),
            revoked: Set(record.revoked),
            created_at: Set(record.created_at.into()),
            expires_at: Set(record.expires_at.into()),
        }
    }
}
