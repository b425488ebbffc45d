use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;

use crate::oauth::store::RefreshTokenRecord;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_refresh_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub access_token_id: Uuid,
    pub revoked: bool,
    pub expires_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::access_token::Entity",
        from = "Column::AccessTokenId",
        to = "super::access_token::Column::Id",
        on_delete = "Cascade"
    )]
    AccessToken,
}

impl Related<super::access_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessToken.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for RefreshTokenRecord {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            access_token_id: model.access_token_id,
            revoked: model.revoked,
            expires_at: model.expires_at.into(),
        }
    }
}

impl From<RefreshTokenRecord> for ActiveModel {
    fn from(record: RefreshTokenRecord) -> Self {
        ActiveModel {
            id: Set(record.id),
            access_token_id: Set(record.access_token_id),
            revoked: Set(record.revoked),
            expires_at: Set(record.expires_at.into()),
        }
    }
}
