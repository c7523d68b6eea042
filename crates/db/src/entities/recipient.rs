//! Recipient entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A Telegram user enrolled through `/start`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recipient")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Telegram user id, the only upsert key
    #[sea_orm(unique)]
    pub telegram_user_id: i64,

    #[sea_orm(nullable)]
    pub username: Option<String>,

    #[sea_orm(nullable)]
    pub first_name: Option<String>,

    #[sea_orm(nullable)]
    pub last_name: Option<String>,

    /// `/start` parameter seen when the record was created. Never overwritten.
    #[sea_orm(nullable)]
    pub first_start_param: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
