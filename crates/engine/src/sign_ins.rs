//! Daily sign-in records. At most one per owner and calendar day.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignInRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub day: NaiveDate,
    pub signed_at: DateTime<Utc>,
    pub points: i64,
    pub experience: i64,
    pub coupons: u32,
    pub streak: u32,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sign_ins")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub day: Date,
    pub signed_at: DateTimeUtc,
    pub points: i64,
    pub experience: i64,
    pub coupons: i32,
    pub streak: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::OwnerId",
        to = "super::accounts::Column::OwnerId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SignInRecord> for ActiveModel {
    fn from(value: &SignInRecord) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            day: ActiveValue::Set(value.day),
            signed_at: ActiveValue::Set(value.signed_at),
            points: ActiveValue::Set(value.points),
            experience: ActiveValue::Set(value.experience),
            coupons: ActiveValue::Set(value.coupons as i32),
            streak: ActiveValue::Set(value.streak as i32),
        }
    }
}

impl TryFrom<Model> for SignInRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "sign-in")?,
            owner_id: model.owner_id,
            day: model.day,
            signed_at: model.signed_at,
            points: model.points,
            experience: model.experience,
            coupons: model.coupons.max(0) as u32,
            streak: model.streak.max(0) as u32,
        })
    }
}
