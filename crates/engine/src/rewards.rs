//! Issued rewards: concrete, uniquely coded coupons and e-vouchers.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, catalog::RewardKind, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardOrigin {
    Redeem,
    SignIn,
    Game,
}

impl RewardOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Redeem => "redeem",
            Self::SignIn => "sign_in",
            Self::Game => "game",
        }
    }
}

impl TryFrom<&str> for RewardOrigin {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "redeem" => Ok(Self::Redeem),
            "sign_in" => Ok(Self::SignIn),
            "game" => Ok(Self::Game),
            other => Err(EngineError::InvalidInput(format!(
                "invalid reward origin: {other}"
            ))),
        }
    }
}

/// A coupon or e-voucher owned by a user.
///
/// Once `used` is set it never goes back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IssuedReward {
    pub id: Uuid,
    pub owner_id: String,
    pub catalog_entry_id: String,
    pub kind: RewardKind,
    pub code: String,
    pub origin: RewardOrigin,
    pub issued_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl IssuedReward {
    pub fn new(
        owner_id: String,
        catalog_entry_id: String,
        kind: RewardKind,
        origin: RewardOrigin,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            catalog_entry_id,
            kind,
            code: new_code(kind),
            origin,
            issued_at,
            used: false,
            used_at: None,
        }
    }
}

/// A fresh reward code such as `CPN-3F9A0C1B7D2E4F60`.
///
/// Uniqueness is backed by a unique index on `(kind, code)`.
fn new_code(kind: RewardKind) -> String {
    let raw = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}", kind.code_prefix(), &raw[..16])
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "issued_rewards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub catalog_entry_id: String,
    pub kind: String,
    pub code: String,
    pub origin: String,
    pub issued_at: DateTimeUtc,
    pub used: bool,
    pub used_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalog::Entity",
        from = "Column::CatalogEntryId",
        to = "super::catalog::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    CatalogEntries,
}

impl Related<super::catalog::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&IssuedReward> for ActiveModel {
    fn from(value: &IssuedReward) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            catalog_entry_id: ActiveValue::Set(value.catalog_entry_id.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            code: ActiveValue::Set(value.code.clone()),
            origin: ActiveValue::Set(value.origin.as_str().to_string()),
            issued_at: ActiveValue::Set(value.issued_at),
            used: ActiveValue::Set(value.used),
            used_at: ActiveValue::Set(value.used_at),
        }
    }
}

impl TryFrom<Model> for IssuedReward {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "reward")?,
            owner_id: model.owner_id,
            catalog_entry_id: model.catalog_entry_id,
            kind: RewardKind::try_from(model.kind.as_str())?,
            code: model.code,
            origin: RewardOrigin::try_from(model.origin.as_str())?,
            issued_at: model.issued_at,
            used: model.used,
            used_at: model.used_at,
        })
    }
}
