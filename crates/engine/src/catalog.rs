//! Reward catalog: the coupon and e-voucher types a user can redeem.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Catalog entry used for coupons granted by sign-in streaks and the
/// mini-game. Seeded by the schema migration.
pub const BONUS_COUPON_ID: &str = "bonus-coupon";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    Coupon,
    EVoucher,
}

impl RewardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coupon => "coupon",
            Self::EVoucher => "e_voucher",
        }
    }

    pub(crate) fn code_prefix(self) -> &'static str {
        match self {
            Self::Coupon => "CPN",
            Self::EVoucher => "EVC",
        }
    }
}

impl TryFrom<&str> for RewardKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "coupon" => Ok(Self::Coupon),
            "e_voucher" => Ok(Self::EVoucher),
            other => Err(EngineError::InvalidInput(format!(
                "invalid reward kind: {other}"
            ))),
        }
    }
}

/// A redeemable reward definition.
///
/// `stock` is `None` for uncapped entries. The validity window is half-open:
/// `valid_from <= now < valid_until`, with a missing bound left open.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub kind: RewardKind,
    pub name: String,
    pub cost: i64,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub stock: Option<i64>,
}

impl CatalogEntry {
    pub fn new(
        id: String,
        kind: RewardKind,
        name: String,
        cost: i64,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
        stock: Option<i64>,
    ) -> ResultEngine<Self> {
        if cost < 0 {
            return Err(EngineError::InvalidAmount(format!(
                "cost of '{id}' must be >= 0"
            )));
        }
        if let Some(stock) = stock
            && stock < 0
        {
            return Err(EngineError::InvalidAmount(format!(
                "stock of '{id}' must be >= 0"
            )));
        }
        if let (Some(from), Some(until)) = (valid_from, valid_until)
            && from >= until
        {
            return Err(EngineError::InvalidInput(format!(
                "validity window of '{id}' is empty"
            )));
        }
        Ok(Self {
            id,
            kind,
            name,
            cost,
            valid_from,
            valid_until,
            stock,
        })
    }

    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.is_none_or(|from| from <= now)
            && self.valid_until.is_none_or(|until| now < until)
    }

    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|left| left > 0)
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_within_window(now) && self.in_stock()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "catalog_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub name: String,
    pub cost: i64,
    pub valid_from: Option<DateTimeUtc>,
    pub valid_until: Option<DateTimeUtc>,
    pub stock: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::rewards::Entity")]
    IssuedRewards,
}

impl Related<super::rewards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IssuedRewards.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CatalogEntry> for ActiveModel {
    fn from(value: &CatalogEntry) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            name: ActiveValue::Set(value.name.clone()),
            cost: ActiveValue::Set(value.cost),
            valid_from: ActiveValue::Set(value.valid_from),
            valid_until: ActiveValue::Set(value.valid_until),
            stock: ActiveValue::Set(value.stock),
        }
    }
}

impl TryFrom<Model> for CatalogEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            kind: RewardKind::try_from(model.kind.as_str())?,
            name: model.name,
            cost: model.cost,
            valid_from: model.valid_from,
            valid_until: model.valid_until,
            stock: model.stock,
        })
    }
}
