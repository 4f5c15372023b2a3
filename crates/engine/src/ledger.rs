//! Ledger primitives.
//!
//! A `LedgerEntry` is the immutable audit record of one balance change. For
//! every owner the sum of the entry deltas equals the account balance.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCategory {
    SignIn,
    GamePlay,
    LevelUp,
    Redeem,
    Adjustment,
}

impl LedgerCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "SignIn",
            Self::GamePlay => "GamePlay",
            Self::LevelUp => "LevelUp",
            Self::Redeem => "Redeem",
            Self::Adjustment => "Adjustment",
        }
    }
}

impl TryFrom<&str> for LedgerCategory {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "SignIn" => Ok(Self::SignIn),
            "GamePlay" => Ok(Self::GamePlay),
            "LevelUp" => Ok(Self::LevelUp),
            "Redeem" => Ok(Self::Redeem),
            "Adjustment" => Ok(Self::Adjustment),
            other => Err(EngineError::InvalidInput(format!(
                "invalid ledger category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub owner_id: String,
    /// Position of the entry in the owner's ledger, starting at 1.
    pub seq: i64,
    pub delta: i64,
    pub category: LedgerCategory,
    pub reference_code: Option<String>,
    pub reason: String,
    pub balance_after: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledger_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub seq: i64,
    pub delta: i64,
    pub category: String,
    pub reference_code: Option<String>,
    pub reason: String,
    pub balance_after: i64,
    pub created_at: DateTimeUtc,
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

impl From<&LedgerEntry> for ActiveModel {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            owner_id: ActiveValue::Set(entry.owner_id.clone()),
            seq: ActiveValue::Set(entry.seq),
            delta: ActiveValue::Set(entry.delta),
            category: ActiveValue::Set(entry.category.as_str().to_string()),
            reference_code: ActiveValue::Set(entry.reference_code.clone()),
            reason: ActiveValue::Set(entry.reason.clone()),
            balance_after: ActiveValue::Set(entry.balance_after),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for LedgerEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "ledger entry")?,
            owner_id: model.owner_id,
            seq: model.seq,
            delta: model.delta,
            category: LedgerCategory::try_from(model.category.as_str())?,
            reference_code: model.reference_code,
            reason: model.reason,
            balance_after: model.balance_after,
            created_at: model.created_at,
        })
    }
}

/// Outcome of comparing a stored balance with its audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub owner_id: String,
    pub balance: i64,
    pub ledger_sum: i64,
    pub entries: u64,
}

impl Reconciliation {
    pub fn is_balanced(&self) -> bool {
        self.balance == self.ledger_sum
    }
}
