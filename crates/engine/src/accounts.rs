//! The module contains the `Account` struct, the point balance of an owner.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;

/// The point balance of a single owner.
///
/// The balance is never negative: every debit goes through a conditional
/// update that refuses to cross zero.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Account {
    pub owner_id: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(owner_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            owner_id,
            balance: 0,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner_id: String,
    pub balance: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ledger::Entity")]
    LedgerEntries,
}

impl Related<super::ledger::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            balance: ActiveValue::Set(value.balance),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            owner_id: model.owner_id,
            balance: model.balance,
            created_at: model.created_at,
        }
    }
}
