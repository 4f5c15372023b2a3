//! The module contains the `Pet` struct and its vitals.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

pub const VITAL_MIN: i32 = 0;
pub const VITAL_MAX: i32 = 100;

pub(crate) const DEFAULT_SKIN: &str = "classic";
pub(crate) const DEFAULT_BACKGROUND: &str = "meadow";

/// The four vitals of a pet, each kept within `VITAL_MIN..=VITAL_MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Vitals {
    pub hunger: i32,
    pub mood: i32,
    pub stamina: i32,
    pub cleanliness: i32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            hunger: 60,
            mood: 60,
            stamina: 80,
            cleanliness: 60,
        }
    }
}

impl Vitals {
    /// Apply signed deltas, clamping every vital to the allowed range.
    pub fn apply(self, delta: VitalDelta) -> Self {
        Self {
            hunger: clamp_vital(self.hunger + delta.hunger),
            mood: clamp_vital(self.mood + delta.mood),
            stamina: clamp_vital(self.stamina + delta.stamina),
            cleanliness: clamp_vital(self.cleanliness + delta.cleanliness),
        }
    }
}

/// Signed change of each vital. Not clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VitalDelta {
    pub hunger: i32,
    pub mood: i32,
    pub stamina: i32,
    pub cleanliness: i32,
}

pub fn clamp_vital(value: i32) -> i32 {
    value.clamp(VITAL_MIN, VITAL_MAX)
}

/// A pet.
///
/// An owner can keep several pets; exactly one of them is active and
/// receives the experience granted by daily sign-ins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pet {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub level: i32,
    pub experience: i64,
    pub vitals: Vitals,
    pub skin: String,
    pub background: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Pet {
    pub fn new(owner_id: String, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            level: 1,
            experience: 0,
            vitals: Vitals::default(),
            skin: DEFAULT_SKIN.to_string(),
            background: DEFAULT_BACKGROUND.to_string(),
            active: false,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "pets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub level: i32,
    pub experience: i64,
    pub hunger: i32,
    pub mood: i32,
    pub stamina: i32,
    pub cleanliness: i32,
    pub skin: String,
    pub background: String,
    pub active: bool,
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

impl From<&Pet> for ActiveModel {
    fn from(value: &Pet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            level: ActiveValue::Set(value.level),
            experience: ActiveValue::Set(value.experience),
            hunger: ActiveValue::Set(value.vitals.hunger),
            mood: ActiveValue::Set(value.vitals.mood),
            stamina: ActiveValue::Set(value.vitals.stamina),
            cleanliness: ActiveValue::Set(value.vitals.cleanliness),
            skin: ActiveValue::Set(value.skin.clone()),
            background: ActiveValue::Set(value.background.clone()),
            active: ActiveValue::Set(value.active),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Pet {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "pet")?,
            owner_id: model.owner_id,
            name: model.name,
            level: model.level,
            experience: model.experience,
            vitals: Vitals {
                hunger: model.hunger,
                mood: model.mood,
                stamina: model.stamina,
                cleanliness: model.cleanliness,
            },
            skin: model.skin,
            background: model.background,
            active: model.active,
            created_at: model.created_at,
        })
    }
}
