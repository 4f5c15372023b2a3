//! Played mini-game rounds. Counted per owner and day for the play cap.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    minigame::{Difficulty, GameOutcome},
    util::parse_uuid,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameSession {
    pub id: Uuid,
    pub owner_id: String,
    pub pet_id: Uuid,
    pub day: NaiveDate,
    pub played_at: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub outcome: GameOutcome,
    pub monsters_defeated: i64,
    pub points: i64,
    pub experience: i64,
    pub coupons: u32,
    pub level_up_bonus: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "game_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_id: String,
    pub pet_id: String,
    pub day: Date,
    pub played_at: DateTimeUtc,
    pub difficulty: i64,
    pub outcome: String,
    pub monsters_defeated: i64,
    pub points: i64,
    pub experience: i64,
    pub coupons: i32,
    pub level_up_bonus: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pets::Entity",
        from = "Column::PetId",
        to = "super::pets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Pets,
}

impl Related<super::pets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&GameSession> for ActiveModel {
    fn from(value: &GameSession) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            owner_id: ActiveValue::Set(value.owner_id.clone()),
            pet_id: ActiveValue::Set(value.pet_id.to_string()),
            day: ActiveValue::Set(value.day),
            played_at: ActiveValue::Set(value.played_at),
            difficulty: ActiveValue::Set(value.difficulty.level()),
            outcome: ActiveValue::Set(value.outcome.as_str().to_string()),
            monsters_defeated: ActiveValue::Set(value.monsters_defeated),
            points: ActiveValue::Set(value.points),
            experience: ActiveValue::Set(value.experience),
            coupons: ActiveValue::Set(value.coupons as i32),
            level_up_bonus: ActiveValue::Set(value.level_up_bonus),
        }
    }
}

impl TryFrom<Model> for GameSession {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: parse_uuid(&model.id, "game session")?,
            owner_id: model.owner_id,
            pet_id: parse_uuid(&model.pet_id, "pet")?,
            day: model.day,
            played_at: model.played_at,
            difficulty: Difficulty::try_from(model.difficulty)?,
            outcome: GameOutcome::try_from(model.outcome.as_str())?,
            monsters_defeated: model.monsters_defeated,
            points: model.points,
            experience: model.experience,
            coupons: model.coupons.max(0) as u32,
            level_up_bonus: model.level_up_bonus,
        })
    }
}
