use std::sync::PoisonError;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, PaginatorTrait, QueryFilter, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, GameSession, IssuedReward, LedgerCategory, LedgerEntry, Pet, ResultEngine,
    RewardOrigin, game_sessions,
    minigame::{self, Difficulty, MIN_STAMINA_TO_PLAY, SimulatedGame},
    progression::Progression,
    util::{calendar_day, normalize_owner_id},
};

use super::{Engine, LockScope};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameResult {
    pub session: GameSession,
    pub game: SimulatedGame,
    /// The pet after vitals, experience and level were updated.
    pub pet: Pet,
    pub progression: Progression,
    pub points_entry: Option<LedgerEntry>,
    pub level_up_entry: Option<LedgerEntry>,
    pub coupons: Vec<IssuedReward>,
    pub balance: i64,
    pub plays_left: u64,
}

impl Engine {
    /// Play one round of the mini-game with `pet_id`.
    ///
    /// Counts toward the daily play cap of the owner, measured on the
    /// calendar day of `now` in the engine timezone.
    pub async fn play_mini_game(
        &self,
        owner_id: &str,
        pet_id: Uuid,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> ResultEngine<GameResult> {
        self.run_game(owner_id, pet_id, difficulty, false, now)
            .await
    }

    /// Record a round the player quit before it ended.
    ///
    /// Pays nothing but still costs vitals and uses up one of the day's
    /// plays.
    pub async fn abort_mini_game(
        &self,
        owner_id: &str,
        pet_id: Uuid,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> ResultEngine<GameResult> {
        self.run_game(owner_id, pet_id, difficulty, true, now)
            .await
    }

    /// Number of rounds `owner_id` played on `day`, aborted ones included.
    pub async fn games_played_on(&self, owner_id: &str, day: NaiveDate) -> ResultEngine<u64> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;
        self.count_games(&self.database, &owner_id, day).await
    }

    async fn run_game(
        &self,
        owner_id: &str,
        pet_id: Uuid,
        difficulty: Difficulty,
        abort: bool,
        now: DateTime<Utc>,
    ) -> ResultEngine<GameResult> {
        let owner_id = normalize_owner_id(owner_id)?;
        let day = calendar_day(now, self.timezone);
        let limit = self.daily_play_limit;

        let result = self
            .run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
                Box::pin(async move {
                    let account = engine.require_account(db_tx, &owner_id).await?;

                    let played = engine.count_games(db_tx, &owner_id, day).await?;
                    if played >= limit {
                        return Err(EngineError::DailyLimitReached(format!(
                            "'{owner_id}' already played {played} of {limit} games on {day}"
                        )));
                    }

                    let mut pet = engine.require_owned_pet(db_tx, &owner_id, pet_id).await?;
                    if pet.vitals.stamina < MIN_STAMINA_TO_PLAY {
                        return Err(EngineError::InsufficientStamina(format!(
                            "{} has {} stamina, {MIN_STAMINA_TO_PLAY} needed",
                            pet.name, pet.vitals.stamina
                        )));
                    }

                    let game = {
                        let mut rng = engine.rng.lock().unwrap_or_else(PoisonError::into_inner);
                        minigame::simulate(&pet.vitals, difficulty, abort, &mut **rng)
                    };
                    pet.vitals = pet.vitals.apply(game.vital_delta);

                    let points_entry = engine
                        .post_credit(
                            db_tx,
                            &owner_id,
                            game.points,
                            LedgerCategory::GamePlay,
                            &format!(
                                "mini-game {} on {:?}",
                                game.outcome.as_str(),
                                difficulty
                            ),
                            now,
                        )
                        .await?;

                    let applied = engine
                        .apply_experience(db_tx, pet, game.experience, now)
                        .await?;

                    let coupons = engine
                        .grant_bonus_coupons(db_tx, &owner_id, game.coupons, RewardOrigin::Game, now)
                        .await?;

                    let session = GameSession {
                        id: Uuid::new_v4(),
                        owner_id: owner_id.clone(),
                        pet_id,
                        day,
                        played_at: now,
                        difficulty,
                        outcome: game.outcome,
                        monsters_defeated: game.monsters_defeated,
                        points: game.points,
                        experience: game.experience,
                        coupons: game.coupons,
                        level_up_bonus: applied.progression.bonus_points,
                    };
                    game_sessions::ActiveModel::from(&session)
                        .insert(db_tx)
                        .await?;

                    let balance = applied
                        .bonus_entry
                        .as_ref()
                        .or(points_entry.as_ref())
                        .map_or(account.balance, |entry| entry.balance_after);

                    Ok(GameResult {
                        session,
                        game,
                        pet: applied.pet,
                        progression: applied.progression,
                        points_entry,
                        level_up_entry: applied.bonus_entry,
                        coupons,
                        balance,
                        plays_left: limit.saturating_sub(played + 1),
                    })
                })
            })
            .await?;

        tracing::info!(
            owner_id = %result.session.owner_id,
            pet_id = %result.session.pet_id,
            outcome = result.session.outcome.as_str(),
            points = result.session.points,
            plays_left = result.plays_left,
            "mini-game recorded"
        );
        Ok(result)
    }

    async fn count_games<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
        day: NaiveDate,
    ) -> ResultEngine<u64> {
        game_sessions::Entity::find()
            .filter(game_sessions::Column::OwnerId.eq(owner_id))
            .filter(game_sessions::Column::Day.eq(day))
            .count(db)
            .await
            .map_err(Into::into)
    }
}
