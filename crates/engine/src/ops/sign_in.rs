use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EngineError, IssuedReward, LedgerCategory, LedgerEntry, Pet, ResultEngine, RewardOrigin,
    SignInRecord,
    progression::Progression,
    sign_ins,
    streak::{self, SignInReward},
    util::normalize_owner_id,
};

use super::{Engine, LockScope};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignInResult {
    pub record: SignInRecord,
    pub points_entry: Option<LedgerEntry>,
    pub level_up_entry: Option<LedgerEntry>,
    /// The active pet after the sign-in experience was applied.
    pub pet: Pet,
    pub progression: Progression,
    pub coupons: Vec<IssuedReward>,
    pub balance: i64,
}

/// Read-only view of an owner's sign-in state for a day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SignInStatus {
    pub day: NaiveDate,
    pub signed_in: bool,
    /// What signing in on `day` would pay. `None` once signed in.
    pub reward: Option<SignInReward>,
}

impl Engine {
    /// Daily sign-in for `today`.
    ///
    /// Credits the streak reward, feeds its experience to the active pet and
    /// issues any milestone coupons. A second sign-in on the same day fails
    /// with [`EngineError::AlreadySignedIn`] and pays nothing.
    pub async fn sign_in(
        &self,
        owner_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> ResultEngine<SignInResult> {
        let owner_id = normalize_owner_id(owner_id)?;

        let result = self
            .run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
                Box::pin(async move {
                    let account = engine.require_account(db_tx, &owner_id).await?;
                    if engine.signed_in_on(db_tx, &owner_id, today).await? {
                        return Err(EngineError::AlreadySignedIn(format!(
                            "'{owner_id}' already signed in on {today}"
                        )));
                    }
                    let pet = engine.require_active_pet(db_tx, &owner_id).await?;

                    let history = engine.sign_in_days_before(db_tx, &owner_id, today).await?;
                    let reward = streak::next_reward(&history, today);

                    let points_entry = engine
                        .post_credit(
                            db_tx,
                            &owner_id,
                            reward.points,
                            LedgerCategory::SignIn,
                            &format!("daily sign-in, streak {}", reward.streak),
                            now,
                        )
                        .await?;

                    let applied = engine
                        .apply_experience(db_tx, pet, reward.experience, now)
                        .await?;

                    let coupons = engine
                        .grant_bonus_coupons(
                            db_tx,
                            &owner_id,
                            reward.coupons,
                            RewardOrigin::SignIn,
                            now,
                        )
                        .await?;

                    let record = SignInRecord {
                        id: Uuid::new_v4(),
                        owner_id: owner_id.clone(),
                        day: today,
                        signed_at: now,
                        points: reward.points,
                        experience: reward.experience,
                        coupons: reward.coupons,
                        streak: reward.streak,
                    };
                    sign_ins::ActiveModel::from(&record).insert(db_tx).await?;

                    let balance = applied
                        .bonus_entry
                        .as_ref()
                        .or(points_entry.as_ref())
                        .map_or(account.balance, |entry| entry.balance_after);

                    Ok(SignInResult {
                        record,
                        points_entry,
                        level_up_entry: applied.bonus_entry,
                        pet: applied.pet,
                        progression: applied.progression,
                        coupons,
                        balance,
                    })
                })
            })
            .await?;

        tracing::info!(
            owner_id = %result.record.owner_id,
            day = %result.record.day,
            streak = result.record.streak,
            points = result.record.points,
            "signed in"
        );
        Ok(result)
    }

    /// Whether `owner_id` signed in on `day`, and the reward it would pay
    /// otherwise. Changes nothing.
    pub async fn sign_in_status(
        &self,
        owner_id: &str,
        day: NaiveDate,
    ) -> ResultEngine<SignInStatus> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;

        if self.signed_in_on(&self.database, &owner_id, day).await? {
            return Ok(SignInStatus {
                day,
                signed_in: true,
                reward: None,
            });
        }
        let history = self
            .sign_in_days_before(&self.database, &owner_id, day)
            .await?;
        Ok(SignInStatus {
            day,
            signed_in: false,
            reward: Some(streak::next_reward(&history, day)),
        })
    }

    /// Sign-in records of an owner, newest first.
    pub async fn sign_in_history(
        &self,
        owner_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<SignInRecord>> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;

        sign_ins::Entity::find()
            .filter(sign_ins::Column::OwnerId.eq(owner_id.as_str()))
            .order_by_desc(sign_ins::Column::Day)
            .limit(limit)
            .all(&self.database)
            .await?
            .into_iter()
            .map(SignInRecord::try_from)
            .collect()
    }

    async fn signed_in_on<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
        day: NaiveDate,
    ) -> ResultEngine<bool> {
        let existing = sign_ins::Entity::find()
            .filter(sign_ins::Column::OwnerId.eq(owner_id))
            .filter(sign_ins::Column::Day.eq(day))
            .one(db)
            .await?;
        Ok(existing.is_some())
    }

    /// Distinct sign-in days strictly before `day`, most recent first.
    async fn sign_in_days_before<C: ConnectionTrait>(
        &self,
        db: &C,
        owner_id: &str,
        day: NaiveDate,
    ) -> ResultEngine<Vec<NaiveDate>> {
        let days = sign_ins::Entity::find()
            .filter(sign_ins::Column::OwnerId.eq(owner_id))
            .filter(sign_ins::Column::Day.lt(day))
            .order_by_desc(sign_ins::Column::Day)
            .all(db)
            .await?
            .into_iter()
            .map(|record| record.day)
            .collect();
        Ok(days)
    }
}
