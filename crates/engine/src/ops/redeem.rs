use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};
use serde::Serialize;

use crate::{
    CatalogEntry, EngineError, IssuedReward, LedgerCategory, LedgerEntry, ResultEngine,
    RewardKind, RewardOrigin,
    catalog::{self, BONUS_COUPON_ID},
    rewards,
    util::normalize_owner_id,
};

use super::{Engine, LockScope};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RedemptionResult {
    pub reward: IssuedReward,
    /// `None` for free entries, which leave no ledger entry.
    pub debit: Option<LedgerEntry>,
    pub balance: i64,
    /// Stock left after this redemption, `None` when uncapped.
    pub stock_left: Option<i64>,
}

impl Engine {
    /// Spend points on a catalog entry and issue the reward.
    ///
    /// Holds the owner lock and then the catalog entry lock, so two owners
    /// racing for the last unit of a capped entry cannot both get it.
    pub async fn redeem(
        &self,
        owner_id: &str,
        catalog_entry_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<RedemptionResult> {
        let owner_id = normalize_owner_id(owner_id)?;
        let catalog_entry_id = catalog_entry_id.trim().to_string();
        let scope = LockScope::OwnerAndCatalog {
            owner: owner_id.clone(),
            catalog_entry: catalog_entry_id.clone(),
        };

        let result = self
            .run_atomic(scope, |engine, db_tx| {
                Box::pin(async move {
                    let account = engine.require_account(db_tx, &owner_id).await?;
                    let entry = engine
                        .require_catalog_entry(db_tx, &catalog_entry_id)
                        .await?;

                    if !entry.is_within_window(now) {
                        return Err(EngineError::OutsideValidityWindow(format!(
                            "'{}' is not redeemable at {now}",
                            entry.id
                        )));
                    }
                    if !entry.in_stock() {
                        return Err(EngineError::OutOfStock(format!(
                            "'{}' is sold out",
                            entry.id
                        )));
                    }

                    let reward = IssuedReward::new(
                        owner_id.clone(),
                        entry.id.clone(),
                        entry.kind,
                        RewardOrigin::Redeem,
                        now,
                    );

                    let debit = if entry.cost > 0 {
                        Some(
                            engine
                                .post_delta(
                                    db_tx,
                                    &owner_id,
                                    -entry.cost,
                                    LedgerCategory::Redeem,
                                    &format!("redeemed {}", entry.name),
                                    Some(&reward.code),
                                    now,
                                )
                                .await?,
                        )
                    } else {
                        None
                    };

                    let stock_left = engine.take_one_from_stock(db_tx, &entry).await?;
                    rewards::ActiveModel::from(&reward).insert(db_tx).await?;

                    let balance = debit
                        .as_ref()
                        .map_or(account.balance, |entry| entry.balance_after);
                    Ok(RedemptionResult {
                        reward,
                        debit,
                        balance,
                        stock_left,
                    })
                })
            })
            .await?;

        tracing::info!(
            owner_id = %result.reward.owner_id,
            catalog_entry = %result.reward.catalog_entry_id,
            code = %result.reward.code,
            balance = result.balance,
            "reward redeemed"
        );
        Ok(result)
    }

    /// Decrement capped stock with `stock = stock - 1 WHERE stock > 0`.
    async fn take_one_from_stock(
        &self,
        db_tx: &DatabaseTransaction,
        entry: &CatalogEntry,
    ) -> ResultEngine<Option<i64>> {
        let Some(stock) = entry.stock else {
            return Ok(None);
        };

        let updated = catalog::Entity::update_many()
            .col_expr(
                catalog::Column::Stock,
                Expr::col(catalog::Column::Stock).sub(1),
            )
            .filter(catalog::Column::Id.eq(entry.id.as_str()))
            .filter(catalog::Column::Stock.gt(0))
            .exec(db_tx)
            .await?;
        if updated.rows_affected == 0 {
            return Err(EngineError::OutOfStock(format!(
                "'{}' is sold out",
                entry.id
            )));
        }
        Ok(Some(stock - 1))
    }

    /// Issue `count` bonus coupons to `owner_id`.
    ///
    /// Granted coupons come from the system entry and ignore its stock and
    /// validity window.
    pub(super) async fn grant_bonus_coupons(
        &self,
        db_tx: &DatabaseTransaction,
        owner_id: &str,
        count: u32,
        origin: RewardOrigin,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<IssuedReward>> {
        let mut granted = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let reward = IssuedReward::new(
                owner_id.to_string(),
                BONUS_COUPON_ID.to_string(),
                RewardKind::Coupon,
                origin,
                now,
            );
            rewards::ActiveModel::from(&reward).insert(db_tx).await?;
            granted.push(reward);
        }
        Ok(granted)
    }

    /// Mark an issued reward as used. Using a reward twice fails.
    pub async fn use_reward(
        &self,
        owner_id: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<IssuedReward> {
        let owner_id = normalize_owner_id(owner_id)?;
        let code = code.trim().to_uppercase();

        let reward = self
            .run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
                Box::pin(async move {
                    engine.require_account(db_tx, &owner_id).await?;
                    let model = rewards::Entity::find()
                        .filter(rewards::Column::OwnerId.eq(owner_id.as_str()))
                        .filter(rewards::Column::Code.eq(code.as_str()))
                        .one(db_tx)
                        .await?
                        .ok_or_else(|| {
                            EngineError::RewardNotFound(format!(
                                "'{owner_id}' has no reward with code {code}"
                            ))
                        })?;
                    let mut reward = IssuedReward::try_from(model)?;

                    let updated = rewards::Entity::update_many()
                        .col_expr(rewards::Column::Used, Expr::value(true))
                        .col_expr(rewards::Column::UsedAt, Expr::value(now))
                        .filter(rewards::Column::Id.eq(reward.id.to_string()))
                        .filter(rewards::Column::Used.eq(false))
                        .exec(db_tx)
                        .await?;
                    if updated.rows_affected == 0 {
                        return Err(EngineError::RewardAlreadyUsed(format!(
                            "{code} was already used"
                        )));
                    }

                    reward.used = true;
                    reward.used_at = Some(now);
                    Ok(reward)
                })
            })
            .await?;

        tracing::info!(owner_id = %reward.owner_id, code = %reward.code, "reward used");
        Ok(reward)
    }

    /// Rewards issued to an owner, newest first.
    pub async fn rewards(
        &self,
        owner_id: &str,
        include_used: bool,
    ) -> ResultEngine<Vec<IssuedReward>> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;

        let mut query = rewards::Entity::find()
            .filter(rewards::Column::OwnerId.eq(owner_id.as_str()))
            .order_by_desc(rewards::Column::IssuedAt);
        if !include_used {
            query = query.filter(rewards::Column::Used.eq(false));
        }

        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(IssuedReward::try_from)
            .collect()
    }
}
