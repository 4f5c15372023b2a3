use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, Statement,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Account, EngineError, LedgerCategory, LedgerEntry, Reconciliation, ResultEngine, accounts,
    ledger,
    util::{normalize_optional_text, normalize_owner_id},
};

use super::{Engine, LockScope};

impl Engine {
    /// Adjust the balance of `owner_id` by `delta` and append the matching
    /// ledger entry, inside the caller's transaction.
    ///
    /// The non-negative check and the write are a single conditional
    /// `UPDATE`, so no other writer can slip in between them.
    pub(super) async fn post_delta(
        &self,
        db_tx: &DatabaseTransaction,
        owner_id: &str,
        delta: i64,
        category: LedgerCategory,
        reason: &str,
        reference_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<LedgerEntry> {
        if delta == 0 {
            return Err(EngineError::InvalidAmount(
                "ledger delta must not be 0".to_string(),
            ));
        }
        let Some(needed) = delta.checked_neg() else {
            return Err(EngineError::InvalidAmount(format!(
                "ledger delta {delta} is out of range"
            )));
        };

        let update = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta),
            )
            .filter(accounts::Column::OwnerId.eq(owner_id));
        let update = if delta < 0 {
            update.filter(accounts::Column::Balance.gte(needed))
        } else {
            update.filter(accounts::Column::Balance.lte(i64::MAX - delta))
        };
        let updated = update.exec(db_tx).await?;

        if updated.rows_affected == 0 {
            let account = self.require_account(db_tx, owner_id).await?;
            if delta > 0 {
                return Err(EngineError::InvalidAmount(format!(
                    "crediting {delta} points would overflow balance {}",
                    account.balance
                )));
            }
            return Err(EngineError::InsufficientBalance(format!(
                "{} needs {needed} points, balance is {}",
                category.as_str(),
                account.balance
            )));
        }

        let balance_after = self.require_account(db_tx, owner_id).await?.balance;
        let seq = self.last_seq(db_tx, owner_id).await? + 1;

        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            seq,
            delta,
            category,
            reference_code: reference_code.map(ToString::to_string),
            reason: reason.to_string(),
            balance_after,
            created_at: now,
        };
        ledger::ActiveModel::from(&entry).insert(db_tx).await?;
        Ok(entry)
    }

    /// Credit `amount` when it is positive; zero amounts leave no entry.
    pub(super) async fn post_credit(
        &self,
        db_tx: &DatabaseTransaction,
        owner_id: &str,
        amount: i64,
        category: LedgerCategory,
        reason: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<LedgerEntry>> {
        if amount <= 0 {
            return Ok(None);
        }
        self.post_delta(db_tx, owner_id, amount, category, reason, None, now)
            .await
            .map(Some)
    }

    async fn last_seq<C: ConnectionTrait>(&self, db: &C, owner_id: &str) -> ResultEngine<i64> {
        let last = ledger::Entity::find()
            .filter(ledger::Column::OwnerId.eq(owner_id))
            .order_by_desc(ledger::Column::Seq)
            .one(db)
            .await?;
        Ok(last.map_or(0, |entry| entry.seq))
    }

    /// Current balance of an owner.
    pub async fn balance(&self, owner_id: &str) -> ResultEngine<i64> {
        Ok(self.account(owner_id).await?.balance)
    }

    pub async fn account(&self, owner_id: &str) -> ResultEngine<Account> {
        let owner_id = normalize_owner_id(owner_id)?;
        let model = self.require_account(&self.database, &owner_id).await?;
        Ok(Account::from(model))
    }

    /// Apply a manual balance change (category and reason chosen by the
    /// caller) as its own unit of work.
    ///
    /// A debit that would make the balance negative fails with
    /// [`EngineError::InsufficientBalance`] and changes nothing; a credit
    /// that would overflow the balance fails with
    /// [`EngineError::InvalidAmount`].
    pub async fn apply_delta(
        &self,
        owner_id: &str,
        delta: i64,
        category: LedgerCategory,
        reason: &str,
        reference_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> ResultEngine<LedgerEntry> {
        let owner_id = normalize_owner_id(owner_id)?;
        let reason = reason.trim().to_string();
        let reference_code = normalize_optional_text(reference_code);

        let entry = self
            .run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
                Box::pin(async move {
                    engine
                        .post_delta(
                            db_tx,
                            &owner_id,
                            delta,
                            category,
                            &reason,
                            reference_code.as_deref(),
                            now,
                        )
                        .await
                })
            })
            .await?;

        tracing::info!(
            owner_id = %entry.owner_id,
            delta = entry.delta,
            category = entry.category.as_str(),
            balance = entry.balance_after,
            "ledger delta applied"
        );
        Ok(entry)
    }

    /// Ledger entries of an owner, newest first.
    ///
    /// With `before` set only entries created strictly earlier are returned,
    /// which lets callers page backwards through the history.
    pub async fn ledger_history(
        &self,
        owner_id: &str,
        limit: u64,
        before: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<LedgerEntry>> {
        let owner_id = normalize_owner_id(owner_id)?;
        self.require_account(&self.database, &owner_id).await?;

        let mut query = ledger::Entity::find()
            .filter(ledger::Column::OwnerId.eq(owner_id.as_str()))
            .order_by_desc(ledger::Column::Seq)
            .limit(limit);
        if let Some(before) = before {
            query = query.filter(ledger::Column::CreatedAt.lt(before));
        }

        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    /// Compare the stored balance with the sum of the owner's ledger.
    ///
    /// Runs under the owner lock so the two reads see the same state.
    pub async fn reconcile(&self, owner_id: &str) -> ResultEngine<Reconciliation> {
        let owner_id = normalize_owner_id(owner_id)?;
        let report = self
            .run_atomic(LockScope::Owner(owner_id.clone()), |engine, db_tx| {
                Box::pin(async move {
                    let account = engine.require_account(db_tx, &owner_id).await?;
                    let backend = db_tx.get_database_backend();
                    let stmt = Statement::from_sql_and_values(
                        backend,
                        "SELECT COALESCE(SUM(delta), 0) AS sum, COUNT(*) AS entries \
                         FROM ledger_entries \
                         WHERE owner_id = ?",
                        [Value::from(owner_id.as_str())],
                    );
                    let row = db_tx.query_one(stmt).await?;
                    let (ledger_sum, entries): (i64, i64) = match row {
                        Some(row) => (row.try_get("", "sum")?, row.try_get("", "entries")?),
                        None => (0, 0),
                    };
                    Ok(Reconciliation {
                        owner_id: account.owner_id,
                        balance: account.balance,
                        ledger_sum,
                        entries: entries.max(0) as u64,
                    })
                })
            })
            .await?;

        if !report.is_balanced() {
            tracing::error!(
                owner_id = %report.owner_id,
                balance = report.balance,
                ledger_sum = report.ledger_sum,
                "ledger does not reconcile with balance"
            );
        }
        Ok(report)
    }
}
