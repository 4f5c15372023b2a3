use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryOrder, prelude::*};

use crate::{
    CatalogEntry, EngineError, ResultEngine, RewardKind, catalog,
    util::normalize_required_name,
};

use super::{Engine, LockScope};

impl Engine {
    /// Add an entry to the reward catalog.
    ///
    /// `stock` of `None` leaves the entry uncapped. Fails with
    /// [`EngineError::ExistingKey`] when `id` is taken.
    pub async fn new_catalog_entry(
        &self,
        id: &str,
        kind: RewardKind,
        name: &str,
        cost: i64,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
        stock: Option<i64>,
    ) -> ResultEngine<CatalogEntry> {
        let id = normalize_required_name(id, "catalog entry")?;
        let name = normalize_required_name(name, "reward")?;
        let entry = CatalogEntry::new(id, kind, name, cost, valid_from, valid_until, stock)?;

        let entry = self
            .run_atomic(LockScope::Catalog(entry.id.clone()), |_engine, db_tx| {
                Box::pin(async move {
                    if catalog::Entity::find_by_id(entry.id.clone())
                        .one(db_tx)
                        .await?
                        .is_some()
                    {
                        return Err(EngineError::ExistingKey(entry.id));
                    }
                    catalog::ActiveModel::from(&entry).insert(db_tx).await?;
                    Ok(entry)
                })
            })
            .await?;

        tracing::info!(catalog_entry = %entry.id, cost = entry.cost, "catalog entry added");
        Ok(entry)
    }

    pub async fn catalog_entry(&self, id: &str) -> ResultEngine<CatalogEntry> {
        self.require_catalog_entry(&self.database, id.trim())
            .await
    }

    /// Entries that can be redeemed at `now`, cheapest first.
    pub async fn catalog(&self, now: DateTime<Utc>) -> ResultEngine<Vec<CatalogEntry>> {
        let entries = catalog::Entity::find()
            .order_by_asc(catalog::Column::Cost)
            .order_by_asc(catalog::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(CatalogEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.is_redeemable(now))
            .collect())
    }

    /// Add `quantity` units to a capped entry. Uncapped entries stay
    /// uncapped.
    pub async fn restock(&self, id: &str, quantity: i64) -> ResultEngine<CatalogEntry> {
        if quantity <= 0 {
            return Err(EngineError::InvalidAmount(format!(
                "restock quantity must be > 0, got {quantity}"
            )));
        }
        let id = id.trim().to_string();

        let entry = self
            .run_atomic(LockScope::Catalog(id.clone()), |engine, db_tx| {
                Box::pin(async move {
                    let mut entry = engine.require_catalog_entry(db_tx, &id).await?;
                    let Some(stock) = entry.stock else {
                        return Ok(entry);
                    };
                    let stock = stock.saturating_add(quantity);

                    catalog::ActiveModel {
                        id: ActiveValue::Unchanged(entry.id.clone()),
                        stock: ActiveValue::Set(Some(stock)),
                        ..Default::default()
                    }
                    .update(db_tx)
                    .await?;

                    entry.stock = Some(stock);
                    Ok(entry)
                })
            })
            .await?;

        tracing::info!(catalog_entry = %entry.id, stock = ?entry.stock, "catalog entry restocked");
        Ok(entry)
    }
}
