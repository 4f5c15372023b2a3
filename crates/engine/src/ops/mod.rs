use std::{fmt, future::Future, pin::Pin, sync::Mutex};

use chrono_tz::Tz;
use rand::{SeedableRng, rngs::StdRng};
use sea_orm::{DatabaseConnection, DatabaseTransaction, EntityTrait, TransactionTrait};

use crate::{
    EngineError, ResultEngine,
    catalog::{self, BONUS_COUPON_ID},
    locks::{KeyedGuard, KeyedLocks},
    minigame::{GameRandom, RngSource},
};

mod access;
mod catalog_admin;
mod ledger;
mod pets;
mod play;
mod redeem;
mod sign_in;

pub use pets::Registration;
pub use play::GameResult;
pub use redeem::RedemptionResult;
pub use sign_in::{SignInResult, SignInStatus};

pub const DEFAULT_DAILY_PLAY_LIMIT: u64 = 3;

/// Future returned by the body of a unit of work.
pub(crate) type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

/// Which keys a unit of work must hold exclusively.
///
/// Locks are always taken owner first, then catalog entry.
#[derive(Clone, Debug)]
pub(crate) enum LockScope {
    Owner(String),
    Catalog(String),
    OwnerAndCatalog {
        owner: String,
        catalog_entry: String,
    },
}

/// The economy and progression engine.
///
/// Every mutating operation runs as one unit of work: it takes the per-owner
/// lock (plus the per-catalog-entry lock for stock changes), opens a store
/// transaction, and commits all of its writes together or none of them.
pub struct Engine {
    database: DatabaseConnection,
    timezone: Tz,
    daily_play_limit: u64,
    owner_locks: KeyedLocks,
    catalog_locks: KeyedLocks,
    rng: Mutex<Box<dyn GameRandom>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("timezone", &self.timezone)
            .field("daily_play_limit", &self.daily_play_limit)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Timezone used to turn timestamps into calendar days.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn daily_play_limit(&self) -> u64 {
        self.daily_play_limit
    }

    /// Run `body` as one atomic unit of work.
    ///
    /// The keys in `scope` are held from before the first read until after
    /// the commit. An error from `body` rolls back every write it made;
    /// dropping the returned future does the same, since an uncommitted
    /// transaction is rolled back when it goes out of scope.
    pub(crate) async fn run_atomic<T, F>(&self, scope: LockScope, body: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c Engine, &'c DatabaseTransaction) -> TxFuture<'c, T> + Send,
    {
        let _guards = self.acquire(&scope).await;
        let db_tx = self.database.begin().await?;

        match body(self, &db_tx).await {
            Ok(value) => {
                db_tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = db_tx.rollback().await {
                    tracing::warn!("rollback failed after {err}: {rollback_err}");
                } else {
                    tracing::debug!(?scope, "unit of work rolled back: {err}");
                }
                Err(err)
            }
        }
    }

    async fn acquire(&self, scope: &LockScope) -> (Option<KeyedGuard>, Option<KeyedGuard>) {
        let guards = match scope {
            LockScope::Owner(owner) => (Some(self.owner_locks.lock(owner).await), None),
            LockScope::Catalog(entry) => (None, Some(self.catalog_locks.lock(entry).await)),
            LockScope::OwnerAndCatalog {
                owner,
                catalog_entry,
            } => {
                let owner_guard = self.owner_locks.lock(owner).await;
                let catalog_guard = self.catalog_locks.lock(catalog_entry).await;
                (Some(owner_guard), Some(catalog_guard))
            }
        };
        tracing::debug!(?scope, "locks acquired");
        guards
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    timezone: Tz,
    daily_play_limit: u64,
    rng: Option<Box<dyn GameRandom>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            timezone: Tz::UTC,
            daily_play_limit: DEFAULT_DAILY_PLAY_LIMIT,
            rng: None,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Timezone whose midnight starts a new day for sign-ins and plays.
    pub fn timezone(mut self, timezone: Tz) -> EngineBuilder {
        self.timezone = timezone;
        self
    }

    pub fn daily_play_limit(mut self, limit: u64) -> EngineBuilder {
        self.daily_play_limit = limit;
        self
    }

    /// Randomness for the mini-game. Defaults to an OS-seeded `StdRng`.
    pub fn rng(mut self, rng: impl GameRandom + 'static) -> EngineBuilder {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Construct `Engine`
    ///
    /// Fails if the schema is missing the seeded bonus coupon entry, which
    /// usually means the migrations have not been applied.
    pub async fn build(self) -> ResultEngine<Engine> {
        if catalog::Entity::find_by_id(BONUS_COUPON_ID.to_string())
            .one(&self.database)
            .await?
            .is_none()
        {
            return Err(EngineError::CatalogEntryNotFound(format!(
                "system entry '{BONUS_COUPON_ID}' missing, run the migrations first"
            )));
        }

        let rng = self
            .rng
            .unwrap_or_else(|| Box::new(RngSource(StdRng::from_os_rng())));

        Ok(Engine {
            database: self.database,
            timezone: self.timezone,
            daily_play_limit: self.daily_play_limit,
            owner_locks: KeyedLocks::default(),
            catalog_locks: KeyedLocks::default(),
            rng: Mutex::new(rng),
        })
    }
}
