use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    BONUS_COUPON_ID, Engine, EngineError, LedgerCategory, RewardKind, RewardOrigin, RngSource,
};
use migration::MigratorTrait;
use rand::{SeedableRng, rngs::StdRng};

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .rng(RngSource(StdRng::seed_from_u64(7)))
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 10, 0, 0).unwrap()
}

async fn funded_owner(engine: &Engine, owner: &str, points: i64) {
    engine.register_owner(owner, "Mochi", now()).await.unwrap();
    engine
        .apply_delta(owner, points, LedgerCategory::Adjustment, "seed", None, now())
        .await
        .unwrap();
}

async fn plush(engine: &Engine, stock: Option<i64>) {
    engine
        .new_catalog_entry("plush", RewardKind::Coupon, "Plush toy", 50, None, None, stock)
        .await
        .unwrap();
}

#[tokio::test]
async fn build_requires_migrated_schema() {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    assert!(Engine::builder().database(db).build().await.is_err());
}

#[tokio::test]
async fn bonus_coupon_entry_is_seeded() {
    let (engine, _db) = engine_with_db().await;

    let entry = engine.catalog_entry(BONUS_COUPON_ID).await.unwrap();
    assert_eq!(entry.kind, RewardKind::Coupon);
    assert_eq!(entry.cost, 0);
    assert_eq!(entry.stock, None);
}

#[tokio::test]
async fn redeem_debits_and_issues_a_coded_reward() {
    let (engine, _db) = engine_with_db().await;
    funded_owner(&engine, "alice", 120).await;
    plush(&engine, Some(2)).await;

    let result = engine.redeem("alice", "plush", now()).await.unwrap();
    assert_eq!(result.balance, 70);
    assert_eq!(result.stock_left, Some(1));
    assert_eq!(result.reward.origin, RewardOrigin::Redeem);
    assert!(result.reward.code.starts_with("CPN-"));

    let debit = result.debit.unwrap();
    assert_eq!(debit.delta, -50);
    assert_eq!(debit.category, LedgerCategory::Redeem);
    assert_eq!(debit.reference_code.as_deref(), Some(result.reward.code.as_str()));

    assert_eq!(engine.catalog_entry("plush").await.unwrap().stock, Some(1));
    assert_eq!(engine.rewards("alice", false).await.unwrap().len(), 1);
    assert!(engine.reconcile("alice").await.unwrap().is_balanced());
}

#[tokio::test]
async fn failed_redeem_leaves_balance_and_stock_alone() {
    let (engine, _db) = engine_with_db().await;
    funded_owner(&engine, "alice", 49).await;
    plush(&engine, Some(1)).await;

    let err = engine.redeem("alice", "plush", now()).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));

    assert_eq!(engine.balance("alice").await.unwrap(), 49);
    assert_eq!(engine.catalog_entry("plush").await.unwrap().stock, Some(1));
    assert!(engine.rewards("alice", true).await.unwrap().is_empty());

    let err = engine.redeem("alice", "nope", now()).await.unwrap_err();
    assert!(matches!(err, EngineError::CatalogEntryNotFound(_)));
}

#[tokio::test]
async fn sold_out_entry_is_refused_until_restocked() {
    let (engine, _db) = engine_with_db().await;
    funded_owner(&engine, "alice", 200).await;
    plush(&engine, Some(1)).await;

    engine.redeem("alice", "plush", now()).await.unwrap();
    let err = engine.redeem("alice", "plush", now()).await.unwrap_err();
    assert!(matches!(err, EngineError::OutOfStock(_)));
    assert_eq!(engine.balance("alice").await.unwrap(), 150);

    let listed = engine.catalog(now()).await.unwrap();
    assert!(listed.iter().all(|entry| entry.id != "plush"));

    let entry = engine.restock("plush", 2).await.unwrap();
    assert_eq!(entry.stock, Some(2));
    engine.redeem("alice", "plush", now()).await.unwrap();
    assert_eq!(engine.balance("alice").await.unwrap(), 100);
}

#[tokio::test]
async fn validity_window_is_half_open() {
    let (engine, _db) = engine_with_db().await;
    funded_owner(&engine, "alice", 500).await;
    let from = now() + Duration::hours(1);
    let until = from + Duration::days(1);
    engine
        .new_catalog_entry(
            "summer-voucher",
            RewardKind::EVoucher,
            "Summer voucher",
            100,
            Some(from),
            Some(until),
            None,
        )
        .await
        .unwrap();

    let err = engine
        .redeem("alice", "summer-voucher", now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OutsideValidityWindow(_)));

    let result = engine.redeem("alice", "summer-voucher", from).await.unwrap();
    assert!(result.reward.code.starts_with("EVC-"));
    assert_eq!(result.stock_left, None);

    let err = engine
        .redeem("alice", "summer-voucher", until)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OutsideValidityWindow(_)));
    assert_eq!(engine.balance("alice").await.unwrap(), 400);
}

#[tokio::test]
async fn catalog_keys_are_unique() {
    let (engine, _db) = engine_with_db().await;
    plush(&engine, None).await;

    let err = engine
        .new_catalog_entry("plush", RewardKind::Coupon, "Again", 10, None, None, None)
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("plush".to_string()));

    let err = engine
        .new_catalog_entry("bad", RewardKind::Coupon, "Bad", -1, None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn last_unit_goes_to_exactly_one_owner() {
    let (engine, _db) = engine_with_db().await;
    funded_owner(&engine, "alice", 100).await;
    funded_owner(&engine, "bob", 100).await;
    plush(&engine, Some(1)).await;

    let engine = Arc::new(engine);
    let handles: Vec<_> = ["alice", "bob"]
        .into_iter()
        .map(|owner| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.redeem(owner, "plush", now()).await })
        })
        .collect();

    let mut won = 0;
    let mut sold_out = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(EngineError::OutOfStock(_)) => sold_out += 1,
            Err(err) => panic!("unexpected error: {err}"),
        }
    }
    assert_eq!((won, sold_out), (1, 1));

    assert_eq!(engine.catalog_entry("plush").await.unwrap().stock, Some(0));
    let total = engine.balance("alice").await.unwrap() + engine.balance("bob").await.unwrap();
    assert_eq!(total, 150);
    assert!(engine.reconcile("alice").await.unwrap().is_balanced());
    assert!(engine.reconcile("bob").await.unwrap().is_balanced());
}

#[tokio::test]
async fn used_reward_stays_used() {
    let (engine, _db) = engine_with_db().await;
    funded_owner(&engine, "alice", 100).await;
    engine.register_owner("bob", "Rex", now()).await.unwrap();
    plush(&engine, None).await;

    let code = engine
        .redeem("alice", "plush", now())
        .await
        .unwrap()
        .reward
        .code;

    let err = engine.use_reward("bob", &code, now()).await.unwrap_err();
    assert!(matches!(err, EngineError::RewardNotFound(_)));

    let used = engine.use_reward("alice", &code, now()).await.unwrap();
    assert!(used.used);
    assert_eq!(used.used_at, Some(now()));

    let err = engine.use_reward("alice", &code, now()).await.unwrap_err();
    assert!(matches!(err, EngineError::RewardAlreadyUsed(_)));

    assert!(engine.rewards("alice", false).await.unwrap().is_empty());
    assert_eq!(engine.rewards("alice", true).await.unwrap().len(), 1);
}
