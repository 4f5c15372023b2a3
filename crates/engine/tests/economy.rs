use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};

use engine::{
    Difficulty, Engine, EngineError, GameOutcome, GameRandom, LedgerCategory, RewardOrigin,
};
use migration::MigratorTrait;

/// Always wins or always loses, and rolls the low end of every range.
struct Scripted {
    win: bool,
}

impl GameRandom for Scripted {
    fn chance(&mut self, _p: f64) -> bool {
        self.win
    }

    fn roll(&mut self, lo: i32, _hi: i32) -> i32 {
        lo
    }
}

async fn engine_with_db(win: bool, daily_play_limit: u64) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .daily_play_limit(daily_play_limit)
        .rng(Scripted { win })
        .build()
        .await
        .unwrap();
    (engine, db)
}

// 2024-05-15 is a Wednesday.
fn wednesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
}

fn at(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_hms_opt(10, 0, 0).unwrap())
}

async fn assert_reconciles(engine: &Engine, owner: &str) {
    let report = engine.reconcile(owner).await.unwrap();
    assert!(report.is_balanced(), "{report:?}");
    assert!(report.balance >= 0);
}

#[tokio::test]
async fn register_creates_empty_account_and_active_pet() {
    let (engine, _db) = engine_with_db(true, 3).await;

    let registration = engine
        .register_owner("alice", "Mochi", at(wednesday()))
        .await
        .unwrap();
    assert_eq!(registration.account.balance, 0);
    assert!(registration.pet.active);
    assert_eq!(registration.pet.level, 1);
    assert_eq!(registration.pet.vitals.stamina, 80);

    let err = engine
        .register_owner("alice", "Other", at(wednesday()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::OwnerExists(_)));

    assert_eq!(engine.balance("alice").await.unwrap(), 0);
    assert_eq!(engine.active_pet("alice").await.unwrap(), registration.pet);
}

#[tokio::test]
async fn unknown_owner_is_never_created_on_read() {
    let (engine, _db) = engine_with_db(true, 3).await;

    let err = engine.balance("ghost").await.unwrap_err();
    assert!(matches!(err, EngineError::AccountNotFound(_)));
    let err = engine
        .sign_in("ghost", wednesday(), at(wednesday()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccountNotFound(_)));
    assert!(matches!(
        engine.balance("ghost").await,
        Err(EngineError::AccountNotFound(_))
    ));
    assert!(matches!(
        engine.balance("   ").await,
        Err(EngineError::InvalidId(_))
    ));
    assert!(matches!(
        engine.register_owner("alice", " ", at(wednesday())).await,
        Err(EngineError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn credit_then_debit_round_trips() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    engine.register_owner("alice", "Mochi", now).await.unwrap();

    let credit = engine
        .apply_delta("alice", 100, LedgerCategory::Adjustment, "welcome gift", None, now)
        .await
        .unwrap();
    assert_eq!(credit.balance_after, 100);
    assert_eq!(credit.seq, 1);

    let debit = engine
        .apply_delta("alice", -100, LedgerCategory::Adjustment, "correction", None, now)
        .await
        .unwrap();
    assert_eq!(debit.balance_after, 0);
    assert_eq!(debit.seq, 2);

    let history = engine.ledger_history("alice", 10, None).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].seq, 2);
    assert_eq!(history.iter().map(|entry| entry.delta).sum::<i64>(), 0);
    assert_eq!(engine.balance("alice").await.unwrap(), 0);
    assert_reconciles(&engine, "alice").await;
}

#[tokio::test]
async fn overdraft_and_zero_deltas_change_nothing() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    engine.register_owner("alice", "Mochi", now).await.unwrap();
    engine
        .apply_delta("alice", 30, LedgerCategory::Adjustment, "seed", None, now)
        .await
        .unwrap();

    let err = engine
        .apply_delta("alice", -31, LedgerCategory::Adjustment, "too much", None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance(_)));

    let err = engine
        .apply_delta("alice", 0, LedgerCategory::Adjustment, "nothing", None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    assert_eq!(engine.balance("alice").await.unwrap(), 30);
    assert_eq!(engine.ledger_history("alice", 10, None).await.unwrap().len(), 1);
    assert_reconciles(&engine, "alice").await;
}

#[tokio::test]
async fn extreme_deltas_are_refused_without_retry() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    engine.register_owner("alice", "Mochi", now).await.unwrap();

    let err = engine
        .apply_delta("alice", i64::MIN, LedgerCategory::Adjustment, "drain", None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    engine
        .apply_delta("alice", i64::MAX, LedgerCategory::Adjustment, "jackpot", None, now)
        .await
        .unwrap();
    let err = engine
        .apply_delta("alice", 1, LedgerCategory::Adjustment, "one more", None, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
    assert!(!err.is_retryable());

    let drained = engine
        .apply_delta("alice", -i64::MAX, LedgerCategory::Adjustment, "all", None, now)
        .await
        .unwrap();
    assert_eq!(drained.balance_after, 0);
    assert_eq!(engine.ledger_history("alice", 10, None).await.unwrap().len(), 2);
    assert_reconciles(&engine, "alice").await;
}

#[tokio::test]
async fn ledger_history_pages_backwards() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let first = at(wednesday());
    let second = first + chrono::Duration::minutes(5);
    engine.register_owner("alice", "Mochi", first).await.unwrap();
    engine
        .apply_delta("alice", 10, LedgerCategory::Adjustment, "one", None, first)
        .await
        .unwrap();
    engine
        .apply_delta("alice", 20, LedgerCategory::Adjustment, "two", Some("REF-2"), second)
        .await
        .unwrap();

    let latest = engine.ledger_history("alice", 1, None).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].delta, 20);
    assert_eq!(latest[0].reference_code.as_deref(), Some("REF-2"));

    let older = engine
        .ledger_history("alice", 10, Some(second))
        .await
        .unwrap();
    assert_eq!(older.len(), 1);
    assert_eq!(older[0].delta, 10);
}

#[tokio::test]
async fn second_sign_in_on_same_day_pays_nothing() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    engine.register_owner("alice", "Mochi", now).await.unwrap();

    let status = engine.sign_in_status("alice", wednesday()).await.unwrap();
    assert!(!status.signed_in);
    assert_eq!(status.reward.unwrap().points, 20);

    let result = engine.sign_in("alice", wednesday(), now).await.unwrap();
    assert_eq!(result.record.streak, 1);
    assert_eq!(result.record.points, 20);
    assert_eq!(result.balance, 20);

    let err = engine
        .sign_in("alice", wednesday(), now + chrono::Duration::hours(3))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadySignedIn(_)));

    assert_eq!(engine.balance("alice").await.unwrap(), 20);
    assert_eq!(engine.ledger_history("alice", 10, None).await.unwrap().len(), 1);
    let status = engine.sign_in_status("alice", wednesday()).await.unwrap();
    assert!(status.signed_in);
    assert!(status.reward.is_none());
}

#[tokio::test]
async fn week_long_streak_pays_milestone_and_levels_up_active_pet() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let start = wednesday().checked_sub_days(Days::new(6)).unwrap();
    engine.register_owner("alice", "Mochi", at(start)).await.unwrap();

    let mut last = None;
    for offset in 0..7 {
        let day = start.checked_add_days(Days::new(offset)).unwrap();
        last = Some(engine.sign_in("alice", day, at(day)).await.unwrap());
    }
    let last = last.unwrap();

    // Seventh day: base 20 plus the 7-day milestone.
    assert_eq!(last.record.streak, 7);
    assert_eq!(last.record.points, 60);
    assert_eq!(last.record.experience, 300);
    assert_eq!(last.coupons.len(), 1);
    assert_eq!(last.coupons[0].origin, RewardOrigin::SignIn);

    // Weekend days give 200 experience each, the milestone 300 more.
    assert_eq!(last.pet.level, 5);
    assert_eq!(last.pet.experience, 60);
    assert!(last.progression.leveled_up);
    assert_eq!(last.progression.bonus_points, 90);

    // Sign-in points 20+20+30+30+20+20+60, level-up bonuses 20+30+40+50.
    assert_eq!(engine.balance("alice").await.unwrap(), 340);
    assert_eq!(engine.sign_in_history("alice", 30).await.unwrap().len(), 7);
    assert_reconciles(&engine, "alice").await;
}

#[tokio::test]
async fn missed_day_resets_streak() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let monday = NaiveDate::from_ymd_opt(2024, 5, 13).unwrap();
    engine.register_owner("alice", "Mochi", at(monday)).await.unwrap();

    engine.sign_in("alice", monday, at(monday)).await.unwrap();
    let result = engine
        .sign_in("alice", wednesday(), at(wednesday()))
        .await
        .unwrap();
    assert_eq!(result.record.streak, 1);
}

#[tokio::test]
async fn sign_in_experience_goes_to_the_active_pet() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let saturday = NaiveDate::from_ymd_opt(2024, 5, 18).unwrap();
    let first = engine
        .register_owner("alice", "Mochi", at(saturday))
        .await
        .unwrap()
        .pet;
    let second = engine
        .adopt_pet("alice", "Nori", at(saturday))
        .await
        .unwrap();
    assert!(!second.active);

    engine.set_active_pet("alice", second.id).await.unwrap();
    let result = engine.sign_in("alice", saturday, at(saturday)).await.unwrap();
    assert_eq!(result.pet.id, second.id);
    assert_eq!(result.pet.level, 2);

    let first = engine.pet("alice", first.id).await.unwrap();
    assert!(!first.active);
    assert_eq!(first.level, 1);
    assert_eq!(engine.pets("alice").await.unwrap().len(), 2);
}

#[tokio::test]
async fn hard_win_pays_points_experience_and_coupon() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    let pet = engine
        .register_owner("alice", "Mochi", now)
        .await
        .unwrap()
        .pet;

    let result = engine
        .play_mini_game("alice", pet.id, Difficulty::Hard, now)
        .await
        .unwrap();

    assert_eq!(result.session.outcome, GameOutcome::Win);
    assert_eq!(result.session.monsters_defeated, 12);
    assert_eq!(result.session.points, 100);
    assert_eq!(result.session.experience, 270);
    assert_eq!(result.coupons.len(), 1);
    assert_eq!(result.coupons[0].origin, RewardOrigin::Game);

    // 270 experience crosses levels 2 and 3.
    assert_eq!(result.pet.level, 3);
    assert_eq!(result.pet.experience, 30);
    assert_eq!(result.session.level_up_bonus, 50);
    assert_eq!(result.balance, 150);
    assert_eq!(result.plays_left, 2);

    assert_eq!(result.pet.vitals.hunger, 55);
    assert_eq!(result.pet.vitals.mood, 65);
    assert_eq!(result.pet.vitals.stamina, 70);
    assert_eq!(result.pet.vitals.cleanliness, 58);
    assert_eq!(engine.pet("alice", pet.id).await.unwrap(), result.pet);

    let categories: Vec<_> = engine
        .ledger_history("alice", 10, None)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.category)
        .collect();
    assert_eq!(
        categories,
        vec![LedgerCategory::LevelUp, LedgerCategory::GamePlay]
    );
    assert_reconciles(&engine, "alice").await;
}

/// Make every later insert into `table` fail inside the store.
async fn reject_inserts(db: &DatabaseConnection, table: &str) {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER reject_{table} BEFORE INSERT ON {table} \
         BEGIN SELECT RAISE(ABORT, '{table} is read-only'); END;"
    ))
    .await
    .unwrap();
}

#[tokio::test]
async fn failed_game_rolls_back_points_experience_and_coupons() {
    let (engine, db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    let pet = engine
        .register_owner("alice", "Mochi", now)
        .await
        .unwrap()
        .pet;
    reject_inserts(&db, "game_sessions").await;

    // The session row is written last, after the credit, the level-up
    // and the coupon.
    let err = engine
        .play_mini_game("alice", pet.id, Difficulty::Hard, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StoreUnavailable(_)));

    assert_eq!(engine.balance("alice").await.unwrap(), 0);
    assert!(engine.ledger_history("alice", 10, None).await.unwrap().is_empty());
    assert!(engine.rewards("alice", true).await.unwrap().is_empty());
    assert_eq!(engine.pet("alice", pet.id).await.unwrap(), pet);
    assert_eq!(engine.games_played_on("alice", wednesday()).await.unwrap(), 0);
    assert_reconciles(&engine, "alice").await;
}

#[tokio::test]
async fn failed_sign_in_can_be_repeated() {
    let (engine, db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    let pet = engine
        .register_owner("alice", "Mochi", now)
        .await
        .unwrap()
        .pet;
    reject_inserts(&db, "sign_ins").await;

    let err = engine.sign_in("alice", wednesday(), now).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(engine.balance("alice").await.unwrap(), 0);
    assert_eq!(engine.active_pet("alice").await.unwrap(), pet);
    assert!(!engine.sign_in_status("alice", wednesday()).await.unwrap().signed_in);

    db.execute_unprepared("DROP TRIGGER reject_sign_ins")
        .await
        .unwrap();
    let result = engine.sign_in("alice", wednesday(), now).await.unwrap();
    assert_eq!(result.balance, engine.balance("alice").await.unwrap());
    assert_eq!(result.record.day, wednesday());
    assert_reconciles(&engine, "alice").await;
}

#[tokio::test]
async fn fourth_play_of_the_day_is_refused() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    let pet = engine
        .register_owner("alice", "Mochi", now)
        .await
        .unwrap()
        .pet;

    for _ in 0..2 {
        engine
            .play_mini_game("alice", pet.id, Difficulty::Easy, now)
            .await
            .unwrap();
    }
    // Aborted rounds count toward the cap.
    let aborted = engine
        .abort_mini_game("alice", pet.id, Difficulty::Easy, now)
        .await
        .unwrap();
    assert_eq!(aborted.session.outcome, GameOutcome::Abort);
    assert_eq!(aborted.session.points, 0);
    assert_eq!(aborted.plays_left, 0);

    let balance = engine.balance("alice").await.unwrap();
    let err = engine
        .play_mini_game("alice", pet.id, Difficulty::Easy, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::DailyLimitReached(_)));
    assert_eq!(engine.balance("alice").await.unwrap(), balance);
    assert_eq!(
        engine.games_played_on("alice", wednesday()).await.unwrap(),
        3
    );

    let tomorrow = now + chrono::Duration::days(1);
    engine
        .play_mini_game("alice", pet.id, Difficulty::Easy, tomorrow)
        .await
        .unwrap();
    assert_reconciles(&engine, "alice").await;
}

#[tokio::test]
async fn tired_pet_cannot_play() {
    let (engine, _db) = engine_with_db(false, 10).await;
    let now = at(wednesday());
    let pet = engine
        .register_owner("alice", "Mochi", now)
        .await
        .unwrap()
        .pet;

    // Each loss costs 20 stamina: 80 -> 60 -> 40 -> 20 -> 0.
    for _ in 0..4 {
        let result = engine
            .play_mini_game("alice", pet.id, Difficulty::Normal, now)
            .await
            .unwrap();
        assert_eq!(result.session.outcome, GameOutcome::Lose);
        assert_eq!(result.session.points, 0);
        assert_eq!(result.session.experience, 5);
    }

    let err = engine
        .play_mini_game("alice", pet.id, Difficulty::Normal, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientStamina(_)));

    let pet = engine.pet("alice", pet.id).await.unwrap();
    assert_eq!(pet.vitals.stamina, 0);
    assert_eq!(pet.experience, 20);
    assert_eq!(
        engine.games_played_on("alice", wednesday()).await.unwrap(),
        4
    );
    assert_eq!(engine.balance("alice").await.unwrap(), 0);
}

#[tokio::test]
async fn cannot_play_with_someone_elses_pet() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    engine.register_owner("alice", "Mochi", now).await.unwrap();
    let bobs_pet = engine
        .register_owner("bob", "Rex", now)
        .await
        .unwrap()
        .pet;

    let err = engine
        .play_mini_game("alice", bobs_pet.id, Difficulty::Easy, now)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PetNotOwned(_)));

    let err = engine
        .change_cosmetics("alice", bobs_pet.id, Some("golden"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PetNotOwned(_)));
    assert_eq!(engine.games_played_on("bob", wednesday()).await.unwrap(), 0);
}

#[tokio::test]
async fn cosmetics_only_touch_the_look() {
    let (engine, _db) = engine_with_db(true, 3).await;
    let now = at(wednesday());
    let pet = engine
        .register_owner("alice", "Mochi", now)
        .await
        .unwrap()
        .pet;

    let updated = engine
        .change_cosmetics("alice", pet.id, Some("golden"), None)
        .await
        .unwrap();
    assert_eq!(updated.skin, "golden");
    assert_eq!(updated.background, pet.background);
    assert_eq!(updated.vitals, pet.vitals);
    assert_eq!(engine.pet("alice", pet.id).await.unwrap(), updated);
}
