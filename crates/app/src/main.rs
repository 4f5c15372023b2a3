use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{Difficulty, Engine, RewardKind};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::settings::{Overrides, Settings};

mod error;
mod settings;

#[derive(Debug, Parser)]
#[command(name = "petpoints", version, about = "Pet points economy and progression")]
struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    config: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    level: Option<String>,
    /// `memory` or the path of a sqlite database file.
    #[arg(long, global = true)]
    database: Option<String>,
    /// Timezone whose midnight starts a new day (IANA name).
    #[arg(long, global = true)]
    timezone: Option<String>,
    /// Mini-game rounds allowed per owner and day.
    #[arg(long, global = true)]
    daily_play_limit: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Owner {
    /// Owner id.
    #[arg(long)]
    owner: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account and its first pet.
    Register {
        #[command(flatten)]
        owner: Owner,
        /// Name of the first pet.
        #[arg(long)]
        pet: String,
    },
    /// Daily sign-in.
    SignIn {
        #[command(flatten)]
        owner: Owner,
        /// Calendar day to sign in for. Defaults to today in the configured timezone.
        #[arg(long)]
        day: Option<NaiveDate>,
    },
    /// Whether today is signed in and what signing in would pay.
    SignInStatus {
        #[command(flatten)]
        owner: Owner,
    },
    /// Play one mini-game round.
    Play(GameArgs),
    /// Record an aborted mini-game round.
    Abort(GameArgs),
    /// Spend points on a catalog entry.
    Redeem {
        #[command(flatten)]
        owner: Owner,
        /// Catalog entry id.
        #[arg(long)]
        entry: String,
    },
    Balance {
        #[command(flatten)]
        owner: Owner,
    },
    /// Ledger entries, newest first.
    History {
        #[command(flatten)]
        owner: Owner,
        #[arg(long, default_value_t = 20)]
        limit: u64,
        /// Only entries created before this RFC 3339 timestamp.
        #[arg(long, value_parser = parse_timestamp)]
        before: Option<DateTime<Utc>>,
    },
    /// Check that the balance matches the sum of the ledger.
    Reconcile {
        #[command(flatten)]
        owner: Owner,
    },
    /// Show a pet; the active one when `--pet` is missing.
    Pet {
        #[command(flatten)]
        owner: Owner,
        #[arg(long)]
        pet: Option<Uuid>,
    },
    /// List every pet of an owner.
    Pets {
        #[command(flatten)]
        owner: Owner,
    },
    /// Adopt another pet. It starts inactive.
    Adopt {
        #[command(flatten)]
        owner: Owner,
        #[arg(long)]
        name: String,
    },
    /// Make a pet the active one.
    Activate {
        #[command(flatten)]
        owner: Owner,
        #[arg(long)]
        pet: Uuid,
    },
    /// Change skin and/or background of a pet.
    Cosmetics {
        #[command(flatten)]
        owner: Owner,
        #[arg(long)]
        pet: Uuid,
        #[arg(long)]
        skin: Option<String>,
        #[arg(long)]
        background: Option<String>,
    },
    /// Issued coupons and e-vouchers.
    Rewards {
        #[command(flatten)]
        owner: Owner,
        /// Include rewards already used.
        #[arg(long)]
        all: bool,
    },
    UseReward {
        #[command(flatten)]
        owner: Owner,
        #[arg(long)]
        code: String,
    },
    /// Reward catalog administration.
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// Manage the database schema. Other commands apply pending
    /// migrations on their own.
    Migrate {
        #[arg(value_enum, default_value_t = MigrateAction::Up)]
        action: MigrateAction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MigrateAction {
    /// Apply pending migrations.
    Up,
    /// Roll back the last migration.
    Down,
    /// Drop every table and migrate from scratch.
    Fresh,
    /// Print applied and pending migrations.
    Status,
}

#[derive(Debug, Args)]
struct GameArgs {
    #[command(flatten)]
    owner: Owner,
    #[arg(long)]
    pet: Uuid,
    /// 1 = easy, 2 = normal, 3 = hard.
    #[arg(long, default_value_t = 1)]
    difficulty: i64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Coupon,
    EVoucher,
}

impl From<KindArg> for RewardKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Coupon => RewardKind::Coupon,
            KindArg::EVoucher => RewardKind::EVoucher,
        }
    }
}

#[derive(Debug, Subcommand)]
enum CatalogCommand {
    /// Add a catalog entry.
    Add {
        #[arg(long)]
        id: String,
        #[arg(long, value_enum)]
        kind: KindArg,
        #[arg(long)]
        name: String,
        #[arg(long)]
        cost: i64,
        #[arg(long, value_parser = parse_timestamp)]
        valid_from: Option<DateTime<Utc>>,
        #[arg(long, value_parser = parse_timestamp)]
        valid_until: Option<DateTime<Utc>>,
        /// Units available. Uncapped when missing.
        #[arg(long)]
        stock: Option<i64>,
    },
    /// Entries redeemable right now.
    List,
    Show {
        #[arg(long)]
        id: String,
    },
    Restock {
        #[arg(long)]
        id: String,
        #[arg(long)]
        quantity: i64,
    },
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(Overrides {
        config: cli.config,
        level: cli.level,
        database: cli.database,
        timezone: cli.timezone,
        daily_play_limit: cli.daily_play_limit,
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "petpoints={level},engine={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let timezone = settings.timezone()?;
    let db = sea_orm::Database::connect(settings.database.url()).await?;
    if let Command::Migrate { action } = cli.command {
        return migrate(&db, action).await;
    }
    Migrator::up(&db, None).await?;
    tracing::debug!(database = ?settings.database, "schema up to date");

    let engine = Engine::builder()
        .database(db)
        .timezone(timezone)
        .daily_play_limit(settings.daily_play_limit)
        .build()
        .await?;

    execute(&engine, cli.command, Utc::now()).await
}

async fn execute(engine: &Engine, command: Command, now: DateTime<Utc>) -> Result<()> {
    let today = now.with_timezone(&engine.timezone()).date_naive();

    match command {
        Command::Register { owner, pet } => {
            print_json(&engine.register_owner(&owner.owner, &pet, now).await?)
        }
        Command::SignIn { owner, day } => print_json(
            &engine
                .sign_in(&owner.owner, day.unwrap_or(today), now)
                .await?,
        ),
        Command::SignInStatus { owner } => {
            print_json(&engine.sign_in_status(&owner.owner, today).await?)
        }
        Command::Play(game) => {
            let difficulty = Difficulty::try_from(game.difficulty)?;
            print_json(
                &engine
                    .play_mini_game(&game.owner.owner, game.pet, difficulty, now)
                    .await?,
            )
        }
        Command::Abort(game) => {
            let difficulty = Difficulty::try_from(game.difficulty)?;
            print_json(
                &engine
                    .abort_mini_game(&game.owner.owner, game.pet, difficulty, now)
                    .await?,
            )
        }
        Command::Redeem { owner, entry } => {
            print_json(&engine.redeem(&owner.owner, &entry, now).await?)
        }
        Command::Balance { owner } => print_json(&engine.account(&owner.owner).await?),
        Command::History {
            owner,
            limit,
            before,
        } => print_json(&engine.ledger_history(&owner.owner, limit, before).await?),
        Command::Reconcile { owner } => {
            let report = engine.reconcile(&owner.owner).await?;
            print_json(&report)?;
            if !report.is_balanced() {
                return Err(AppError::Input(format!(
                    "ledger of '{}' does not match its balance",
                    report.owner_id
                )));
            }
            Ok(())
        }
        Command::Pet { owner, pet } => match pet {
            Some(pet_id) => print_json(&engine.pet(&owner.owner, pet_id).await?),
            None => print_json(&engine.active_pet(&owner.owner).await?),
        },
        Command::Pets { owner } => print_json(&engine.pets(&owner.owner).await?),
        Command::Adopt { owner, name } => {
            print_json(&engine.adopt_pet(&owner.owner, &name, now).await?)
        }
        Command::Activate { owner, pet } => {
            print_json(&engine.set_active_pet(&owner.owner, pet).await?)
        }
        Command::Cosmetics {
            owner,
            pet,
            skin,
            background,
        } => print_json(
            &engine
                .change_cosmetics(&owner.owner, pet, skin.as_deref(), background.as_deref())
                .await?,
        ),
        Command::Rewards { owner, all } => print_json(&engine.rewards(&owner.owner, all).await?),
        Command::UseReward { owner, code } => {
            print_json(&engine.use_reward(&owner.owner, &code, now).await?)
        }
        Command::Catalog(command) => execute_catalog(engine, command, now).await,
        Command::Migrate { .. } => Err(AppError::Input(
            "migrations run before the engine is built".to_string(),
        )),
    }
}

async fn migrate(db: &DatabaseConnection, action: MigrateAction) -> Result<()> {
    match action {
        MigrateAction::Up => Migrator::up(db, None).await?,
        MigrateAction::Down => Migrator::down(db, Some(1)).await?,
        MigrateAction::Fresh => Migrator::fresh(db).await?,
        MigrateAction::Status => Migrator::status(db).await?,
    }
    tracing::info!(?action, "migration finished");
    Ok(())
}

async fn execute_catalog(
    engine: &Engine,
    command: CatalogCommand,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        CatalogCommand::Add {
            id,
            kind,
            name,
            cost,
            valid_from,
            valid_until,
            stock,
        } => print_json(
            &engine
                .new_catalog_entry(&id, kind.into(), &name, cost, valid_from, valid_until, stock)
                .await?,
        ),
        CatalogCommand::List => print_json(&engine.catalog(now).await?),
        CatalogCommand::Show { id } => print_json(&engine.catalog_entry(&id).await?),
        CatalogCommand::Restock { id, quantity } => {
            print_json(&engine.restock(&id, quantity).await?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
