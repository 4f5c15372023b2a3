//! Points economy and pet progression.
//!
//! [`Engine`] owns every balance change, pet update and reward issuance.
//! The calculators in [`streak`], [`progression`] and [`minigame`] are pure
//! and can be used on their own.

pub use accounts::Account;
pub use catalog::{BONUS_COUPON_ID, CatalogEntry, RewardKind};
pub use error::EngineError;
pub use game_sessions::GameSession;
pub use ledger::{LedgerCategory, LedgerEntry, Reconciliation};
pub use minigame::{Difficulty, GameOutcome, GameRandom, RngSource, SimulatedGame};
pub use ops::{
    DEFAULT_DAILY_PLAY_LIMIT, Engine, EngineBuilder, GameResult, RedemptionResult, Registration,
    SignInResult, SignInStatus,
};
pub use pets::{Pet, VitalDelta, Vitals};
pub use progression::Progression;
pub use rewards::{IssuedReward, RewardOrigin};
pub use sign_ins::SignInRecord;
pub use streak::SignInReward;

mod accounts;
mod catalog;
mod error;
mod game_sessions;
mod ledger;
mod locks;
pub mod minigame;
mod ops;
mod pets;
pub mod progression;
mod rewards;
mod sign_ins;
pub mod streak;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
