//! The module contains the errors the engine can return.
//!
//! Every variant is an expected condition the caller can recover from:
//!
//! - rate limits such as [`AlreadySignedIn`] and [`DailyLimitReached`];
//! - precondition failures such as [`InsufficientBalance`] or [`OutOfStock`];
//! - lookup failures such as [`PetNotOwned`] or [`CatalogEntryNotFound`];
//! - malformed input: [`InvalidAmount`] for point, cost and stock values,
//!   [`InvalidId`] for ids, [`InvalidInput`] for names and stored codes;
//! - [`StoreUnavailable`], the only infrastructure fault. The unit of work
//!   that hit it has been rolled back and can be retried.
//!
//!  [`AlreadySignedIn`]: EngineError::AlreadySignedIn
//!  [`DailyLimitReached`]: EngineError::DailyLimitReached
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`OutOfStock`]: EngineError::OutOfStock
//!  [`PetNotOwned`]: EngineError::PetNotOwned
//!  [`CatalogEntryNotFound`]: EngineError::CatalogEntryNotFound
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`InvalidId`]: EngineError::InvalidId
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`StoreUnavailable`]: EngineError::StoreUnavailable
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Already signed in: {0}")]
    AlreadySignedIn(String),
    #[error("Daily limit reached: {0}")]
    DailyLimitReached(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Insufficient stamina: {0}")]
    InsufficientStamina(String),
    #[error("Out of stock: {0}")]
    OutOfStock(String),
    #[error("Outside validity window: {0}")]
    OutsideValidityWindow(String),
    #[error("Reward already used: {0}")]
    RewardAlreadyUsed(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(String),
    #[error("Pet not owned: {0}")]
    PetNotOwned(String),
    #[error("Pet not found: {0}")]
    PetNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Catalog entry not found: {0}")]
    CatalogEntryNotFound(String),
    #[error("Reward not found: {0}")]
    RewardNotFound(String),
    #[error("\"{0}\" already registered!")]
    OwnerExists(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] DbErr),
}

impl EngineError {
    /// Returns `true` when the failure came from the store and the same
    /// request may succeed if retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::AlreadySignedIn(a), Self::AlreadySignedIn(b)) => a == b,
            (Self::DailyLimitReached(a), Self::DailyLimitReached(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::InsufficientStamina(a), Self::InsufficientStamina(b)) => a == b,
            (Self::OutOfStock(a), Self::OutOfStock(b)) => a == b,
            (Self::OutsideValidityWindow(a), Self::OutsideValidityWindow(b)) => a == b,
            (Self::RewardAlreadyUsed(a), Self::RewardAlreadyUsed(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::InvalidDifficulty(a), Self::InvalidDifficulty(b)) => a == b,
            (Self::PetNotOwned(a), Self::PetNotOwned(b)) => a == b,
            (Self::PetNotFound(a), Self::PetNotFound(b)) => a == b,
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::CatalogEntryNotFound(a), Self::CatalogEntryNotFound(b)) => a == b,
            (Self::RewardNotFound(a), Self::RewardNotFound(b)) => a == b,
            (Self::OwnerExists(a), Self::OwnerExists(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::StoreUnavailable(a), Self::StoreUnavailable(b)) => {
                a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}
