//! # Economy Error Types
//!
//! Every error here is an expected, recoverable outcome. None of them is
//! retried internally and none of them leaves partial state behind: when
//! an operation returns `Err`, the ledger and the registry are exactly as
//! they were before the call.

use powerup_core::{PowerUpId, Timestamp, UserId};
use thiserror::Error;

/// Errors returned by `purchase`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    /// The balance does not cover the price.
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        /// Total cost of the purchase.
        required: u64,
        /// Balance at the time of the attempt.
        available: u64,
    },

    /// The entry is gated for this user.
    #[error("power-up {0} is locked")]
    PowerUpLocked(PowerUpId),

    /// Unknown catalog id.
    #[error("catalog entry not found: {0}")]
    CatalogEntryNotFound(PowerUpId),

    /// No account is open for the user.
    #[error("account not found: {0}")]
    AccountNotFound(UserId),

    /// Bulk purchases must buy at least one unit.
    #[error("invalid purchase quantity: {0}")]
    InvalidQuantity(u32),

    /// Cost or stock counters would overflow.
    #[error("arithmetic overflow in purchase")]
    ArithmeticOverflow,
}

/// Errors returned by `use`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UseError {
    /// Nothing in stock.
    #[error("power-up {0} is not owned")]
    NotOwned(PowerUpId),

    /// The item is recharging.
    #[error("power-up {id} is on cooldown until {ends_at}")]
    OnCooldown {
        /// The power-up.
        id: PowerUpId,
        /// When the cooldown lapses.
        ends_at: Timestamp,
    },

    /// An effect of this item is already running.
    #[error("power-up {id} is already active until {expires_at}")]
    AlreadyActive {
        /// The power-up.
        id: PowerUpId,
        /// When the running effect expires.
        expires_at: Timestamp,
    },

    /// The entry is gated for this user.
    #[error("power-up {0} is locked")]
    PowerUpLocked(PowerUpId),

    /// The entry-level usage cap has been reached.
    #[error("power-up {id} reached its usage limit of {limit}")]
    UsageLimitReached {
        /// The power-up.
        id: PowerUpId,
        /// The cap from the catalog.
        limit: u32,
    },

    /// Unknown catalog id.
    #[error("catalog entry not found: {0}")]
    CatalogEntryNotFound(PowerUpId),

    /// No account is open for the user.
    #[error("account not found: {0}")]
    AccountNotFound(UserId),
}

/// Errors from account management and read-only queries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// No account is open for the user.
    #[error("account not found: {0}")]
    AccountNotFound(UserId),

    /// An account is already open for the user.
    #[error("account already exists: {0}")]
    AccountExists(UserId),
}

/// Errors from locking or unlocking an entry for a user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// No account is open for the user.
    #[error("account not found: {0}")]
    AccountNotFound(UserId),

    /// Unknown catalog id.
    #[error("catalog entry not found: {0}")]
    CatalogEntryNotFound(PowerUpId),

    /// Active or cooling-down items cannot be revoked.
    #[error("power-up {0} has an effect in flight")]
    EffectInFlight(PowerUpId),
}

/// Configuration and catalog loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for the expected schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed, but semantically invalid.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A registry record that breaks a lifecycle invariant.
///
/// Seeing one of these means an earlier operation was buggy. The engine
/// asserts against them in debug builds and never repairs them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Record stored under the wrong entry.
    #[error("record for {record} checked against entry {entry}")]
    WrongEntry {
        /// Id carried by the record.
        record: PowerUpId,
        /// Id of the entry it was checked against.
        entry: PowerUpId,
    },

    /// `Active` on an entry without a duration.
    #[error("power-up {0} is active but the entry is not timed")]
    ActiveWithoutDuration(PowerUpId),

    /// `Active` with an expiry that does not match the duration.
    #[error("power-up {0} has an expiry inconsistent with its duration")]
    ExpiryMismatch(PowerUpId),

    /// `Cooldown` on an entry without a cooldown.
    #[error("power-up {0} is cooling down but the entry has no cooldown")]
    CooldownWithoutPeriod(PowerUpId),

    /// `Active` or `Cooldown` on an item that was never owned.
    #[error("power-up {0} is in flight but was never owned")]
    InFlightWithoutOwnership(PowerUpId),

    /// Stock or usage on an item that was never owned.
    #[error("power-up {0} has stock or usage but was never owned")]
    StockWithoutOwnership(PowerUpId),

    /// `quantity + usage_count` differs from the units ever bought.
    #[error("power-up {id}: quantity {quantity} + usages {usages} != purchased {purchased}")]
    StockMismatch {
        /// The power-up.
        id: PowerUpId,
        /// Units in stock.
        quantity: u32,
        /// Units consumed.
        usages: u32,
        /// Units bought.
        purchased: u32,
    },

    /// More uses than the entry allows.
    #[error("power-up {id} used {usages} times, limit {limit}")]
    UsageOverLimit {
        /// The power-up.
        id: PowerUpId,
        /// Recorded uses.
        usages: u32,
        /// Catalog cap.
        limit: u32,
    },
}
