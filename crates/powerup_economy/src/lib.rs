//! # Power-Up Economy
//!
//! Purchasable, consumable boosts for the learning platform: what they
//! cost, what state each one is in, and the single-currency ledger that
//! pays for them.
//!
//! ## Design Principles
//!
//! 1. **Unrepresentable illegal states** - the lifecycle is an enum that carries its own timers
//! 2. **All or nothing** - a rejected operation changes neither ledger nor registry
//! 3. **Absolute time** - refresh is idempotent and never counts ticks
//! 4. **Projections, not caches** - inventory views are recomputed from the registry
//!
//! ## Thread Safety
//!
//! [`PowerUpEngine`] is `Send + Sync`. Operations on one user are
//! serialized by that user's account lock; users are independent.
//!
//! ## Example
//!
//! ```rust,ignore
//! use powerup_economy::{EngineConfig, MemoryEngine, RefreshScheduler};
//! use powerup_core::SystemClock;
//!
//! let config = EngineConfig::from_file("config/powerups.toml")?;
//! let engine = Arc::new(MemoryEngine::from_config(&config, SystemClock)?);
//! let _scheduler = RefreshScheduler::spawn(Arc::clone(&engine), &config.scheduler);
//!
//! engine.open_memory_account(user, 100)?;
//! engine.purchase(user, HINT)?;
//! engine.use_power_up(user, HINT)?;
//! let view = engine.inventory(user)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod journal;
pub mod ledger;
pub mod lifecycle;
pub mod registry;
pub mod scheduler;
pub mod state;

pub use catalog::{Catalog, CatalogEntry, Category, EffectKind, StaticCatalog};
pub use config::EngineConfig;
pub use engine::{MemoryEngine, PowerUpEngine};
pub use error::{
    AccountError, ConfigError, ConfigResult, GateError, InvariantViolation, PurchaseError,
    UseError,
};
pub use inventory::{ActiveEffect, CoolingDown, EntryStats, InventoryView, UsageStats};
pub use journal::{
    Journal, JournalConfig, JournalEntry, JournalRecord, MemoryJournal, TransactionKind,
    UsageContext, DEFAULT_HISTORY_LIMIT,
};
pub use ledger::{Ledger, MemoryLedger};
pub use registry::{MemoryRegistry, Registry};
pub use scheduler::{RefreshScheduler, SchedulerConfig};
pub use state::{LifecycleState, OwnedPowerUp};
