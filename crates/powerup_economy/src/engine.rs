//! # Power-Up Engine
//!
//! The single entry point collaborators call.
//!
//! ```text
//! controller ──> purchase / use_power_up ──┐
//!                                          ├──> [per-user Mutex] ──> Ledger + Registry
//! scheduler  ──> refresh_all(now) ─────────┘            │
//!                                                       ▼ (lock still held)
//!                                                    Journal
//! ```
//!
//! ## Concurrency
//!
//! Each user's ledger and registry live together behind one mutex, so
//! `purchase`, `use_power_up` and `refresh` on the same user are fully
//! serialized and the ledger's check-and-debit cannot interleave with
//! another writer. Different users never wait on each other beyond a
//! short read of the account table.
//!
//! The journal is appended before the account lock is released, so one
//! user's history is in the same order as the changes it describes. A
//! [`Journal`] implementation must therefore not block for long.
//!
//! ## Failure Model
//!
//! Every validation runs before the first write. An operation that
//! returns `Err` has changed nothing.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry, StaticCatalog};
use crate::config::EngineConfig;
use crate::error::{AccountError, ConfigResult, GateError, PurchaseError, UseError};
use crate::inventory::{self, InventoryView, UsageStats};
use crate::journal::{
    Journal, JournalEntry, JournalRecord, MemoryJournal, TransactionKind, UsageContext,
};
use crate::ledger::{Ledger, MemoryLedger};
use crate::lifecycle;
use crate::registry::{MemoryRegistry, Registry};
use crate::state::OwnedPowerUp;
use powerup_core::{Clock, PowerUpId, Timestamp, UserId};

/// A user's ledger and registry, always locked together.
#[derive(Debug)]
struct UserAccount<L, R> {
    ledger: L,
    registry: R,
}

type SharedAccount<L, R> = Arc<Mutex<UserAccount<L, R>>>;

/// Engine over in-memory ledgers and registries.
pub type MemoryEngine<C, K> = PowerUpEngine<C, K, MemoryLedger, MemoryRegistry>;

/// The power-up lifecycle engine.
///
/// `Send + Sync`; share it behind an `Arc` between request handlers and
/// the [`RefreshScheduler`](crate::scheduler::RefreshScheduler).
pub struct PowerUpEngine<C, K, L = MemoryLedger, R = MemoryRegistry> {
    catalog: C,
    clock: K,
    accounts: RwLock<HashMap<UserId, SharedAccount<L, R>>>,
    journal: Arc<dyn Journal>,
}

impl<C: Catalog, K: Clock, L: Ledger, R: Registry> PowerUpEngine<C, K, L, R> {
    /// Creates an engine with no accounts and an in-memory journal.
    pub fn new(catalog: C, clock: K) -> Self {
        Self {
            catalog,
            clock,
            accounts: RwLock::new(HashMap::new()),
            journal: Arc::new(MemoryJournal::default()),
        }
    }

    /// Replaces the journal.
    #[must_use]
    pub fn with_journal(mut self, journal: Arc<dyn Journal>) -> Self {
        self.journal = journal;
        self
    }

    /// The catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The clock.
    pub fn clock(&self) -> &K {
        &self.clock
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Registers a user's ledger and registry.
    ///
    /// # Errors
    ///
    /// Returns `AccountExists` if the user already has an account.
    pub fn open_account(&self, user: UserId, ledger: L, registry: R) -> Result<(), AccountError> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&user) {
            return Err(AccountError::AccountExists(user));
        }
        let balance = ledger.balance();
        accounts.insert(user, Arc::new(Mutex::new(UserAccount { ledger, registry })));
        drop(accounts);

        info!(user, balance, "power-up account opened");
        Ok(())
    }

    /// True if the user has an account.
    pub fn has_account(&self, user: UserId) -> bool {
        self.accounts.read().contains_key(&user)
    }

    /// Number of open accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.read().len()
    }

    fn account(&self, user: UserId) -> Option<SharedAccount<L, R>> {
        self.accounts.read().get(&user).cloned()
    }

    /// Current balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown user.
    pub fn balance(&self, user: UserId) -> Result<u64, AccountError> {
        let account = self.account(user).ok_or(AccountError::AccountNotFound(user))?;
        let balance = account.lock().ledger.balance();
        Ok(balance)
    }

    /// Credits currency earned elsewhere. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown user.
    pub fn credit(&self, user: UserId, amount: u64) -> Result<u64, AccountError> {
        let account = self.account(user).ok_or(AccountError::AccountNotFound(user))?;
        let balance = {
            let mut guard = account.lock();
            guard.ledger.credit(amount);
            self.journal.append(JournalRecord {
                user,
                kind: TransactionKind::Credit,
                catalog_id: None,
                quantity: 0,
                amount,
                at: self.clock.now(),
                context: None,
            });
            guard.ledger.balance()
        };

        debug!(user, amount, balance, "currency credited");
        Ok(balance)
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Buys one unit.
    ///
    /// # Errors
    ///
    /// See [`PowerUpEngine::purchase_many`].
    pub fn purchase(&self, user: UserId, id: PowerUpId) -> Result<OwnedPowerUp, PurchaseError> {
        self.purchase_many(user, id, 1)
    }

    /// Buys `quantity` units with a single debit.
    ///
    /// All or nothing: either every unit is added and the full price is
    /// debited, or neither happens.
    ///
    /// # Errors
    ///
    /// - `CatalogEntryNotFound` / `AccountNotFound` for unknown ids
    /// - `PowerUpLocked` if the entry is gated for this user
    /// - `InsufficientFunds` if the balance does not cover the total
    /// - `InvalidQuantity` / `ArithmeticOverflow` for impossible requests
    pub fn purchase_many(
        &self,
        user: UserId,
        id: PowerUpId,
        quantity: u32,
    ) -> Result<OwnedPowerUp, PurchaseError> {
        let entry = self.catalog.get(id).ok_or_else(|| {
            warn!(user, power_up = id, "purchase of unknown power-up");
            PurchaseError::CatalogEntryNotFound(id)
        })?;
        let account = self.account(user).ok_or_else(|| {
            warn!(user, power_up = id, "purchase without an account");
            PurchaseError::AccountNotFound(user)
        })?;
        let now = self.clock.now();

        let (plan, balance) = {
            let mut guard = account.lock();
            let current = guard.registry.get(entry);
            let plan = lifecycle::plan_purchase(entry, &current, quantity)?;

            if !guard.ledger.debit(plan.cost) {
                let available = guard.ledger.balance();
                debug!(user, power_up = id, cost = plan.cost, available, "purchase refused");
                return Err(PurchaseError::InsufficientFunds {
                    required: plan.cost,
                    available,
                });
            }

            debug_check(entry, &plan.updated);
            guard.registry.set(plan.updated.clone());
            self.journal.append(JournalRecord {
                user,
                kind: TransactionKind::Purchase,
                catalog_id: Some(id),
                quantity: i64::from(quantity),
                amount: plan.cost,
                at: now,
                context: None,
            });
            (plan, guard.ledger.balance())
        };

        info!(
            user,
            power_up = id,
            quantity,
            cost = plan.cost,
            balance,
            "power-up purchased"
        );
        Ok(plan.updated)
    }

    /// Uses one unit now.
    ///
    /// # Errors
    ///
    /// See [`PowerUpEngine::use_power_up_with`].
    pub fn use_power_up(&self, user: UserId, id: PowerUpId) -> Result<OwnedPowerUp, UseError> {
        self.use_power_up_with(user, id, None)
    }

    /// Uses one unit now and journals where it was used.
    ///
    /// Timers that have lapsed by now are settled first, so the outcome
    /// does not depend on when the scheduler last ran.
    ///
    /// # Errors
    ///
    /// - `CatalogEntryNotFound` / `AccountNotFound` for unknown ids
    /// - `PowerUpLocked`, `OnCooldown`, `AlreadyActive` by state
    /// - `NotOwned` with no stock
    /// - `UsageLimitReached` once the entry's cap is hit
    pub fn use_power_up_with(
        &self,
        user: UserId,
        id: PowerUpId,
        context: Option<UsageContext>,
    ) -> Result<OwnedPowerUp, UseError> {
        let entry = self.catalog.get(id).ok_or_else(|| {
            warn!(user, power_up = id, "use of unknown power-up");
            UseError::CatalogEntryNotFound(id)
        })?;
        let account = self.account(user).ok_or_else(|| {
            warn!(user, power_up = id, "use without an account");
            UseError::AccountNotFound(user)
        })?;
        let now = self.clock.now();

        let next = {
            let mut guard = account.lock();
            let stored = guard.registry.get(entry);
            let current = lifecycle::settle(entry, &stored, now).unwrap_or(stored);
            let next = lifecycle::activate(entry, &current, now).map_err(|e| {
                debug!(user, power_up = id, error = %e, "use refused");
                e
            })?;

            debug_check(entry, &next);
            guard.registry.set(next.clone());
            self.journal.append(JournalRecord {
                user,
                kind: TransactionKind::Use,
                catalog_id: Some(id),
                quantity: -1,
                amount: 0,
                at: now,
                context: context.clone(),
            });
            next
        };

        info!(
            user,
            power_up = id,
            exercise = context.as_ref().map(|c| c.exercise_id.as_str()),
            state = next.state.name(),
            quantity = next.quantity,
            usage_count = next.usage_count,
            "power-up used"
        );
        Ok(next)
    }

    /// Settles every lapsed timer of one user as of `now`.
    ///
    /// Idempotent and time-absolute: calling it late, early or twice is
    /// harmless. Returns how many records changed; an unknown user
    /// changes nothing.
    pub fn refresh(&self, user: UserId, now: Timestamp) -> usize {
        let Some(account) = self.account(user) else {
            debug!(user, "refresh for unknown account ignored");
            return 0;
        };
        let mut guard = account.lock();
        self.settle_account(user, &mut guard, now)
    }

    /// Settles every account. Called by the scheduler on each tick.
    pub fn refresh_all(&self, now: Timestamp) -> usize {
        let accounts: Vec<(UserId, SharedAccount<L, R>)> = self
            .accounts
            .read()
            .iter()
            .map(|(user, account)| (*user, Arc::clone(account)))
            .collect();

        accounts
            .into_iter()
            .map(|(user, account)| {
                let mut guard = account.lock();
                self.settle_account(user, &mut guard, now)
            })
            .sum()
    }

    fn settle_account(&self, user: UserId, account: &mut UserAccount<L, R>, now: Timestamp) -> usize {
        let mut changed = 0;
        for record in account.registry.records() {
            let Some(entry) = self.catalog.get(record.catalog_id) else {
                continue;
            };
            if let Some(next) = lifecycle::settle(entry, &record, now) {
                debug!(
                    user,
                    power_up = record.catalog_id,
                    from = record.state.name(),
                    to = next.state.name(),
                    "power-up timer lapsed"
                );
                debug_check(entry, &next);
                account.registry.set(next);
                changed += 1;
            }
        }
        changed
    }

    // ========================================================================
    // Gating
    // ========================================================================

    /// Gates an entry for a user.
    ///
    /// # Errors
    ///
    /// `EffectInFlight` if the item is active or cooling down, or an
    /// unknown-id error.
    pub fn lock(&self, user: UserId, id: PowerUpId) -> Result<OwnedPowerUp, GateError> {
        self.gate(user, id, lifecycle::lock)
    }

    /// Lifts a gate for a user.
    ///
    /// # Errors
    ///
    /// Returns an unknown-id error.
    pub fn unlock(&self, user: UserId, id: PowerUpId) -> Result<OwnedPowerUp, GateError> {
        self.gate(user, id, |record| Ok(lifecycle::unlock(record)))
    }

    fn gate(
        &self,
        user: UserId,
        id: PowerUpId,
        transition: impl FnOnce(&OwnedPowerUp) -> Result<OwnedPowerUp, GateError>,
    ) -> Result<OwnedPowerUp, GateError> {
        let entry = self
            .catalog
            .get(id)
            .ok_or(GateError::CatalogEntryNotFound(id))?;
        let account = self.account(user).ok_or(GateError::AccountNotFound(user))?;
        let now = self.clock.now();

        let mut guard = account.lock();
        let stored = guard.registry.get(entry);
        let current = lifecycle::settle(entry, &stored, now).unwrap_or_else(|| stored.clone());
        let next = transition(&current)?;
        if next != stored {
            debug_check(entry, &next);
            guard.registry.set(next.clone());
        }
        drop(guard);

        info!(user, power_up = id, state = next.state.name(), "power-up gate changed");
        Ok(next)
    }

    // ========================================================================
    // Read-only views
    // ========================================================================

    /// A user's record for one entry (its default if never touched).
    pub fn record(&self, user: UserId, id: PowerUpId) -> Option<OwnedPowerUp> {
        let entry = self.catalog.get(id)?;
        let account = self.account(user)?;
        let record = account.lock().registry.get(entry);
        Some(record)
    }

    /// The user's inventory as of the clock's now.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown user.
    pub fn inventory(&self, user: UserId) -> Result<InventoryView, AccountError> {
        let records = self.records(user)?;
        Ok(inventory::project(&records, &self.catalog, self.clock.now()))
    }

    /// Aggregate usage statistics.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` for an unknown user.
    pub fn stats(&self, user: UserId) -> Result<UsageStats, AccountError> {
        let records = self.records(user)?;
        Ok(inventory::usage_stats(&records))
    }

    /// Up to `limit` journaled transactions of the user, newest first.
    pub fn history(&self, user: UserId, limit: usize) -> Vec<JournalEntry> {
        self.journal.history(user, limit)
    }

    fn records(&self, user: UserId) -> Result<Vec<OwnedPowerUp>, AccountError> {
        let account = self.account(user).ok_or(AccountError::AccountNotFound(user))?;
        let records = account.lock().registry.records();
        Ok(records)
    }
}

impl<C: Catalog, K: Clock> PowerUpEngine<C, K, MemoryLedger, MemoryRegistry> {
    /// Opens an in-memory account with an opening balance.
    ///
    /// # Errors
    ///
    /// Returns `AccountExists` if the user already has an account.
    pub fn open_memory_account(&self, user: UserId, opening_balance: u64) -> Result<(), AccountError> {
        self.open_account(user, MemoryLedger::new(opening_balance), MemoryRegistry::new())
    }
}

impl<K: Clock, L: Ledger, R: Registry> PowerUpEngine<StaticCatalog, K, L, R> {
    /// Builds an engine from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the configured catalog is invalid.
    pub fn from_config(config: &EngineConfig, clock: K) -> ConfigResult<Self> {
        let catalog = config.catalog()?;
        info!(entries = catalog.len(), "power-up catalog loaded");
        Ok(Self::new(catalog, clock).with_journal(Arc::new(MemoryJournal::new(&config.journal))))
    }
}

fn debug_check(entry: &CatalogEntry, record: &OwnedPowerUp) {
    debug_assert!(
        record.check_invariants(entry).is_ok(),
        "lifecycle invariant violated: {:?}",
        record.check_invariants(entry)
    );
}
