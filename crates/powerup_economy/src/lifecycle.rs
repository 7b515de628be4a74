//! # Lifecycle State Machine
//!
//! Pure transition functions. Each takes the catalog entry and the current
//! record and returns the next record (or an error); none of them touches
//! a ledger, a registry or a clock. The engine supplies those.
//!
//! ## Transitions
//!
//! ```text
//! Available --purchase--> Available          (quantity += n, ledger debited)
//! Available --use-------> Active             (timed entry)
//! Available --use-------> Cooldown           (untimed entry with cooldown)
//! Available --use-------> Available          (instant effect)
//! Active    --expiry----> Cooldown           (entry has cooldown)
//! Active    --expiry----> Available          (otherwise)
//! Cooldown  --expiry----> Available
//! ```
//!
//! `Locked` is only entered and left through [`lock`] / [`unlock`].
//!
//! ## Cooldown Anchoring
//!
//! A cooldown always starts when the effect ends: at `expires_at` for a
//! timed entry, at the moment of use for an untimed one. It never depends
//! on when a refresh happened to run.

use crate::catalog::CatalogEntry;
use crate::error::{GateError, PurchaseError, UseError};
use crate::state::{LifecycleState, OwnedPowerUp};
use powerup_core::Timestamp;

/// A validated purchase, ready to commit once the ledger is debited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PurchasePlan {
    /// Amount to debit.
    pub cost: u64,
    /// Record to store after a successful debit.
    pub updated: OwnedPowerUp,
}

/// Validates buying `quantity` units and computes the resulting record.
///
/// The state is never changed by a purchase; buying while an effect runs
/// or recharges just adds stock.
///
/// # Errors
///
/// - `InvalidQuantity` for zero units
/// - `PowerUpLocked` if the record is gated
/// - `ArithmeticOverflow` if cost or counters would overflow
pub fn plan_purchase(
    entry: &CatalogEntry,
    record: &OwnedPowerUp,
    quantity: u32,
) -> Result<PurchasePlan, PurchaseError> {
    if quantity == 0 {
        return Err(PurchaseError::InvalidQuantity(quantity));
    }
    if record.state == LifecycleState::Locked {
        return Err(PurchaseError::PowerUpLocked(entry.id));
    }

    let cost = entry
        .price
        .checked_mul(u64::from(quantity))
        .ok_or(PurchaseError::ArithmeticOverflow)?;

    let mut updated = record.clone();
    updated.quantity = updated
        .quantity
        .checked_add(quantity)
        .ok_or(PurchaseError::ArithmeticOverflow)?;
    updated.purchased_total = updated
        .purchased_total
        .checked_add(quantity)
        .ok_or(PurchaseError::ArithmeticOverflow)?;
    updated.spent_total = updated
        .spent_total
        .checked_add(cost)
        .ok_or(PurchaseError::ArithmeticOverflow)?;
    updated.owned = true;

    Ok(PurchasePlan { cost, updated })
}

/// Uses one unit at `now`.
///
/// Gate order: lifecycle state first (locked, recharging, running), then
/// stock, then the usage cap. A recharging item therefore reports
/// `OnCooldown` whatever its stock.
///
/// # Errors
///
/// `PowerUpLocked`, `OnCooldown`, `AlreadyActive`, `NotOwned` or
/// `UsageLimitReached`; the record is never modified on error.
pub fn activate(
    entry: &CatalogEntry,
    record: &OwnedPowerUp,
    now: Timestamp,
) -> Result<OwnedPowerUp, UseError> {
    let id = entry.id;
    match record.state {
        LifecycleState::Locked => return Err(UseError::PowerUpLocked(id)),
        LifecycleState::Cooldown { cooldown_ends_at } => {
            return Err(UseError::OnCooldown {
                id,
                ends_at: cooldown_ends_at,
            })
        }
        LifecycleState::Active { expires_at, .. } => {
            return Err(UseError::AlreadyActive { id, expires_at })
        }
        LifecycleState::Available => {}
    }

    if !record.owned || record.quantity == 0 {
        return Err(UseError::NotOwned(id));
    }

    if let Some(limit) = entry.max_usages {
        if record.usage_count >= limit {
            return Err(UseError::UsageLimitReached { id, limit });
        }
    }

    let mut next = record.clone();
    next.quantity -= 1;
    // usage_count < purchased_total while stock remains, so this cannot overflow.
    next.usage_count += 1;
    next.state = state_after_use(entry, now);
    Ok(next)
}

fn state_after_use(entry: &CatalogEntry, now: Timestamp) -> LifecycleState {
    match (entry.duration_secs, entry.cooldown_secs) {
        (Some(duration), _) => LifecycleState::Active {
            activated_at: now,
            expires_at: now.saturating_add_secs(duration),
        },
        (None, Some(cooldown)) => LifecycleState::Cooldown {
            cooldown_ends_at: now.saturating_add_secs(cooldown),
        },
        (None, None) => LifecycleState::Available,
    }
}

/// Demotes lapsed timers as of `now`.
///
/// Returns `None` when nothing changed. An item whose effect and cooldown
/// have both lapsed goes straight to `Available`, exactly as if refresh
/// had run at each boundary. Applying the result again with the same or
/// an earlier `now` returns `None`.
#[must_use]
pub fn settle(entry: &CatalogEntry, record: &OwnedPowerUp, now: Timestamp) -> Option<OwnedPowerUp> {
    let next = settled_state(entry, record.state, now);
    (next != record.state).then(|| OwnedPowerUp {
        state: next,
        ..record.clone()
    })
}

fn settled_state(entry: &CatalogEntry, state: LifecycleState, now: Timestamp) -> LifecycleState {
    let mut state = state;

    if let LifecycleState::Active { expires_at, .. } = state {
        if expires_at <= now {
            state = match entry.cooldown_secs {
                Some(cooldown) => LifecycleState::Cooldown {
                    cooldown_ends_at: expires_at.saturating_add_secs(cooldown),
                },
                None => LifecycleState::Available,
            };
        }
    }

    if let LifecycleState::Cooldown { cooldown_ends_at } = state {
        if cooldown_ends_at <= now {
            state = LifecycleState::Available;
        }
    }

    state
}

/// Gates an entry for this user.
///
/// # Errors
///
/// Returns `EffectInFlight` if the item is active or cooling down; a
/// running effect is irrevocable.
pub fn lock(record: &OwnedPowerUp) -> Result<OwnedPowerUp, GateError> {
    match record.state {
        LifecycleState::Available | LifecycleState::Locked => Ok(OwnedPowerUp {
            state: LifecycleState::Locked,
            ..record.clone()
        }),
        LifecycleState::Active { .. } | LifecycleState::Cooldown { .. } => {
            Err(GateError::EffectInFlight(record.catalog_id))
        }
    }
}

/// Lifts a gate. Records that are not locked are returned unchanged.
#[must_use]
pub fn unlock(record: &OwnedPowerUp) -> OwnedPowerUp {
    match record.state {
        LifecycleState::Locked => OwnedPowerUp {
            state: LifecycleState::Available,
            ..record.clone()
        },
        _ => record.clone(),
    }
}
