//! # Owned Power-Up Records
//!
//! Per-user mutable state for one catalog entry.
//!
//! The lifecycle state is an enum carrying its own timestamps, so an
//! `Active` item without an expiry, or an item that is both running and
//! recharging, cannot be constructed at all.

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogEntry;
use crate::error::InvariantViolation;
use powerup_core::{PowerUpId, Timestamp};

/// Where a power-up is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LifecycleState {
    /// Can be bought and, with stock, used.
    #[default]
    Available,
    /// A timed effect is running.
    Active {
        /// When the running effect started.
        activated_at: Timestamp,
        /// When it ends.
        expires_at: Timestamp,
    },
    /// Recharging; cannot be used.
    Cooldown {
        /// When the item becomes available again.
        cooldown_ends_at: Timestamp,
    },
    /// Gated for this user; cannot be bought or used.
    Locked,
}

impl LifecycleState {
    /// Short lowercase name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Active { .. } => "active",
            Self::Cooldown { .. } => "cooldown",
            Self::Locked => "locked",
        }
    }

    /// Start of the running effect, if any.
    #[inline]
    #[must_use]
    pub const fn activated_at(&self) -> Option<Timestamp> {
        match self {
            Self::Active { activated_at, .. } => Some(*activated_at),
            _ => None,
        }
    }

    /// End of the running effect, if any.
    #[inline]
    #[must_use]
    pub const fn expires_at(&self) -> Option<Timestamp> {
        match self {
            Self::Active { expires_at, .. } => Some(*expires_at),
            _ => None,
        }
    }

    /// End of the cooldown, if any.
    #[inline]
    #[must_use]
    pub const fn cooldown_ends_at(&self) -> Option<Timestamp> {
        match self {
            Self::Cooldown { cooldown_ends_at } => Some(*cooldown_ends_at),
            _ => None,
        }
    }

    /// True while an effect is running or recharging.
    #[inline]
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Active { .. } | Self::Cooldown { .. })
    }
}

/// A user's record for one catalog entry.
///
/// Records are replaced whole: read one, derive the next one, write it
/// back. Nothing mutates a stored record in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedPowerUp {
    /// The catalog entry this record belongs to.
    pub catalog_id: PowerUpId,
    /// Units in stock.
    pub quantity: u32,
    /// Successful uses so far. Never decreases.
    pub usage_count: u32,
    /// Set by the first purchase and never cleared.
    pub owned: bool,
    /// Units ever bought. Never decreases.
    pub purchased_total: u32,
    /// Currency ever spent on this entry. Never decreases.
    pub spent_total: u64,
    /// Lifecycle state.
    pub state: LifecycleState,
}

impl OwnedPowerUp {
    /// A fresh, never-bought record.
    #[must_use]
    pub const fn new(catalog_id: PowerUpId) -> Self {
        Self {
            catalog_id,
            quantity: 0,
            usage_count: 0,
            owned: false,
            purchased_total: 0,
            spent_total: 0,
            state: LifecycleState::Available,
        }
    }

    /// The default record for an entry: `Locked` if the entry is gated.
    #[must_use]
    pub fn for_entry(entry: &CatalogEntry) -> Self {
        let mut record = Self::new(entry.id);
        if entry.locked {
            record.state = LifecycleState::Locked;
        }
        record
    }

    /// True if the record should appear in the owned inventory.
    #[inline]
    #[must_use]
    pub const fn is_held(&self) -> bool {
        self.quantity > 0 || self.usage_count > 0
    }

    /// Checks every lifecycle invariant against the record's entry.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn check_invariants(&self, entry: &CatalogEntry) -> Result<(), InvariantViolation> {
        let id = self.catalog_id;
        if id != entry.id {
            return Err(InvariantViolation::WrongEntry {
                record: id,
                entry: entry.id,
            });
        }

        match self.state {
            LifecycleState::Active {
                activated_at,
                expires_at,
            } => {
                let Some(duration) = entry.duration_secs else {
                    return Err(InvariantViolation::ActiveWithoutDuration(id));
                };
                if activated_at.saturating_add_secs(duration) != expires_at {
                    return Err(InvariantViolation::ExpiryMismatch(id));
                }
            }
            LifecycleState::Cooldown { .. } if !entry.has_cooldown() => {
                return Err(InvariantViolation::CooldownWithoutPeriod(id));
            }
            _ => {}
        }

        if !self.owned {
            if self.state.is_in_flight() {
                return Err(InvariantViolation::InFlightWithoutOwnership(id));
            }
            if self.is_held() {
                return Err(InvariantViolation::StockWithoutOwnership(id));
            }
        }

        if u64::from(self.quantity) + u64::from(self.usage_count) != u64::from(self.purchased_total)
        {
            return Err(InvariantViolation::StockMismatch {
                id,
                quantity: self.quantity,
                usages: self.usage_count,
                purchased: self.purchased_total,
            });
        }

        if let Some(limit) = entry.max_usages {
            if self.usage_count > limit {
                return Err(InvariantViolation::UsageOverLimit {
                    id,
                    usages: self.usage_count,
                    limit,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EffectKind;

    fn timed_entry() -> CatalogEntry {
        CatalogEntry::new(7, "Focus", 100, EffectKind::Vision)
            .with_duration(1800)
            .with_cooldown(3600)
    }

    #[test]
    fn test_fresh_record_is_valid() {
        let entry = timed_entry();
        let record = OwnedPowerUp::for_entry(&entry);
        assert_eq!(record.state, LifecycleState::Available);
        record.check_invariants(&entry).unwrap();
    }

    #[test]
    fn test_gated_entry_starts_locked() {
        let entry = timed_entry().gated();
        assert_eq!(OwnedPowerUp::for_entry(&entry).state, LifecycleState::Locked);
    }

    #[test]
    fn test_state_accessors_are_exclusive() {
        let active = LifecycleState::Active {
            activated_at: Timestamp::from_secs(0),
            expires_at: Timestamp::from_secs(1800),
        };
        assert_eq!(active.expires_at(), Some(Timestamp::from_secs(1800)));
        assert_eq!(active.cooldown_ends_at(), None);

        let cooling = LifecycleState::Cooldown {
            cooldown_ends_at: Timestamp::from_secs(5400),
        };
        assert_eq!(cooling.expires_at(), None);
        assert_eq!(cooling.activated_at(), None);
        assert_eq!(cooling.cooldown_ends_at(), Some(Timestamp::from_secs(5400)));
    }

    #[test]
    fn test_active_on_instant_entry_is_violation() {
        let entry = CatalogEntry::new(1, "Hint", 15, EffectKind::Hint);
        let mut record = OwnedPowerUp::new(1);
        record.owned = true;
        record.purchased_total = 1;
        record.usage_count = 1;
        record.state = LifecycleState::Active {
            activated_at: Timestamp::from_secs(0),
            expires_at: Timestamp::from_secs(10),
        };
        assert_eq!(
            record.check_invariants(&entry),
            Err(InvariantViolation::ActiveWithoutDuration(1))
        );
    }

    #[test]
    fn test_stock_mismatch_detected() {
        let entry = timed_entry();
        let mut record = OwnedPowerUp::new(7);
        record.owned = true;
        record.quantity = 2;
        record.purchased_total = 1;
        assert!(matches!(
            record.check_invariants(&entry),
            Err(InvariantViolation::StockMismatch { .. })
        ));
    }

    #[test]
    fn test_serialized_state_is_tagged() {
        let state = LifecycleState::Cooldown {
            cooldown_ends_at: Timestamp::from_secs(42),
        };
        let text = toml::to_string(&OwnedPowerUp {
            state,
            ..OwnedPowerUp::new(3)
        })
        .unwrap();
        assert!(text.contains("status = \"cooldown\""));
        assert!(text.contains("cooldown_ends_at = 42"));
    }
}
