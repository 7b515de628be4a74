//! # Power-Up Registry
//!
//! Stores one [`OwnedPowerUp`] per catalog entry for a single user.
//!
//! `get` has get-or-create semantics: an entry the user never touched
//! reads as its default record. The default is only stored once the
//! engine writes it back after a successful operation, so a rejected call
//! never leaves a new record behind.

use std::collections::BTreeMap;

use crate::catalog::CatalogEntry;
use crate::state::OwnedPowerUp;
use powerup_core::PowerUpId;

/// Per-user record store.
pub trait Registry: Send {
    /// Returns the stored record for `entry`, or its default.
    fn get(&self, entry: &CatalogEntry) -> OwnedPowerUp;

    /// Replaces the stored record.
    fn set(&mut self, record: OwnedPowerUp);

    /// Every stored record, ordered by catalog id.
    fn records(&self) -> Vec<OwnedPowerUp>;
}

/// In-memory registry.
#[derive(Clone, Debug, Default)]
pub struct MemoryRegistry {
    records: BTreeMap<PowerUpId, OwnedPowerUp>,
}

impl MemoryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Registry for MemoryRegistry {
    fn get(&self, entry: &CatalogEntry) -> OwnedPowerUp {
        self.records
            .get(&entry.id)
            .cloned()
            .unwrap_or_else(|| OwnedPowerUp::for_entry(entry))
    }

    fn set(&mut self, record: OwnedPowerUp) {
        self.records.insert(record.catalog_id, record);
    }

    fn records(&self) -> Vec<OwnedPowerUp> {
        self.records.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::EffectKind;
    use crate::state::LifecycleState;

    #[test]
    fn test_get_absent_returns_default_without_storing() {
        let registry = MemoryRegistry::new();
        let entry = CatalogEntry::new(4, "Boost", 10, EffectKind::Boost);

        let record = registry.get(&entry);
        assert_eq!(record, OwnedPowerUp::new(4));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_replaces_whole_record() {
        let mut registry = MemoryRegistry::new();
        let entry = CatalogEntry::new(4, "Boost", 10, EffectKind::Boost);

        let mut record = registry.get(&entry);
        record.owned = true;
        record.quantity = 3;
        record.purchased_total = 3;
        registry.set(record.clone());

        assert_eq!(registry.get(&entry), record);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_records_ordered_by_id() {
        let mut registry = MemoryRegistry::new();
        registry.set(OwnedPowerUp::new(9));
        registry.set(OwnedPowerUp::new(2));
        registry.set(OwnedPowerUp::new(5));

        let ids: Vec<_> = registry.records().iter().map(|r| r.catalog_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_gated_default_is_locked() {
        let registry = MemoryRegistry::new();
        let entry = CatalogEntry::new(4, "Boost", 10, EffectKind::Boost).gated();
        assert_eq!(registry.get(&entry).state, LifecycleState::Locked);
    }
}
