//! # Inventory Projection
//!
//! Read-only views derived from a user's registry records. Nothing here
//! is cached: every view is recomputed from the records it is given, so
//! it cannot drift from the registry.

use serde::Serialize;

use crate::catalog::{Catalog, EffectKind};
use crate::state::{LifecycleState, OwnedPowerUp};
use powerup_core::{PowerUpId, Timestamp};

/// A running effect.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActiveEffect {
    /// The power-up.
    pub catalog_id: PowerUpId,
    /// What it does.
    pub effect_kind: EffectKind,
    /// How strongly.
    pub effect_magnitude: f64,
    /// When it ends.
    pub expires_at: Timestamp,
    /// `max(0, expires_at - now)`.
    pub remaining_secs: u64,
}

/// An item that is recharging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CoolingDown {
    /// The power-up.
    pub catalog_id: PowerUpId,
    /// When it becomes available.
    pub cooldown_ends_at: Timestamp,
    /// `max(0, cooldown_ends_at - now)`.
    pub remaining_secs: u64,
}

/// Everything a display collaborator needs about a user's power-ups.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InventoryView {
    /// Records with stock or past usage.
    pub owned: Vec<OwnedPowerUp>,
    /// Running effects.
    pub active: Vec<ActiveEffect>,
    /// Recharging items.
    pub cooling_down: Vec<CoolingDown>,
    /// Sum of `usage_count` over `owned`.
    pub total_usages: u64,
    /// Currency ever spent on power-ups.
    pub total_spent: u64,
}

/// Builds the inventory view as of `now`.
///
/// Records whose catalog entry no longer exists still count as owned,
/// but their effects are not reported as active.
#[must_use]
pub fn project<C: Catalog + ?Sized>(
    records: &[OwnedPowerUp],
    catalog: &C,
    now: Timestamp,
) -> InventoryView {
    let mut view = InventoryView::default();

    for record in records {
        view.total_spent = view.total_spent.saturating_add(record.spent_total);

        match record.state {
            LifecycleState::Active { expires_at, .. } => {
                if let Some(entry) = catalog.get(record.catalog_id) {
                    view.active.push(ActiveEffect {
                        catalog_id: record.catalog_id,
                        effect_kind: entry.effect_kind.clone(),
                        effect_magnitude: entry.effect_magnitude,
                        expires_at,
                        remaining_secs: expires_at.saturating_secs_since(now),
                    });
                }
            }
            LifecycleState::Cooldown { cooldown_ends_at } => {
                view.cooling_down.push(CoolingDown {
                    catalog_id: record.catalog_id,
                    cooldown_ends_at,
                    remaining_secs: cooldown_ends_at.saturating_secs_since(now),
                });
            }
            LifecycleState::Available | LifecycleState::Locked => {}
        }

        if record.is_held() {
            view.total_usages += u64::from(record.usage_count);
            view.owned.push(record.clone());
        }
    }

    view
}

/// Per-entry usage numbers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntryStats {
    /// The power-up.
    pub catalog_id: PowerUpId,
    /// Units bought.
    pub purchased: u32,
    /// Units used.
    pub used: u32,
    /// Units in stock.
    pub available: u32,
    /// Currency spent.
    pub spent: u64,
}

/// Aggregate usage statistics for one user.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UsageStats {
    /// Units bought across all entries.
    pub total_purchased: u64,
    /// Units used across all entries.
    pub total_used: u64,
    /// Currency spent across all entries.
    pub total_spent: u64,
    /// `total_used / total_purchased` as a percentage, two decimals.
    pub usage_rate_percent: f64,
    /// Entry with the most uses; lowest id wins ties.
    pub most_used: Option<PowerUpId>,
    /// Breakdown by entry, in catalog id order.
    pub by_entry: Vec<EntryStats>,
}

/// Aggregates usage statistics over a user's records.
#[must_use]
pub fn usage_stats(records: &[OwnedPowerUp]) -> UsageStats {
    let mut stats = UsageStats::default();
    let mut best_uses = 0;

    for record in records.iter().filter(|r| r.owned) {
        stats.total_purchased += u64::from(record.purchased_total);
        stats.total_used += u64::from(record.usage_count);
        stats.total_spent = stats.total_spent.saturating_add(record.spent_total);

        if record.usage_count > best_uses {
            best_uses = record.usage_count;
            stats.most_used = Some(record.catalog_id);
        }

        stats.by_entry.push(EntryStats {
            catalog_id: record.catalog_id,
            purchased: record.purchased_total,
            used: record.usage_count,
            available: record.quantity,
            spent: record.spent_total,
        });
    }

    if stats.total_purchased > 0 {
        #[allow(clippy::cast_precision_loss)]
        let rate = stats.total_used as f64 / stats.total_purchased as f64 * 100.0;
        stats.usage_rate_percent = (rate * 100.0).round() / 100.0;
    }

    stats
}
