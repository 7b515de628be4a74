//! Randomized operation sequences against the engine.
//!
//! Every record must satisfy its invariants after every step, whatever
//! mix of purchases, uses, refreshes and clock jumps came before.

use powerup_core::{Clock, ManualClock, PowerUpId, Timestamp, UserId};
use powerup_economy::{
    Catalog, CatalogEntry, EffectKind, MemoryEngine, PurchaseError, StaticCatalog, UseError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

const IDS: [PowerUpId; 4] = [1, 2, 3, 4];

fn catalog() -> StaticCatalog {
    StaticCatalog::from_entries([
        CatalogEntry::new(1, "Hint", 5, EffectKind::Hint),
        CatalogEntry::new(2, "Vision", 20, EffectKind::Vision)
            .with_duration(300)
            .with_cooldown(600),
        CatalogEntry::new(3, "Retry", 15, EffectKind::Retry).with_cooldown(120),
        CatalogEntry::new(4, "Boost", 8, EffectKind::Boost)
            .with_duration(60)
            .with_max_usages(3),
    ])
    .unwrap()
}

fn assert_all_invariants(engine: &MemoryEngine<StaticCatalog, ManualClock>, user: UserId) {
    for id in IDS {
        let entry = engine.catalog().get(id).unwrap();
        let record = engine.record(user, id).unwrap();
        assert_eq!(record.check_invariants(entry), Ok(()), "record {record:?}");
    }
}

#[test]
fn random_sequences_preserve_invariants() {
    for seed in 0..16u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let clock = ManualClock::new(Timestamp::EPOCH);
        let engine = MemoryEngine::new(catalog(), clock.clone());
        let user: UserId = 1;
        engine.open_memory_account(user, 500).unwrap();

        let mut usages: HashMap<PowerUpId, u32> = HashMap::new();
        let mut expected_balance: u64 = 500;

        for _ in 0..400 {
            let id = IDS[rng.gen_range(0..IDS.len())];
            match rng.gen_range(0..5) {
                0 => {
                    let quantity = rng.gen_range(1..4);
                    match engine.purchase_many(user, id, quantity) {
                        Ok(_) => {
                            let price = engine.catalog().get(id).unwrap().price;
                            expected_balance -= price * u64::from(quantity);
                        }
                        Err(PurchaseError::InsufficientFunds { .. }) => {}
                        Err(other) => panic!("unexpected purchase error: {other}"),
                    }
                }
                1 | 2 => match engine.use_power_up(user, id) {
                    Ok(record) => {
                        let seen = usages.entry(id).or_default();
                        assert_eq!(record.usage_count, *seen + 1);
                        *seen = record.usage_count;
                    }
                    Err(
                        UseError::NotOwned(_)
                        | UseError::OnCooldown { .. }
                        | UseError::AlreadyActive { .. }
                        | UseError::UsageLimitReached { .. },
                    ) => {}
                    Err(other) => panic!("unexpected use error: {other}"),
                },
                3 => {
                    clock.advance(rng.gen_range(0..900));
                }
                _ => {
                    let first = engine.refresh(user, clock.now());
                    let second = engine.refresh(user, clock.now());
                    assert!(first <= IDS.len());
                    assert_eq!(second, 0);
                }
            }

            if rng.gen_bool(0.05) {
                let amount = rng.gen_range(0..50);
                engine.credit(user, amount).unwrap();
                expected_balance += amount;
            }

            assert_eq!(engine.balance(user), Ok(expected_balance));
            assert_all_invariants(&engine, user);
        }

        let stats = engine.stats(user).unwrap();
        let usage_total: u64 = usages.values().map(|u| u64::from(*u)).sum();
        assert_eq!(stats.total_used, usage_total);
        assert_eq!(stats.total_spent, 500 + credited(&engine, user) - expected_balance);
    }
}

fn credited(engine: &MemoryEngine<StaticCatalog, ManualClock>, user: UserId) -> u64 {
    engine
        .history(user, usize::MAX)
        .iter()
        .filter(|e| e.catalog_id.is_none())
        .map(|e| e.amount)
        .sum()
}

#[test]
fn concurrent_purchases_never_overdraw() {
    let clock = ManualClock::new(Timestamp::EPOCH);
    let engine = Arc::new(MemoryEngine::new(catalog(), clock));
    let user: UserId = 9;
    engine.open_memory_account(user, 1_000).unwrap();

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let mut rng = ChaCha8Rng::seed_from_u64(t);
                let mut bought = 0u64;
                for _ in 0..200 {
                    let id = IDS[rng.gen_range(0..IDS.len())];
                    if engine.purchase(user, id).is_ok() {
                        bought += engine.catalog().get(id).unwrap().price;
                    }
                    let _ = engine.use_power_up(user, id);
                }
                bought
            })
        })
        .collect();

    let spent: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(engine.balance(user), Ok(1_000 - spent));
    assert_eq!(engine.stats(user).unwrap().total_spent, spent);
    assert_all_invariants(&engine, user);
}
