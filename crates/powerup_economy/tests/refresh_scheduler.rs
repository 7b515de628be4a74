//! Integration test for the background refresh scheduler.

use powerup_core::{ManualClock, Timestamp};
use powerup_economy::{
    CatalogEntry, EffectKind, LifecycleState, MemoryEngine, RefreshScheduler, SchedulerConfig,
    StaticCatalog,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    done()
}

#[test]
fn test_scheduler_settles_lapsed_timers() {
    let clock = ManualClock::new(Timestamp::EPOCH);
    let catalog = StaticCatalog::from_entries([CatalogEntry::new(
        1,
        "Vision",
        10,
        EffectKind::Vision,
    )
    .with_duration(1800)
    .with_cooldown(3600)])
    .unwrap();
    let engine = Arc::new(MemoryEngine::new(catalog, clock.clone()));
    engine.open_memory_account(1, 100).unwrap();
    engine.purchase(1, 1).unwrap();
    engine.use_power_up(1, 1).unwrap();

    let scheduler = RefreshScheduler::spawn(
        Arc::clone(&engine),
        &SchedulerConfig {
            refresh_interval_ms: 5,
        },
    );

    clock.set(Timestamp::from_secs(1900));
    assert!(wait_for(Duration::from_secs(5), || {
        engine.record(1, 1).map(|r| r.state)
            == Some(LifecycleState::Cooldown {
                cooldown_ends_at: Timestamp::from_secs(5400),
            })
    }));

    clock.set(Timestamp::from_secs(5400));
    assert!(wait_for(Duration::from_secs(5), || {
        engine.record(1, 1).map(|r| r.state) == Some(LifecycleState::Available)
    }));

    assert!(scheduler.passes() > 0);
    scheduler.shutdown();
}

#[test]
fn test_scheduler_stops_on_drop() {
    let clock = ManualClock::new(Timestamp::EPOCH);
    let engine = Arc::new(MemoryEngine::new(StaticCatalog::builtin(), clock));

    let scheduler = RefreshScheduler::spawn(
        Arc::clone(&engine),
        &SchedulerConfig {
            refresh_interval_ms: 1,
        },
    );
    assert!(wait_for(Duration::from_secs(5), || scheduler.passes() > 0));
    drop(scheduler);

    // The thread held the only other reference.
    assert!(wait_for(Duration::from_secs(5), || Arc::strong_count(&engine) == 1));
}
