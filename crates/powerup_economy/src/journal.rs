//! # Transaction Journal
//!
//! Audit trail of purchases, uses and credits.
//!
//! The engine appends while it still holds the user's account lock, so a
//! user's history is ordered exactly like the changes it records. Appends
//! must be quick. The in-memory journal is a bounded ring: when full, the
//! oldest entry is dropped. Durable storage belongs behind the [`Journal`]
//! trait, buffered so `append` does not wait on I/O.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use powerup_core::{PowerUpId, Timestamp, UserId};

/// Default number of history entries returned.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Kind of journaled transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Units bought.
    Purchase,
    /// One unit used.
    Use,
    /// Currency credited.
    Credit,
}

/// Where a power-up was used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageContext {
    /// The exercise the power-up was used in.
    pub exercise_id: String,
    /// Free-text detail, e.g. which question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl UsageContext {
    /// Context for a use in `exercise_id`.
    #[must_use]
    pub fn new(exercise_id: impl Into<String>) -> Self {
        Self {
            exercise_id: exercise_id.into(),
            note: None,
        }
    }

    /// Adds a free-text note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A transaction to journal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalRecord {
    /// The user.
    pub user: UserId,
    /// What happened.
    pub kind: TransactionKind,
    /// The power-up involved, if any.
    pub catalog_id: Option<PowerUpId>,
    /// Stock change: positive on purchase, negative on use.
    pub quantity: i64,
    /// Currency moved.
    pub amount: u64,
    /// When it happened.
    pub at: Timestamp,
    /// Where a use happened, if the caller said.
    pub context: Option<UsageContext>,
}

/// A journaled transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    /// Monotonic sequence number, unique per journal.
    pub seq: u64,
    /// The user.
    pub user: UserId,
    /// What happened.
    pub kind: TransactionKind,
    /// The power-up involved, if any.
    pub catalog_id: Option<PowerUpId>,
    /// Stock change.
    pub quantity: i64,
    /// Currency moved.
    pub amount: u64,
    /// When it happened.
    pub at: Timestamp,
    /// Where a use happened, if the caller said.
    pub context: Option<UsageContext>,
}

/// Append-only transaction log.
pub trait Journal: Send + Sync {
    /// Appends a transaction and returns its sequence number.
    fn append(&self, record: JournalRecord) -> u64;

    /// Up to `limit` entries for `user`, newest first.
    fn history(&self, user: UserId, limit: usize) -> Vec<JournalEntry>;
}

/// Configuration for the in-memory journal.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Entries kept before the oldest is evicted.
    pub capacity: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { capacity: 10_000 }
    }
}

impl JournalConfig {
    /// Production config: room for a busy day of a few thousand users.
    #[must_use]
    pub const fn production() -> Self {
        Self { capacity: 100_000 }
    }
}

/// Bounded in-memory journal.
#[derive(Debug)]
pub struct MemoryJournal {
    capacity: usize,
    entries: Mutex<VecDeque<JournalEntry>>,
    next_seq: AtomicU64,
}

impl MemoryJournal {
    /// Creates a journal holding at most `config.capacity` entries.
    #[must_use]
    pub fn new(config: &JournalConfig) -> Self {
        let capacity = config.capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new(&JournalConfig::default())
    }
}

impl Journal for MemoryJournal {
    fn append(&self, record: JournalRecord) -> u64 {
        let mut entries = self.entries.lock();
        // Allocate under the lock so the ring stays in sequence order.
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(JournalEntry {
            seq,
            user: record.user,
            kind: record.kind,
            catalog_id: record.catalog_id,
            quantity: record.quantity,
            amount: record.amount,
            at: record.at,
            context: record.context,
        });
        seq
    }

    fn history(&self, user: UserId, limit: usize) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .iter()
            .rev()
            .filter(|e| e.user == user)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn purchase(user: UserId, at: u64) -> JournalRecord {
        JournalRecord {
            user,
            kind: TransactionKind::Purchase,
            catalog_id: Some(1),
            quantity: 1,
            amount: 15,
            at: Timestamp::from_secs(at),
            context: None,
        }
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let journal = MemoryJournal::default();
        let a = journal.append(purchase(1, 0));
        let b = journal.append(purchase(1, 1));
        assert!(b > a);
    }

    #[test]
    fn test_history_newest_first_per_user() {
        let journal = MemoryJournal::default();
        journal.append(purchase(1, 10));
        journal.append(purchase(2, 20));
        journal.append(purchase(1, 30));

        let history = journal.history(1, DEFAULT_HISTORY_LIMIT);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].at, Timestamp::from_secs(30));
        assert_eq!(history[1].at, Timestamp::from_secs(10));
    }

    #[test]
    fn test_history_limit() {
        let journal = MemoryJournal::default();
        for t in 0..10 {
            journal.append(purchase(1, t));
        }
        assert_eq!(journal.history(1, 3).len(), 3);
    }

    #[test]
    fn test_usage_context_kept() {
        let journal = MemoryJournal::default();
        journal.append(JournalRecord {
            kind: TransactionKind::Use,
            quantity: -1,
            amount: 0,
            context: Some(UsageContext::new("ex-12").with_note("question 3")),
            ..purchase(1, 5)
        });

        let history = journal.history(1, 1);
        let context = history[0].context.as_ref().unwrap();
        assert_eq!(context.exercise_id, "ex-12");
        assert_eq!(context.note.as_deref(), Some("question 3"));
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let journal = MemoryJournal::new(&JournalConfig { capacity: 3 });
        for t in 0..5 {
            journal.append(purchase(1, t));
        }
        assert_eq!(journal.len(), 3);
        let oldest = journal.history(1, 10).last().map(|e| e.at);
        assert_eq!(oldest, Some(Timestamp::from_secs(2)));
    }
}
