//! # Currency Ledger
//!
//! One non-negative balance per user. Only the engine writes it, and only
//! while holding the owning account's lock, so `debit`'s
//! check-then-subtract is a single step from every other caller's point
//! of view.

/// A single-currency balance.
pub trait Ledger: Send {
    /// Current balance.
    fn balance(&self) -> u64;

    /// Adds `amount`. Cannot fail.
    fn credit(&mut self, amount: u64);

    /// Subtracts `amount` if the balance covers it.
    ///
    /// Returns `false` and leaves the balance untouched otherwise.
    fn debit(&mut self, amount: u64) -> bool;
}

/// In-memory ledger.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryLedger {
    balance: u64,
}

impl MemoryLedger {
    /// Creates a ledger with an opening balance.
    #[inline]
    #[must_use]
    pub const fn new(opening_balance: u64) -> Self {
        Self {
            balance: opening_balance,
        }
    }
}

impl Ledger for MemoryLedger {
    #[inline]
    fn balance(&self) -> u64 {
        self.balance
    }

    #[inline]
    fn credit(&mut self, amount: u64) {
        // Never wraps.
        self.balance = self.balance.saturating_add(amount);
    }

    #[inline]
    fn debit(&mut self, amount: u64) -> bool {
        match self.balance.checked_sub(amount) {
            Some(rest) => {
                self.balance = rest;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_exact_balance() {
        let mut ledger = MemoryLedger::new(100);
        assert!(ledger.debit(100));
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn test_debit_insufficient_leaves_balance() {
        let mut ledger = MemoryLedger::new(100);
        assert!(!ledger.debit(150));
        assert_eq!(ledger.balance(), 100);
    }

    #[test]
    fn test_debit_zero_always_succeeds() {
        let mut ledger = MemoryLedger::default();
        assert!(ledger.debit(0));
        assert_eq!(ledger.balance(), 0);
    }

    #[test]
    fn test_credit_saturates() {
        let mut ledger = MemoryLedger::new(u64::MAX - 1);
        ledger.credit(10);
        assert_eq!(ledger.balance(), u64::MAX);
    }
}
