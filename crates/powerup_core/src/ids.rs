//! Identifier types.

/// Identifier of a user account.
pub type UserId = u64;

/// Identifier of a catalog entry (power-up definition).
pub type PowerUpId = u32;
