//! # Power-Up Core
//!
//! Primitives shared by the power-up crates.
//!
//! ## Contents
//!
//! 1. **Identifiers** - users and catalog entries
//! 2. **Timestamps** - absolute seconds since the Unix epoch
//! 3. **Clocks** - the only source of "now" the engine ever consults
//!
//! Every timed transition in the engine is computed from absolute
//! timestamps, never from tick counts, so a late or repeated refresh
//! cannot drift.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod clock;
pub mod ids;
pub mod time;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::{PowerUpId, UserId};
pub use time::Timestamp;
