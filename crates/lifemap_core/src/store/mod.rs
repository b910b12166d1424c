//! Live bubble state owned by the caller.
//!
//! # Responsibility
//! - Hold the live bubble map and the manual override cache together.
//! - Expose every mutation as a method so the cache never drifts from the
//!   map.
//!
//! # Invariants
//! - Operations are synchronous and in-memory; none of them return errors.
//! - After any mutating call except `update_position`, the live map is the
//!   output of a full reconciliation pass.
//! - Concurrent writers are merged only at `hydrate`: last write wins, with
//!   non-`Auto` live bubbles taking precedence over refreshed rows.

mod bubble_store;

pub use bubble_store::{BubbleStore, NextAngleQuery, OverrideEntry, PositionInput};
