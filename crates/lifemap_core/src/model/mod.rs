//! Domain model for the radial bubble layout.
//!
//! # Responsibility
//! - Define the bubble record consumed by layout, store and renderers.
//! - Define the storage-row shapes that hydrate bubbles.
//!
//! # Invariants
//! - Every bubble is identified by the stable id of its external entity.
//! - Polar and normalized coordinates of a `Position` always agree.

pub mod bubble;
pub mod rows;
