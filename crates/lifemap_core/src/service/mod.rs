//! Use-case services layered over the bubble store.
//!
//! # Responsibility
//! - Orchestrate store operations into user-facing flows (drag release).
//! - Bridge the in-memory override cache to repository persistence.
//!
//! # Invariants
//! - Services never mutate bubbles except through `BubbleStore` methods.

pub mod drop_service;
pub mod override_service;
