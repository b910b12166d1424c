//! Repository contracts and SQLite implementations.
//!
//! # Responsibility
//! - Keep SQL details for the override cache behind a trait.
//!
//! # Invariants
//! - Read paths reject invalid persisted rows instead of masking them.

pub mod override_repo;
