//! Radial bubble-layout engine for the life map.
//! Owns placement rules; storage and rendering stay with the caller.

pub mod db;
pub mod layout;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use layout::{next_angle, reconcile, spread_cluster, LayoutConfig, RingSpec, RingTable};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::bubble::{
    Bubble, BubbleId, BubbleKind, KindParseError, Placement, Position, PositionUpdate,
};
pub use model::rows::{HydrationSnapshot, ItemRow, LifeAreaRow, StoredPosition, WorkstreamRow};
pub use repo::override_repo::{
    OverrideRepository, RepoError, RepoResult, SqliteOverrideRepository,
};
pub use service::drop_service::{handle_drop, AssignmentChange, DropOutcome, DropTarget};
pub use service::override_service::OverrideService;
pub use store::{BubbleStore, NextAngleQuery, OverrideEntry, PositionInput};

/// Minimal health-check API for embedding shells.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
