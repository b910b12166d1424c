//! Radial bubble layout engine.
//!
//! # Responsibility
//! - Place every bubble on its kind's ring at a stable angle.
//! - Keep siblings clustered near their owner and apart from each other.
//! - Leave locked and manually placed bubbles exactly where they are.
//!
//! # Invariants
//! - Deterministic: identical input maps produce identical output maps.
//! - Idempotent: reconciling a reconciled map changes nothing.
//! - Non-`Auto` bubbles are never moved or resized by reconciliation.
//!
//! Submodules:
//! - geometry: polar/normalized conversions and angle arithmetic
//! - rings: per-kind radius and base size
//! - allocator: first angle for a new bubble among placed siblings
//! - spread: even spacing of one sibling cluster
//! - reconcile: full-map layout pass

use crate::model::bubble::BubbleKind;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

pub mod allocator;
pub mod geometry;
pub mod reconcile;
pub mod rings;
pub mod spread;

pub use allocator::next_angle;
pub use geometry::{
    angle_difference, normalize_angle, normalized_to_polar, polar_to_normalized,
    signed_angle_difference, NormalizedPoint, PolarPoint, CANVAS_SIZE,
};
pub use reconcile::reconcile;
pub use rings::{RingSpec, RingTable};
pub use spread::spread_cluster;

/// Tuning constants for reconciliation and angle allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Minimum angular gap between neighbours of one spread cluster.
    pub min_spacing: f64,
    /// Wedge for projects/processes around their area.
    pub project_wedge: f64,
    /// Wedge for tasks/ideas around their parent project/process.
    pub parent_cluster_wedge: f64,
    /// Wedge for tasks/ideas around their area when they have no parent.
    pub area_cluster_wedge: f64,
    /// Wedge for bubbles with no owner at all.
    pub ungrouped_wedge: f64,
    /// Anchor for ownerless clusters and the first area slot.
    pub ungrouped_anchor: f64,
    /// Allocator gaps at or below this width are ignored.
    pub min_allocator_gap: f64,
    /// Penalty per radian of distance from the anchor when scoring gaps.
    pub anchor_proximity_weight: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_spacing: 0.2,
            project_wedge: PI / 6.0,
            parent_cluster_wedge: PI / 8.0,
            area_cluster_wedge: PI / 7.0,
            ungrouped_wedge: TAU - 0.2,
            ungrouped_anchor: -FRAC_PI_2,
            min_allocator_gap: 0.01,
            anchor_proximity_weight: 0.1,
        }
    }
}

impl LayoutConfig {
    /// Allocator wedge used when a creation flow does not pass one.
    pub fn default_wedge(&self, kind: BubbleKind) -> f64 {
        match kind {
            BubbleKind::Area | BubbleKind::Vision => TAU,
            BubbleKind::Project | BubbleKind::Process => FRAC_PI_2,
            BubbleKind::Task => PI / 4.0,
            BubbleKind::Idea => PI / 3.0,
        }
    }
}
