//! Drag-release handling.
//!
//! # Responsibility
//! - Resolve which ring a bubble was released on.
//! - Turn the release into reassignment, promotion or a plain move.
//!
//! # Invariants
//! - The drop ring is the configured ring radius nearest to the release
//!   distance from the canvas center.
//! - Only tasks and ideas are reassigned; everything else just moves on
//!   its own ring.
//! - A plain move pins the bubble as a manual override, so later area
//!   drags leave it where the user put it.
//! - A reassigned bubble keeps its parent only if the parent lives in the
//!   new area.

use crate::layout::geometry::normalized_to_polar;
use crate::layout::RingTable;
use crate::model::bubble::{BubbleId, BubbleKind, PositionUpdate};
use crate::store::{BubbleStore, PositionInput};
use log::info;
use serde::{Deserialize, Serialize};

/// Ring a bubble was released on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropTarget {
    AreaRing,
    ProjectRing,
    TaskRing,
    IdeaRing,
}

/// Ownership change caused by a drop, for the caller to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum AssignmentChange {
    ConvertedToTask {
        area_ref: Option<BubbleId>,
        parent_ref: Option<BubbleId>,
    },
    AttachedToParent { parent_ref: BubbleId, area_ref: Option<BubbleId> },
    MovedToArea { area_ref: BubbleId, parent_ref: Option<BubbleId> },
}

/// Everything a drag release changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropOutcome {
    pub target: DropTarget,
    pub updates: Vec<PositionUpdate>,
    pub assignment: Option<AssignmentChange>,
}

/// Picks the ring whose radius is closest to `distance`. Ties go to the
/// inner ring.
pub fn drop_target(rings: &RingTable, distance: f64) -> DropTarget {
    let candidates = [
        (DropTarget::AreaRing, BubbleKind::Area),
        (DropTarget::ProjectRing, BubbleKind::Project),
        (DropTarget::TaskRing, BubbleKind::Task),
        (DropTarget::IdeaRing, BubbleKind::Idea),
    ];
    let mut best = DropTarget::AreaRing;
    let mut best_gap = f64::INFINITY;
    for (target, kind) in candidates {
        let gap = (rings.radius(kind) - distance).abs();
        if gap < best_gap {
            best_gap = gap;
            best = target;
        }
    }
    best
}

/// Applies a drag release of bubble `id` at normalized `(x, y)`.
///
/// Returns `None` for unknown bubbles and non-finite coordinates.
pub fn handle_drop(store: &mut BubbleStore, id: BubbleId, x: f64, y: f64) -> Option<DropOutcome> {
    let bubble = store.get(id)?;
    let polar = normalized_to_polar(x, y)?;
    let target = drop_target(store.rings(), polar.ring);
    let (kind, area_ref, parent_ref) = (bubble.kind, bubble.area_ref, bubble.parent_ref);
    let angle = polar.angle;

    let outcome = match (kind, target) {
        (BubbleKind::Idea, DropTarget::TaskRing) => {
            let area = store
                .nearest(&[BubbleKind::Area], angle, None)
                .map(|area| area.id)
                .or(area_ref);
            let parent = parent_within(store, parent_ref, area);
            store.reassign(id, area, parent);
            let updates = store.convert_idea_to_task(id).into_iter().collect();
            DropOutcome {
                target,
                updates,
                assignment: Some(AssignmentChange::ConvertedToTask {
                    area_ref: area,
                    parent_ref: parent,
                }),
            }
        }
        (BubbleKind::Task | BubbleKind::Idea, DropTarget::ProjectRing) => {
            let nearest = store
                .nearest(&[BubbleKind::Project, BubbleKind::Process], angle, area_ref)
                .map(|parent| (parent.id, parent.area_ref));
            match nearest {
                Some((parent, parent_area)) => {
                    let area = parent_area.or(area_ref);
                    let updates = store.reassign(id, area, Some(parent)).into_iter().collect();
                    DropOutcome {
                        target,
                        updates,
                        assignment: Some(AssignmentChange::AttachedToParent {
                            parent_ref: parent,
                            area_ref: area,
                        }),
                    }
                }
                None => reposition(store, id, kind, angle, target),
            }
        }
        (BubbleKind::Task | BubbleKind::Idea, DropTarget::AreaRing) => {
            match store.nearest(&[BubbleKind::Area], angle, None).map(|area| area.id) {
                Some(area) => {
                    let parent = parent_within(store, parent_ref, Some(area));
                    let updates = store.reassign(id, Some(area), parent).into_iter().collect();
                    DropOutcome {
                        target,
                        updates,
                        assignment: Some(AssignmentChange::MovedToArea {
                            area_ref: area,
                            parent_ref: parent,
                        }),
                    }
                }
                None => reposition(store, id, kind, angle, target),
            }
        }
        _ => reposition(store, id, kind, angle, target),
    };

    info!(
        "event=bubble_drop module=service status=ok bubble_id={} kind={} target={:?} updates={} reassigned={}",
        id,
        kind,
        target,
        outcome.updates.len(),
        outcome.assignment.is_some()
    );
    Some(outcome)
}

/// Keeps `parent_ref` only when that parent belongs to `area_ref`.
fn parent_within(
    store: &BubbleStore,
    parent_ref: Option<BubbleId>,
    area_ref: Option<BubbleId>,
) -> Option<BubbleId> {
    parent_ref.filter(|parent| {
        store
            .get(*parent)
            .is_some_and(|parent| parent.area_ref == area_ref)
    })
}

fn reposition(
    store: &mut BubbleStore,
    id: BubbleId,
    kind: BubbleKind,
    angle: f64,
    target: DropTarget,
) -> DropOutcome {
    let ring = store.rings().radius(kind);
    DropOutcome {
        target,
        updates: store.update_position(id, PositionInput::Dragged { ring, angle }),
        assignment: None,
    }
}
