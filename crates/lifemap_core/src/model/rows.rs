//! Storage-row shapes consumed by hydration.
//!
//! # Responsibility
//! - Mirror the rows the storage collaborator returns for areas,
//!   workstreams and items.
//! - Map each row to an unplaced or storage-locked `Bubble`.
//!
//! # Invariants
//! - A stored position is used only when it resolves to a finite point;
//!   partial or malformed payloads mean "no stored position".
//! - A row with a resolvable stored position hydrates as `Placement::Locked`.

use crate::model::bubble::{Bubble, BubbleId, BubbleKind, Placement, Position};
use serde::{Deserialize, Serialize};

/// Normalized-unit distance under which stored polar and normalized forms
/// count as the same point.
const CONSISTENT_FORMS_TOLERANCE: f64 = 1e-9;

/// Opaque position payload persisted next to an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredPosition {
    #[serde(default)]
    pub ring: Option<f64>,
    #[serde(default)]
    pub angle: Option<f64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

impl StoredPosition {
    pub fn polar(ring: f64, angle: f64) -> Self {
        Self {
            ring: Some(ring),
            angle: Some(angle),
            ..Self::default()
        }
    }

    pub fn normalized(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Resolves the payload; normalized coordinates win over polar ones
    /// unless both forms are present and agree.
    pub fn resolve(&self) -> Option<Position> {
        if let (Some(ring), Some(angle), Some(x), Some(y)) = (self.ring, self.angle, self.x, self.y) {
            if let Some(position) =
                Position::from_consistent_parts(ring, angle, x, y, CONSISTENT_FORMS_TOLERANCE)
            {
                return Some(position);
            }
        }
        if let (Some(x), Some(y)) = (self.x, self.y) {
            if let Some(position) = Position::from_normalized(x, y) {
                return Some(position);
            }
        }
        match (self.ring, self.angle) {
            (Some(ring), Some(angle)) if ring.is_finite() && angle.is_finite() => {
                Some(Position::from_polar(ring, angle))
            }
            _ => None,
        }
    }
}

/// Life area row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeAreaRow {
    pub id: BubbleId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub bubble_position: Option<StoredPosition>,
    #[serde(default)]
    pub bubble_size: Option<f64>,
}

/// Workstream flavour as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkstreamKind {
    Project,
    Process,
    /// Legacy label; rendered on the process ring.
    Habit,
}

/// Project/process row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkstreamRow {
    pub id: BubbleId,
    #[serde(default)]
    pub life_area_id: Option<BubbleId>,
    pub title: String,
    pub kind: WorkstreamKind,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub bubble_position: Option<StoredPosition>,
    #[serde(default)]
    pub bubble_size: Option<f64>,
}

fn default_active() -> bool {
    true
}

/// Item flavour as stored. Anything that is not a task renders as an idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Task,
    #[serde(other)]
    Idea,
}

/// Task/idea row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: BubbleId,
    #[serde(default)]
    pub life_area_id: Option<BubbleId>,
    #[serde(default)]
    pub workstream_id: Option<BubbleId>,
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub bubble_position: Option<StoredPosition>,
    #[serde(default)]
    pub bubble_size: Option<f64>,
}

/// One full refresh from the storage collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HydrationSnapshot {
    #[serde(default)]
    pub life_areas: Vec<LifeAreaRow>,
    #[serde(default)]
    pub workstreams: Vec<WorkstreamRow>,
    #[serde(default)]
    pub items: Vec<ItemRow>,
}

impl HydrationSnapshot {
    pub fn len(&self) -> usize {
        self.life_areas.len() + self.workstreams.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Common mapping surface for every storage row.
pub trait SourceRow {
    fn id(&self) -> BubbleId;
    fn stored_position(&self) -> Option<Position>;
    fn to_bubble(&self) -> Bubble;
}

impl SourceRow for LifeAreaRow {
    fn id(&self) -> BubbleId {
        self.id
    }

    fn stored_position(&self) -> Option<Position> {
        self.bubble_position.as_ref().and_then(StoredPosition::resolve)
    }

    fn to_bubble(&self) -> Bubble {
        let bubble = Bubble::new(self.id, BubbleKind::Area, self.name.clone()).with_status("active");
        apply_storage_fields(bubble, self.stored_position(), self.bubble_size)
    }
}

impl SourceRow for WorkstreamRow {
    fn id(&self) -> BubbleId {
        self.id
    }

    fn stored_position(&self) -> Option<Position> {
        self.bubble_position.as_ref().and_then(StoredPosition::resolve)
    }

    fn to_bubble(&self) -> Bubble {
        let kind = match self.kind {
            WorkstreamKind::Project => BubbleKind::Project,
            WorkstreamKind::Process | WorkstreamKind::Habit => BubbleKind::Process,
        };
        let status = if self.active { "active" } else { "archived" };
        let mut bubble = Bubble::new(self.id, kind, self.title.clone()).with_status(status);
        bubble.area_ref = self.life_area_id;
        apply_storage_fields(bubble, self.stored_position(), self.bubble_size)
    }
}

impl SourceRow for ItemRow {
    fn id(&self) -> BubbleId {
        self.id
    }

    fn stored_position(&self) -> Option<Position> {
        self.bubble_position.as_ref().and_then(StoredPosition::resolve)
    }

    fn to_bubble(&self) -> Bubble {
        let kind = match self.item_type {
            ItemType::Task => BubbleKind::Task,
            ItemType::Idea => BubbleKind::Idea,
        };
        let mut bubble =
            Bubble::new(self.id, kind, self.title.clone()).with_status(self.status.clone());
        bubble.area_ref = self.life_area_id;
        bubble.parent_ref = self.workstream_id;
        apply_storage_fields(bubble, self.stored_position(), self.bubble_size)
    }
}

fn apply_storage_fields(
    mut bubble: Bubble,
    stored: Option<Position>,
    size: Option<f64>,
) -> Bubble {
    bubble.size = size.filter(|value| value.is_finite() && *value > 0.0);
    if let Some(position) = stored {
        bubble.position = Some(position);
        bubble.placement = Placement::Locked;
    }
    bubble
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn partial_polar_payload_is_not_a_position() {
        let stored = StoredPosition {
            ring: Some(300.0),
            ..StoredPosition::default()
        };
        assert!(stored.resolve().is_none());

        let non_finite = StoredPosition::polar(f64::NAN, 1.0);
        assert!(non_finite.resolve().is_none());
    }

    #[test]
    fn normalized_payload_wins_over_polar() {
        let stored = StoredPosition {
            ring: Some(100.0),
            angle: Some(0.0),
            x: Some(0.5),
            y: Some(0.9),
        };
        let position = stored.resolve().expect("stored position should resolve");
        assert_eq!(position.x(), 0.5);
        assert_eq!(position.y(), 0.9);
        assert!((position.ring() - 0.4 * 640.0).abs() < 1e-9);
    }

    #[test]
    fn habit_workstream_maps_to_process_bubble() {
        let row = WorkstreamRow {
            id: Uuid::new_v4(),
            life_area_id: None,
            title: "Morning run".to_string(),
            kind: WorkstreamKind::Habit,
            active: false,
            bubble_position: None,
            bubble_size: Some(f64::NAN),
        };
        let bubble = row.to_bubble();
        assert_eq!(bubble.kind, BubbleKind::Process);
        assert_eq!(bubble.status_label, "archived");
        assert_eq!(bubble.size, None);
        assert_eq!(bubble.placement, Placement::Auto);
    }

    #[test]
    fn item_with_stored_position_hydrates_locked() {
        let row = ItemRow {
            id: Uuid::new_v4(),
            life_area_id: Some(Uuid::new_v4()),
            workstream_id: None,
            title: "Book dentist".to_string(),
            status: "pending".to_string(),
            item_type: ItemType::Task,
            bubble_position: Some(StoredPosition::polar(320.0, 0.4)),
            bubble_size: None,
        };
        let bubble = row.to_bubble();
        assert_eq!(bubble.kind, BubbleKind::Task);
        assert_eq!(bubble.placement, Placement::Locked);
        assert!((bubble.angle().expect("stored angle should carry over") - 0.4).abs() < 1e-12);
    }
}
