//! Bubble domain model.
//!
//! # Responsibility
//! - Define the layout unit shared by every ring of the diagram.
//! - Keep polar and normalized coordinates consistent by construction.
//!
//! # Invariants
//! - `id` is the external entity id and never changes.
//! - `kind` only changes through an explicit idea-to-task promotion.
//! - `Position` values are only built from one authoritative representation;
//!   the other is always derived from it.
//! - After reconciliation `size` and `position` are always `Some`.

use crate::layout::geometry::{normalize_angle, normalized_to_polar, polar_to_normalized};
use crate::model::rows::StoredPosition;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier shared with the external entity.
pub type BubbleId = Uuid;

/// Entity category; decides which ring a bubble lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleKind {
    /// Life area; innermost ring.
    #[serde(rename = "life_area")]
    Area,
    Project,
    Process,
    Task,
    Idea,
    Vision,
}

impl BubbleKind {
    pub const ALL: [BubbleKind; 6] = [
        BubbleKind::Area,
        BubbleKind::Project,
        BubbleKind::Process,
        BubbleKind::Task,
        BubbleKind::Idea,
        BubbleKind::Vision,
    ];

    /// Wire label used by storage rows and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Area => "life_area",
            Self::Project => "project",
            Self::Process => "process",
            Self::Task => "task",
            Self::Idea => "idea",
            Self::Vision => "vision",
        }
    }

    /// Projects and processes share one ring and one grouping policy.
    pub fn is_workstream(self) -> bool {
        matches!(self, Self::Project | Self::Process)
    }

    /// Tasks and ideas hang off a workstream or an area.
    pub fn is_item(self) -> bool {
        matches!(self, Self::Task | Self::Idea)
    }
}

impl Display for BubbleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown bubble kind label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindParseError(pub String);

impl Display for KindParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown bubble kind `{}`; expected life_area|project|process|task|idea|vision",
            self.0
        )
    }
}

impl Error for KindParseError {}

impl FromStr for BubbleKind {
    type Err = KindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "life_area" | "area" => Ok(Self::Area),
            "project" => Ok(Self::Project),
            "process" => Ok(Self::Process),
            "task" => Ok(Self::Task),
            "idea" => Ok(Self::Idea),
            "vision" => Ok(Self::Vision),
            other => Err(KindParseError(other.to_string())),
        }
    }
}

/// How a bubble's position may be changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// Placed by reconciliation; re-spread on every pass.
    #[default]
    Auto,
    /// Fixed against reconciliation; still follows its area when the area
    /// is dragged.
    Locked,
    /// Dragged to a free-form point; fixed against both reconciliation and
    /// area cascades.
    ManualOverride,
}

impl Placement {
    pub fn is_auto(self) -> bool {
        self == Self::Auto
    }

    /// `Locked` and `ManualOverride` are both exempt from reconciliation.
    pub fn is_locked(self) -> bool {
        !self.is_auto()
    }

    pub fn is_manual(self) -> bool {
        self == Self::ManualOverride
    }
}

/// Resolved bubble position.
///
/// Fields are private so the polar and normalized forms can never be set
/// independently.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredPosition", into = "StoredPosition")]
pub struct Position {
    ring: f64,
    angle: f64,
    x: f64,
    y: f64,
}

impl Position {
    /// Builds a position from authoritative polar coordinates.
    pub fn from_polar(ring: f64, angle: f64) -> Self {
        let angle = normalize_angle(angle);
        let point = polar_to_normalized(ring, angle);
        Self {
            ring,
            angle,
            x: point.x,
            y: point.y,
        }
    }

    /// Builds a position from authoritative normalized coordinates.
    ///
    /// `x`/`y` are kept exactly as given. Returns `None` for non-finite input.
    pub fn from_normalized(x: f64, y: f64) -> Option<Self> {
        let polar = normalized_to_polar(x, y)?;
        Some(Self {
            ring: polar.ring,
            angle: polar.angle,
            x,
            y,
        })
    }

    /// Keeps all four stored values when they describe the same point
    /// within `tolerance`, so a serialized position reads back unchanged.
    pub(crate) fn from_consistent_parts(
        ring: f64,
        angle: f64,
        x: f64,
        y: f64,
        tolerance: f64,
    ) -> Option<Self> {
        if ![ring, angle, x, y].iter().all(|value| value.is_finite()) {
            return None;
        }
        let position = Self {
            ring,
            angle: normalize_angle(angle),
            x,
            y,
        };
        position.is_consistent(tolerance).then_some(position)
    }

    pub fn ring(&self) -> f64 {
        self.ring
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Same ring, angle shifted by `delta`.
    pub fn rotated(&self, delta: f64) -> Self {
        Self::from_polar(self.ring, self.angle + delta)
    }

    /// Whether both representations resolve to the same point.
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        let point = polar_to_normalized(self.ring, self.angle);
        (point.x - self.x).abs() <= tolerance && (point.y - self.y).abs() <= tolerance
    }
}

/// Position payload that cannot be resolved to a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPosition;

impl Display for UnresolvedPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "position needs finite x/y or finite ring/angle")
    }
}

impl Error for UnresolvedPosition {}

impl TryFrom<StoredPosition> for Position {
    type Error = UnresolvedPosition;

    fn try_from(value: StoredPosition) -> Result<Self, Self::Error> {
        value.resolve().ok_or(UnresolvedPosition)
    }
}

impl From<Position> for StoredPosition {
    fn from(value: Position) -> Self {
        Self {
            ring: Some(value.ring),
            angle: Some(value.angle),
            x: Some(value.x),
            y: Some(value.y),
        }
    }
}

/// Layout unit for one domain entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bubble {
    pub id: BubbleId,
    pub kind: BubbleKind,
    /// Owning life area. Unused for area bubbles themselves.
    pub area_ref: Option<BubbleId>,
    /// Owning project/process. Only tasks and ideas carry one.
    pub parent_ref: Option<BubbleId>,
    pub title: String,
    pub status_label: String,
    /// Rendered diameter; `None` until defaulted from the ring table.
    pub size: Option<f64>,
    /// `None` until placed by reconciliation or restored from storage.
    pub position: Option<Position>,
    #[serde(default)]
    pub placement: Placement,
}

impl Bubble {
    /// Creates an unplaced `Auto` bubble.
    pub fn new(id: BubbleId, kind: BubbleKind, title: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            area_ref: None,
            parent_ref: None,
            title: title.into(),
            status_label: String::new(),
            size: None,
            position: None,
            placement: Placement::Auto,
        }
    }

    pub fn with_area(mut self, area_ref: BubbleId) -> Self {
        self.area_ref = Some(area_ref);
        self
    }

    pub fn with_parent(mut self, parent_ref: BubbleId) -> Self {
        self.parent_ref = Some(parent_ref);
        self
    }

    pub fn with_status(mut self, status_label: impl Into<String>) -> Self {
        self.status_label = status_label.into();
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_position(mut self, position: Position, placement: Placement) -> Self {
        self.position = Some(position);
        self.placement = placement;
        self
    }

    /// Area this bubble belongs to for grouping; an area is its own key.
    pub fn area_key(&self) -> Option<BubbleId> {
        if self.kind == BubbleKind::Area {
            Some(self.id)
        } else {
            self.area_ref
        }
    }

    pub fn angle(&self) -> Option<f64> {
        self.position.map(|position| position.angle())
    }
}

/// Resolved values handed back to the caller for external persistence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub id: BubbleId,
    pub kind: BubbleKind,
    pub position: Position,
    pub size: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn kind_round_trips_through_wire_label() {
        for kind in BubbleKind::ALL {
            assert_eq!(kind.as_str().parse::<BubbleKind>().expect("wire label should parse"), kind);
        }
        assert!("galaxy".parse::<BubbleKind>().is_err());
    }

    #[test]
    fn normalized_input_is_kept_verbatim() {
        let position = Position::from_normalized(0.2, 0.8).expect("finite coordinates should resolve");
        assert_eq!(position.x(), 0.2);
        assert_eq!(position.y(), 0.8);
        assert!(position.is_consistent(1e-9));
    }

    #[test]
    fn polar_input_normalizes_angle() {
        let position = Position::from_polar(300.0, 3.0 * PI / 2.0);
        assert!((position.angle() + PI / 2.0).abs() < 1e-9);
        assert!(position.is_consistent(1e-12));
    }

    #[test]
    fn placement_lock_levels() {
        assert!(!Placement::Auto.is_locked());
        assert!(Placement::Locked.is_locked());
        assert!(Placement::ManualOverride.is_locked());
        assert!(Placement::ManualOverride.is_manual());
        assert!(!Placement::Locked.is_manual());
    }
}
