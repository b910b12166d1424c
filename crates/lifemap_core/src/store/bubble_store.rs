use crate::layout::allocator::next_angle_with;
use crate::layout::geometry::{angle_difference, signed_angle_difference};
use crate::layout::{reconcile, LayoutConfig, RingTable};
use crate::model::bubble::{Bubble, BubbleId, BubbleKind, Placement, Position, PositionUpdate};
use crate::model::rows::{HydrationSnapshot, SourceRow};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Last user-set position remembered across hydrations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub position: Position,
    /// `true` for a free-form drag, `false` for a ring-snapped move.
    pub manual: bool,
}

impl OverrideEntry {
    pub fn placement(&self) -> Placement {
        if self.manual {
            Placement::ManualOverride
        } else {
            Placement::Locked
        }
    }
}

/// Authoritative coordinates for `BubbleStore::update_position`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionInput {
    /// Ring-snapped move; the bubble becomes `Locked`.
    Polar { ring: f64, angle: f64 },
    /// Free-form drag; the bubble becomes `ManualOverride`.
    Normalized { x: f64, y: f64 },
    /// User drag released onto a ring; snapped like `Polar` but the bubble
    /// becomes `ManualOverride`.
    Dragged { ring: f64, angle: f64 },
}

/// Grouping key and optional overrides for `BubbleStore::next_angle_for`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NextAngleQuery {
    pub area_ref: Option<BubbleId>,
    pub parent_ref: Option<BubbleId>,
    pub anchor_angle: Option<f64>,
    pub wedge: Option<f64>,
}

/// Caller-owned layout state: live bubbles plus the override cache.
#[derive(Debug, Clone)]
pub struct BubbleStore {
    bubbles: BTreeMap<BubbleId, Bubble>,
    overrides: BTreeMap<BubbleId, OverrideEntry>,
    rings: RingTable,
    config: LayoutConfig,
    owner: Option<String>,
}

impl Default for BubbleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BubbleStore {
    /// Empty store with default rings and tuning.
    pub fn new() -> Self {
        Self::with_config(RingTable::default(), LayoutConfig::default())
    }

    pub fn with_config(rings: RingTable, config: LayoutConfig) -> Self {
        Self {
            bubbles: BTreeMap::new(),
            overrides: BTreeMap::new(),
            rings,
            config,
            owner: None,
        }
    }

    pub fn bubbles(&self) -> &BTreeMap<BubbleId, Bubble> {
        &self.bubbles
    }

    pub fn get(&self, id: BubbleId) -> Option<&Bubble> {
        self.bubbles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    pub fn rings(&self) -> &RingTable {
        &self.rings
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn overrides(&self) -> &BTreeMap<BubbleId, OverrideEntry> {
        &self.overrides
    }

    /// Replaces the override cache, typically with entries loaded from a
    /// previous session.
    pub fn restore_overrides(&mut self, entries: impl IntoIterator<Item = (BubbleId, OverrideEntry)>) {
        self.overrides = entries.into_iter().collect();
        debug!(
            "event=overrides_restore module=store status=ok count={}",
            self.overrides.len()
        );
    }

    /// Rebuilds the live map from a storage refresh.
    ///
    /// Live non-`Auto` bubbles survive verbatim, even when the refresh has
    /// a row for them. Rows without a stored position pick up a cached
    /// override if one exists.
    pub fn hydrate(&mut self, snapshot: &HydrationSnapshot) {
        let mut merged: BTreeMap<BubbleId, Bubble> = self
            .bubbles
            .values()
            .filter(|bubble| bubble.placement.is_locked())
            .map(|bubble| (bubble.id, bubble.clone()))
            .collect();
        let preserved = merged.len();

        let mut restored = 0usize;
        for row in &snapshot.life_areas {
            restored += usize::from(self.merge_row(&mut merged, row));
        }
        for row in &snapshot.workstreams {
            restored += usize::from(self.merge_row(&mut merged, row));
        }
        for row in &snapshot.items {
            restored += usize::from(self.merge_row(&mut merged, row));
        }

        self.bubbles = reconcile(&merged, &self.rings, &self.config);
        info!(
            "event=store_hydrate module=store status=ok rows={} preserved={} restored={} bubbles={}",
            snapshot.len(),
            preserved,
            restored,
            self.bubbles.len()
        );
    }

    /// Returns whether a cached override was applied to the row.
    fn merge_row<R: SourceRow>(&self, merged: &mut BTreeMap<BubbleId, Bubble>, row: &R) -> bool {
        let id = row.id();
        if merged.get(&id).is_some_and(|live| live.placement.is_locked()) {
            return false;
        }

        let mut bubble = row.to_bubble();
        let mut restored = false;
        if row.stored_position().is_none() {
            if let Some(entry) = self.overrides.get(&id) {
                bubble.position = Some(entry.position);
                bubble.placement = entry.placement();
                restored = true;
            }
        }
        merged.insert(id, bubble);
        restored
    }

    /// Inserts or replaces a bubble, then relayouts the full map.
    pub fn upsert(&mut self, bubble: Bubble) {
        debug!(
            "event=bubble_upsert module=store status=ok bubble_id={} kind={}",
            bubble.id, bubble.kind
        );
        self.bubbles.insert(bubble.id, bubble);
        self.relayout();
    }

    /// Drops the bubble and its override entry, then relayouts.
    pub fn remove(&mut self, id: BubbleId) -> Option<Bubble> {
        self.overrides.remove(&id);
        let removed = self.bubbles.remove(&id);
        if removed.is_some() {
            self.relayout();
        }
        debug!(
            "event=bubble_remove module=store status={} bubble_id={}",
            if removed.is_some() { "ok" } else { "skip" },
            id
        );
        removed
    }

    /// Moves one bubble without relayouting its neighbours.
    ///
    /// Moving an area rotates every descendant that is not a manual
    /// override by the same angular delta. Each moved bubble is recorded in
    /// the override cache and reported in the returned list, area first.
    /// Unknown ids and non-finite input yield an empty list.
    pub fn update_position(&mut self, id: BubbleId, input: PositionInput) -> Vec<PositionUpdate> {
        let Some(current) = self.bubbles.get(&id) else {
            debug!("event=position_update module=store status=skip reason=unknown_bubble bubble_id={id}");
            return Vec::new();
        };

        let resolved = match input {
            PositionInput::Polar { ring, angle } if ring.is_finite() && angle.is_finite() => {
                Some((Position::from_polar(ring, angle), Placement::Locked))
            }
            PositionInput::Dragged { ring, angle } if ring.is_finite() && angle.is_finite() => {
                Some((Position::from_polar(ring, angle), Placement::ManualOverride))
            }
            PositionInput::Polar { .. } | PositionInput::Dragged { .. } => None,
            PositionInput::Normalized { x, y } => {
                Position::from_normalized(x, y).map(|position| (position, Placement::ManualOverride))
            }
        };
        let Some((position, placement)) = resolved else {
            warn!("event=position_update module=store status=skip reason=non_finite bubble_id={id}");
            return Vec::new();
        };

        let cascade = if current.kind == BubbleKind::Area {
            let old_angle = current.angle().unwrap_or(0.0);
            let delta = signed_angle_difference(position.angle(), old_angle);
            Some((self.area_descendants(id), delta))
        } else {
            None
        };

        let mut updates = vec![self.set_position(id, position, placement)];
        if let Some((descendants, delta)) = cascade {
            for child_id in descendants {
                let Some(child) = self.bubbles.get(&child_id) else {
                    continue;
                };
                if child.placement.is_manual() {
                    continue;
                }
                let Some(moved) = child.position.map(|old| old.rotated(delta)) else {
                    continue;
                };
                updates.push(self.set_position(child_id, moved, Placement::Locked));
            }
        }

        debug!(
            "event=position_update module=store status=ok bubble_id={} placement={:?} moved={}",
            id,
            placement,
            updates.len()
        );
        updates.into_iter().flatten().collect()
    }

    fn set_position(
        &mut self,
        id: BubbleId,
        position: Position,
        placement: Placement,
    ) -> Option<PositionUpdate> {
        let bubble = self.bubbles.get_mut(&id)?;
        bubble.position = Some(position);
        bubble.placement = placement;
        let size = bubble.size.unwrap_or_else(|| self.rings.base_size(bubble.kind));
        bubble.size = Some(size);
        let kind = bubble.kind;
        self.overrides.insert(
            id,
            OverrideEntry {
                position,
                manual: placement.is_manual(),
            },
        );
        Some(PositionUpdate {
            id,
            kind,
            position,
            size,
        })
    }

    /// Bubbles owned by `area_id` directly or through a parent chain.
    fn area_descendants(&self, area_id: BubbleId) -> BTreeSet<BubbleId> {
        let mut owners: BTreeSet<BubbleId> = BTreeSet::from([area_id]);
        let mut found: BTreeSet<BubbleId> = BTreeSet::new();
        loop {
            let before = found.len();
            for bubble in self.bubbles.values() {
                if bubble.kind == BubbleKind::Area || found.contains(&bubble.id) {
                    continue;
                }
                let owned_by_area = bubble.area_ref == Some(area_id);
                let owned_by_parent = bubble.parent_ref.is_some_and(|parent| owners.contains(&parent));
                if owned_by_area || owned_by_parent {
                    found.insert(bubble.id);
                    owners.insert(bubble.id);
                }
            }
            if found.len() == before {
                return found;
            }
        }
    }

    /// Angle a new bubble of `kind` should take among its future siblings.
    pub fn next_angle_for(&self, kind: BubbleKind, query: &NextAngleQuery) -> f64 {
        self.next_angle_excluding(kind, query, None)
    }

    fn next_angle_excluding(
        &self,
        kind: BubbleKind,
        query: &NextAngleQuery,
        exclude: Option<BubbleId>,
    ) -> f64 {
        let angles: Vec<f64> = self
            .bubbles
            .values()
            .filter(|candidate| Some(candidate.id) != exclude)
            .filter(|candidate| is_sibling(candidate, kind, query))
            .filter_map(Bubble::angle)
            .collect();
        let anchor = query
            .anchor_angle
            .unwrap_or_else(|| self.default_anchor(kind, query));
        let wedge = query.wedge.unwrap_or_else(|| self.config.default_wedge(kind));
        next_angle_with(&angles, anchor, wedge, &self.config)
    }

    fn default_anchor(&self, kind: BubbleKind, query: &NextAngleQuery) -> f64 {
        let angle_of = |id: Option<BubbleId>| id.and_then(|id| self.bubbles.get(&id)).and_then(Bubble::angle);
        let anchor = match kind {
            BubbleKind::Area | BubbleKind::Vision => None,
            BubbleKind::Project | BubbleKind::Process => angle_of(query.area_ref),
            BubbleKind::Task | BubbleKind::Idea => {
                angle_of(query.parent_ref).or_else(|| angle_of(query.area_ref))
            }
        };
        anchor.unwrap_or(self.config.ungrouped_anchor)
    }

    /// Drops the cached override once the position is persisted externally.
    pub fn forget_override(&mut self, id: BubbleId) -> bool {
        let forgotten = self.overrides.remove(&id).is_some();
        debug!(
            "event=override_forget module=store status={} bubble_id={}",
            if forgotten { "ok" } else { "skip" },
            id
        );
        forgotten
    }

    /// Places a freshly created bubble at its allocated slot.
    ///
    /// The bubble is stored `Locked` on its ring with no override entry;
    /// the caller persists the returned values.
    pub fn place_new(&mut self, draft: Bubble, anchor_angle: Option<f64>) -> PositionUpdate {
        let query = NextAngleQuery {
            area_ref: draft.area_ref,
            parent_ref: draft.parent_ref,
            anchor_angle,
            wedge: None,
        };
        let angle = self.next_angle_excluding(draft.kind, &query, Some(draft.id));
        let spec = self.rings.spec(draft.kind);
        let position = Position::from_polar(spec.radius, angle);
        let size = draft.size.unwrap_or(spec.base_size);
        let mut bubble = draft.with_position(position, Placement::Locked);
        bubble.size = Some(size);

        let update = PositionUpdate {
            id: bubble.id,
            kind: bubble.kind,
            position,
            size,
        };
        self.overrides.remove(&bubble.id);
        self.upsert(bubble);
        update
    }

    /// Promotes an idea to a task on the task ring, at a slot among the
    /// tasks of the same parent (or area).
    pub fn convert_idea_to_task(&mut self, id: BubbleId) -> Option<PositionUpdate> {
        let idea = self.bubbles.get(&id)?;
        if idea.kind != BubbleKind::Idea {
            debug!("event=idea_convert module=store status=skip reason=not_an_idea bubble_id={id}");
            return None;
        }
        let query = NextAngleQuery {
            area_ref: idea.area_ref,
            parent_ref: idea.parent_ref,
            ..NextAngleQuery::default()
        };
        let angle = self.next_angle_excluding(BubbleKind::Task, &query, Some(id));
        let spec = self.rings.spec(BubbleKind::Task);
        let position = Position::from_polar(spec.radius, angle);

        if let Some(bubble) = self.bubbles.get_mut(&id) {
            bubble.kind = BubbleKind::Task;
            bubble.size = Some(spec.base_size);
        }
        let update = self.set_position(id, position, Placement::Locked);
        self.relayout();
        info!("event=idea_convert module=store status=ok bubble_id={id}");
        update
    }

    /// Moves a non-area bubble under a new area/parent at a free slot among
    /// its new siblings.
    pub fn reassign(
        &mut self,
        id: BubbleId,
        area_ref: Option<BubbleId>,
        parent_ref: Option<BubbleId>,
    ) -> Option<PositionUpdate> {
        let kind = self.bubbles.get(&id)?.kind;
        if kind == BubbleKind::Area {
            return None;
        }
        let parent_ref = if kind.is_item() { parent_ref } else { None };
        let query = NextAngleQuery {
            area_ref,
            parent_ref,
            ..NextAngleQuery::default()
        };
        let angle = self.next_angle_excluding(kind, &query, Some(id));
        let position = Position::from_polar(self.rings.radius(kind), angle);

        if let Some(bubble) = self.bubbles.get_mut(&id) {
            bubble.area_ref = area_ref;
            bubble.parent_ref = parent_ref;
        }
        let update = self.set_position(id, position, Placement::Locked);
        self.relayout();
        debug!(
            "event=bubble_reassign module=store status=ok bubble_id={} area_set={} parent_set={}",
            id,
            area_ref.is_some(),
            parent_ref.is_some()
        );
        update
    }

    /// Bubble of one of `kinds` angularly closest to `angle`, optionally
    /// restricted to one area. Ties go to the lowest id.
    pub fn nearest(&self, kinds: &[BubbleKind], angle: f64, area: Option<BubbleId>) -> Option<&Bubble> {
        let mut best: Option<(&Bubble, f64)> = None;
        for candidate in self.bubbles.values() {
            if !kinds.contains(&candidate.kind) {
                continue;
            }
            if area.is_some() && candidate.area_ref != area {
                continue;
            }
            let distance = angle_difference(angle, candidate.angle().unwrap_or(0.0));
            if best.map_or(true, |(_, best_distance)| distance < best_distance) {
                best = Some((candidate, distance));
            }
        }
        best.map(|(bubble, _)| bubble)
    }

    /// Switches the store to `owner`, dropping all state when it changes.
    /// Returns whether anything was cleared.
    pub fn sync_owner(&mut self, owner: &str) -> bool {
        if self.owner.as_deref() == Some(owner) {
            return false;
        }
        self.bubbles.clear();
        self.overrides.clear();
        self.owner = Some(owner.to_string());
        info!("event=store_owner_switch module=store status=ok");
        true
    }

    pub fn reset(&mut self) {
        self.bubbles.clear();
        self.overrides.clear();
        self.owner = None;
        info!("event=store_reset module=store status=ok");
    }

    fn relayout(&mut self) {
        self.bubbles = reconcile(&self.bubbles, &self.rings, &self.config);
    }
}

/// Sibling filter used when allocating a slot for a new bubble of `kind`.
fn is_sibling(candidate: &Bubble, kind: BubbleKind, query: &NextAngleQuery) -> bool {
    match kind {
        BubbleKind::Area | BubbleKind::Vision => candidate.kind == kind,
        BubbleKind::Project | BubbleKind::Process => {
            candidate.kind.is_workstream() && candidate.area_ref == query.area_ref
        }
        BubbleKind::Task => {
            candidate.kind == kind
                && candidate.parent_ref.or(candidate.area_ref) == query.parent_ref.or(query.area_ref)
        }
        BubbleKind::Idea => {
            candidate.kind == kind
                && match query.parent_ref {
                    Some(parent) => candidate.parent_ref == Some(parent),
                    None => candidate.area_ref == query.area_ref,
                }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::rows::{ItemRow, ItemType, LifeAreaRow, StoredPosition};
    use std::f64::consts::{FRAC_PI_2, PI};
    use uuid::Uuid;

    fn area_row(name: &str) -> LifeAreaRow {
        LifeAreaRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color: None,
            rating: None,
            bubble_position: None,
            bubble_size: None,
        }
    }

    fn item_row(area: BubbleId, title: &str, item_type: ItemType) -> ItemRow {
        ItemRow {
            id: Uuid::new_v4(),
            life_area_id: Some(area),
            workstream_id: None,
            title: title.to_string(),
            status: "pending".to_string(),
            item_type,
            bubble_position: None,
            bubble_size: None,
        }
    }

    #[test]
    fn hydrate_applies_cached_override_only_without_stored_position() {
        let area = area_row("Health");
        let mut with_stored = item_row(area.id, "stored", ItemType::Task);
        with_stored.bubble_position = Some(StoredPosition::polar(320.0, 0.5));
        let bare = item_row(area.id, "bare", ItemType::Task);

        let mut store = BubbleStore::new();
        store.restore_overrides([
            (
                with_stored.id,
                OverrideEntry {
                    position: Position::from_polar(320.0, 2.0),
                    manual: false,
                },
            ),
            (
                bare.id,
                OverrideEntry {
                    position: Position::from_polar(320.0, -2.0),
                    manual: false,
                },
            ),
        ]);
        store.hydrate(&HydrationSnapshot {
            life_areas: vec![area],
            workstreams: Vec::new(),
            items: vec![with_stored.clone(), bare.clone()],
        });

        assert!((store.get(with_stored.id).and_then(Bubble::angle).expect("stored row should be placed") - 0.5).abs() < 1e-12);
        let restored = store.get(bare.id).expect("bare row should be hydrated");
        assert!((restored.angle().expect("override should place the row") + 2.0).abs() < 1e-12);
        assert_eq!(restored.placement, Placement::Locked);
    }

    #[test]
    fn remove_drops_override_entry() {
        let mut store = BubbleStore::new();
        let bubble = Bubble::new(Uuid::new_v4(), BubbleKind::Task, "t");
        let id = bubble.id;
        store.upsert(bubble);
        store.update_position(id, PositionInput::Polar { ring: 320.0, angle: 1.0 });
        assert!(store.overrides().contains_key(&id));

        assert!(store.remove(id).is_some());
        assert!(store.overrides().is_empty());
        assert!(store.remove(id).is_none());
    }

    #[test]
    fn non_area_update_leaves_neighbours_alone() {
        let mut store = BubbleStore::new();
        let area = Bubble::new(Uuid::new_v4(), BubbleKind::Area, "Work");
        let a = Bubble::new(Uuid::new_v4(), BubbleKind::Task, "a").with_area(area.id);
        let b = Bubble::new(Uuid::new_v4(), BubbleKind::Task, "b").with_area(area.id);
        let (a_id, b_id) = (a.id, b.id);
        store.upsert(area);
        store.upsert(a);
        store.upsert(b);
        let before = store.get(b_id).expect("b should exist").position;

        let updates = store.update_position(a_id, PositionInput::Polar { ring: 320.0, angle: 2.5 });
        assert_eq!(updates.len(), 1);
        assert_eq!(store.get(b_id).expect("b should exist").position, before);
        assert_eq!(store.get(a_id).expect("a should exist").placement, Placement::Locked);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut store = BubbleStore::new();
        let bubble = Bubble::new(Uuid::new_v4(), BubbleKind::Idea, "i");
        let id = bubble.id;
        store.upsert(bubble);
        assert!(store
            .update_position(id, PositionInput::Normalized { x: f64::NAN, y: 0.5 })
            .is_empty());
        assert!(store
            .update_position(Uuid::new_v4(), PositionInput::Polar { ring: 1.0, angle: 0.0 })
            .is_empty());
        assert!(store.overrides().is_empty());
    }

    #[test]
    fn ring_snapped_drag_is_a_manual_override() {
        let mut store = BubbleStore::new();
        let bubble = Bubble::new(Uuid::new_v4(), BubbleKind::Task, "t");
        let id = bubble.id;
        store.upsert(bubble);

        assert!(store
            .update_position(id, PositionInput::Dragged { ring: f64::INFINITY, angle: 0.0 })
            .is_empty());
        let updates = store.update_position(id, PositionInput::Dragged { ring: 320.0, angle: 0.4 });
        assert_eq!(updates.len(), 1);
        let dragged = store.get(id).expect("dragged bubble should exist");
        assert_eq!(dragged.placement, Placement::ManualOverride);
        assert_eq!(dragged.angle(), Some(0.4));
        assert!(store.overrides()[&id].manual);
    }

    #[test]
    fn next_angle_for_first_area_is_top() {
        let store = BubbleStore::new();
        let angle = store.next_angle_for(BubbleKind::Area, &NextAngleQuery::default());
        assert!((angle + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn next_angle_for_task_anchors_on_parent() {
        let mut store = BubbleStore::new();
        let project = Bubble::new(Uuid::new_v4(), BubbleKind::Project, "p")
            .with_position(Position::from_polar(285.0, 1.2), Placement::Locked);
        let project_id = project.id;
        store.upsert(project);

        let angle = store.next_angle_for(
            BubbleKind::Task,
            &NextAngleQuery {
                parent_ref: Some(project_id),
                ..NextAngleQuery::default()
            },
        );
        assert!((angle - 1.2).abs() < 1e-12);
    }

    #[test]
    fn nearest_respects_area_filter() {
        let mut store = BubbleStore::new();
        let home = Uuid::new_v4();
        let work = Uuid::new_v4();
        let near = Bubble::new(Uuid::new_v4(), BubbleKind::Project, "near")
            .with_area(work)
            .with_position(Position::from_polar(285.0, 0.1), Placement::Locked);
        let far = Bubble::new(Uuid::new_v4(), BubbleKind::Project, "far")
            .with_area(home)
            .with_position(Position::from_polar(285.0, PI), Placement::Locked);
        let (near_id, far_id) = (near.id, far.id);
        store.upsert(near);
        store.upsert(far);

        let kinds = [BubbleKind::Project, BubbleKind::Process];
        assert_eq!(store.nearest(&kinds, 0.0, None).map(|b| b.id), Some(near_id));
        assert_eq!(store.nearest(&kinds, 0.0, Some(home)).map(|b| b.id), Some(far_id));
        assert!(store.nearest(&[BubbleKind::Vision], 0.0, None).is_none());
    }

    #[test]
    fn sync_owner_clears_only_on_change() {
        let mut store = BubbleStore::new();
        assert!(store.sync_owner("alice"));
        store.upsert(Bubble::new(Uuid::new_v4(), BubbleKind::Vision, "v"));
        assert!(!store.sync_owner("alice"));
        assert_eq!(store.len(), 1);
        assert!(store.sync_owner("bob"));
        assert!(store.is_empty());
        store.reset();
        assert_eq!(store.owner(), None);
    }

    #[test]
    fn reassign_refuses_areas_and_unknown_ids() {
        let mut store = BubbleStore::new();
        let area = Bubble::new(Uuid::new_v4(), BubbleKind::Area, "a");
        let area_id = area.id;
        store.upsert(area);
        assert!(store.reassign(area_id, None, None).is_none());
        assert!(store.reassign(Uuid::new_v4(), None, None).is_none());
    }
}
