//! Full-map layout pass.
//!
//! Order matters: areas first, then workstreams around their area, then
//! tasks and ideas around their workstream or area. Each later ring reads
//! the angles settled by the earlier ones.

use super::rings::{RingSpec, RingTable};
use super::spread::spread_cluster;
use super::LayoutConfig;
use crate::model::bubble::{Bubble, BubbleId, BubbleKind, Position};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

/// Which owner a cluster of siblings gathers around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ClusterKey {
    Parent(BubbleId),
    Area(BubbleId),
    Ungrouped,
}

/// Produces a fully placed copy of `bubbles`.
///
/// Only `Auto` bubbles are moved or resized. Locked and manually placed
/// bubbles come back with the same position and size; missing sizes and
/// positions are filled in for everyone.
///
/// # Panics
/// Panics when `rings` has no entry for a kind present in the map.
pub fn reconcile(
    bubbles: &BTreeMap<BubbleId, Bubble>,
    rings: &RingTable,
    cfg: &LayoutConfig,
) -> BTreeMap<BubbleId, Bubble> {
    let mut next = bubbles.clone();

    for bubble in next.values_mut() {
        let spec = rings.spec(bubble.kind);
        if bubble.size.is_none() {
            bubble.size = Some(spec.base_size);
        }
    }

    let area_angles = place_areas(&mut next, rings, cfg);
    let mut clusters = place_workstreams(&mut next, &area_angles, rings, cfg);

    let workstream_angles: BTreeMap<BubbleId, f64> = next
        .values()
        .filter(|bubble| bubble.kind.is_workstream())
        .filter_map(|bubble| bubble.angle().map(|angle| (bubble.id, angle)))
        .collect();

    for kind in [BubbleKind::Task, BubbleKind::Idea] {
        clusters += place_items(&mut next, kind, &workstream_angles, &area_angles, rings, cfg);
    }
    clusters += place_visions(&mut next, rings, cfg);

    for bubble in next.values_mut() {
        if bubble.position.is_none() {
            bubble.position = Some(Position::from_polar(rings.radius(bubble.kind), 0.0));
        }
    }

    debug!(
        "event=layout_reconcile module=layout status=ok bubbles={} areas={} clusters={}",
        next.len(),
        area_angles.len(),
        clusters
    );
    next
}

/// Evenly spaces unlocked areas around the full circle, first slot at the
/// top. Returns every area's representative angle.
fn place_areas(
    next: &mut BTreeMap<BubbleId, Bubble>,
    rings: &RingTable,
    cfg: &LayoutConfig,
) -> BTreeMap<BubbleId, f64> {
    let spec = rings.spec(BubbleKind::Area);
    let mut areas: Vec<&mut Bubble> = next
        .values_mut()
        .filter(|bubble| bubble.kind == BubbleKind::Area)
        .collect();
    areas.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));

    let mut angles = BTreeMap::new();
    if areas.is_empty() {
        return angles;
    }
    let step = TAU / areas.len() as f64;

    for (index, area) in areas.into_iter().enumerate() {
        if area.placement.is_locked() {
            if let Some(angle) = area.angle() {
                angles.insert(area.id, angle);
                continue;
            }
        }
        let position = Position::from_polar(spec.radius, index as f64 * step + cfg.ungrouped_anchor);
        if area.placement.is_auto() {
            area.size = Some(spec.base_size);
        }
        area.position = Some(position);
        angles.insert(area.id, position.angle());
    }
    angles
}

/// Spreads unlocked projects/processes around their area. Workstreams
/// whose area is unknown gather around the ungrouped anchor.
fn place_workstreams(
    next: &mut BTreeMap<BubbleId, Bubble>,
    area_angles: &BTreeMap<BubbleId, f64>,
    rings: &RingTable,
    cfg: &LayoutConfig,
) -> usize {
    let mut groups: BTreeMap<ClusterKey, BTreeSet<BubbleId>> = BTreeMap::new();
    for bubble in next.values() {
        if !bubble.kind.is_workstream() || !bubble.placement.is_auto() {
            continue;
        }
        let key = match bubble.area_ref {
            Some(area) if area_angles.contains_key(&area) => ClusterKey::Area(area),
            _ => ClusterKey::Ungrouped,
        };
        groups.entry(key).or_default().insert(bubble.id);
    }

    let spec = rings.spec(BubbleKind::Project);
    for (key, ids) in &groups {
        let (anchor, wedge) = match key {
            ClusterKey::Area(area) => (area_angles[area], cfg.project_wedge),
            _ => (cfg.ungrouped_anchor, cfg.ungrouped_wedge),
        };
        let mut members: Vec<&mut Bubble> = next
            .values_mut()
            .filter(|bubble| ids.contains(&bubble.id))
            .collect();
        spread_cluster(&mut members, anchor, spec.radius, spec.base_size, wedge, cfg.min_spacing);
        for member in members.iter_mut() {
            snap_to_own_ring(member, spec, rings);
        }
    }
    groups.len()
}

/// Spreads unlocked bubbles of one item kind around their workstream, else
/// their area, else the ungrouped anchor.
fn place_items(
    next: &mut BTreeMap<BubbleId, Bubble>,
    kind: BubbleKind,
    workstream_angles: &BTreeMap<BubbleId, f64>,
    area_angles: &BTreeMap<BubbleId, f64>,
    rings: &RingTable,
    cfg: &LayoutConfig,
) -> usize {
    let mut groups: BTreeMap<ClusterKey, BTreeSet<BubbleId>> = BTreeMap::new();
    for bubble in next.values() {
        if bubble.kind != kind || !bubble.placement.is_auto() {
            continue;
        }
        let key = match (bubble.parent_ref, bubble.area_ref) {
            (Some(parent), _) if workstream_angles.contains_key(&parent) => {
                ClusterKey::Parent(parent)
            }
            (_, Some(area)) if area_angles.contains_key(&area) => ClusterKey::Area(area),
            _ => ClusterKey::Ungrouped,
        };
        groups.entry(key).or_default().insert(bubble.id);
    }

    let spec = rings.spec(kind);
    for (key, ids) in &groups {
        let (anchor, wedge) = match key {
            ClusterKey::Parent(parent) => (workstream_angles[parent], cfg.parent_cluster_wedge),
            ClusterKey::Area(area) => (area_angles[area], cfg.area_cluster_wedge),
            ClusterKey::Ungrouped => (cfg.ungrouped_anchor, cfg.ungrouped_wedge),
        };
        let mut members: Vec<&mut Bubble> = next
            .values_mut()
            .filter(|bubble| ids.contains(&bubble.id))
            .collect();
        spread_cluster(&mut members, anchor, spec.radius, spec.base_size, wedge, cfg.min_spacing);
    }
    groups.len()
}

fn place_visions(
    next: &mut BTreeMap<BubbleId, Bubble>,
    rings: &RingTable,
    cfg: &LayoutConfig,
) -> usize {
    let mut members: Vec<&mut Bubble> = next
        .values_mut()
        .filter(|bubble| bubble.kind == BubbleKind::Vision && bubble.placement.is_auto())
        .collect();
    if members.is_empty() {
        return 0;
    }
    let spec = rings.spec(BubbleKind::Vision);
    spread_cluster(
        &mut members,
        cfg.ungrouped_anchor,
        spec.radius,
        spec.base_size,
        cfg.ungrouped_wedge,
        cfg.min_spacing,
    );
    1
}

/// Projects and processes share one cluster; a process ring configured
/// apart from the project ring keeps its own radius and size.
fn snap_to_own_ring(bubble: &mut Bubble, cluster_spec: RingSpec, rings: &RingTable) {
    let own = rings.spec(bubble.kind);
    if own == cluster_spec {
        return;
    }
    if let Some(angle) = bubble.angle() {
        bubble.position = Some(Position::from_polar(own.radius, angle));
        bubble.size = Some(own.base_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bubble::Placement;
    use std::f64::consts::FRAC_PI_2;
    use uuid::Uuid;

    fn map(bubbles: Vec<Bubble>) -> BTreeMap<BubbleId, Bubble> {
        bubbles.into_iter().map(|bubble| (bubble.id, bubble)).collect()
    }

    #[test]
    fn single_area_lands_on_top() {
        let area = Bubble::new(Uuid::new_v4(), BubbleKind::Area, "Health");
        let id = area.id;
        let out = reconcile(&map(vec![area]), &RingTable::default(), &LayoutConfig::default());
        let position = out[&id].position.expect("reconcile should place every bubble");
        assert!((position.angle() + FRAC_PI_2).abs() < 1e-12);
        assert_eq!(position.ring(), 260.0);
        assert_eq!(out[&id].size, Some(110.0));
    }

    #[test]
    fn locked_area_keeps_angle_and_anchors_projects() {
        let area = Bubble::new(Uuid::new_v4(), BubbleKind::Area, "Work")
            .with_position(Position::from_polar(260.0, 1.0), Placement::Locked);
        let project = Bubble::new(Uuid::new_v4(), BubbleKind::Project, "Launch").with_area(area.id);
        let (area_id, project_id) = (area.id, project.id);

        let out = reconcile(&map(vec![area, project]), &RingTable::default(), &LayoutConfig::default());
        assert_eq!(out[&area_id].angle(), Some(1.0));
        assert_eq!(out[&project_id].angle(), Some(1.0));
        assert_eq!(out[&project_id].position.expect("reconcile should place every bubble").ring(), 285.0);
    }

    #[test]
    fn process_ring_override_is_respected_inside_shared_cluster() {
        let rings = RingTable::default().with(BubbleKind::Process, RingSpec::new(300.0, 40.0));
        let area = Bubble::new(Uuid::new_v4(), BubbleKind::Area, "Home");
        let project = Bubble::new(Uuid::new_v4(), BubbleKind::Project, "A").with_area(area.id);
        let process = Bubble::new(Uuid::new_v4(), BubbleKind::Process, "B").with_area(area.id);
        let (project_id, process_id) = (project.id, process.id);

        let out = reconcile(&map(vec![area, project, process]), &rings, &LayoutConfig::default());
        assert_eq!(out[&project_id].position.expect("reconcile should place every bubble").ring(), 285.0);
        assert_eq!(out[&process_id].position.expect("reconcile should place every bubble").ring(), 300.0);
        assert_eq!(out[&process_id].size, Some(40.0));
    }

    #[test]
    fn visions_are_spread_on_their_ring() {
        let a = Bubble::new(Uuid::new_v4(), BubbleKind::Vision, "a");
        let b = Bubble::new(Uuid::new_v4(), BubbleKind::Vision, "b");
        let (a_id, b_id) = (a.id, b.id);
        let out = reconcile(&map(vec![a, b]), &RingTable::default(), &LayoutConfig::default());
        assert_ne!(out[&a_id].angle(), out[&b_id].angle());
        assert_eq!(out[&a_id].position.expect("reconcile should place every bubble").ring(), 320.0);
    }
}
