//! Even angular spacing for one sibling cluster.
//!
//! The spreader knows nothing about locking. Callers pass only the bubbles
//! that may move.

use super::geometry::signed_angle_difference;
use crate::model::bubble::{Bubble, Position};
use std::cmp::Ordering;
use std::f64::consts::PI;

const MIN_CLUSTER_SPAN: f64 = 0.6;
const SPAN_PER_MEMBER: f64 = 0.85;
const WIDE_WEDGE_FILL_RATIO: f64 = 0.9;

/// Lays `members` out on `radius` around `center` inside `wedge`.
///
/// Members keep their relative order: sorted by current offset from
/// `center`, unplaced members after placed ones, ties broken by title and
/// then id. Neighbours end up at least `min_spacing` apart, even if that
/// overflows the wedge.
pub fn spread_cluster(
    members: &mut [&mut Bubble],
    center: f64,
    radius: f64,
    base_size: f64,
    wedge: f64,
    min_spacing: f64,
) {
    if members.is_empty() {
        return;
    }

    members.sort_by(|a, b| cluster_order(a, b, center));

    if members.len() == 1 {
        let only = &mut members[0];
        only.position = Some(Position::from_polar(radius, center));
        only.size = Some(base_size);
        return;
    }

    let count = members.len() as f64;
    let desired = MIN_CLUSTER_SPAN.max(count * SPAN_PER_MEMBER);
    let mut span = wedge.min(desired);
    if wedge > PI && desired < wedge * WIDE_WEDGE_FILL_RATIO {
        span = wedge;
    }

    let step = (span / (count - 1.0)).max(min_spacing);
    let start = center - step * (count - 1.0) / 2.0;

    for (index, member) in members.iter_mut().enumerate() {
        let angle = start + index as f64 * step;
        member.position = Some(Position::from_polar(radius, angle));
        member.size = Some(base_size);
    }
}

fn cluster_order(a: &Bubble, b: &Bubble, center: f64) -> Ordering {
    let offset_a = a.angle().map(|angle| signed_angle_difference(angle, center));
    let offset_b = b.angle().map(|angle| signed_angle_difference(angle, center));
    let by_offset = match (offset_a, offset_b) {
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_offset
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}
