//! First-angle allocation for a bubble joining an existing sibling set.

use super::geometry::{angle_difference, normalize_angle};
use super::LayoutConfig;
use std::f64::consts::TAU;

/// Picks the least crowded angle near `anchor` using default tuning.
pub fn next_angle(existing: &[f64], anchor: f64, wedge: f64) -> f64 {
    next_angle_with(existing, anchor, wedge, &LayoutConfig::default())
}

/// Picks the least crowded angle near `anchor`.
///
/// Every gap between angularly adjacent siblings (including the wrap-around
/// gap) proposes its midpoint. Midpoints farther than `wedge / 2` from the
/// anchor are dropped unless the wedge is a full circle. The survivor with
/// the best `gap - weight * distance_to_anchor` wins.
///
/// When nothing survives, the anchor itself is returned and the new bubble
/// may overlap a sibling. Crowded layouts degrade instead of failing.
pub fn next_angle_with(existing: &[f64], anchor: f64, wedge: f64, cfg: &LayoutConfig) -> f64 {
    let anchor = normalize_angle(anchor);
    let mut sorted: Vec<f64> = existing
        .iter()
        .copied()
        .filter(|angle| angle.is_finite())
        .map(normalize_angle)
        .collect();
    if sorted.is_empty() {
        return anchor;
    }
    sorted.sort_by(f64::total_cmp);

    let mut best = anchor;
    let mut best_score = f64::NEG_INFINITY;

    for (index, &current) in sorted.iter().enumerate() {
        let next = match sorted.get(index + 1) {
            Some(&next) => next,
            None => sorted[0] + TAU,
        };
        let gap = next - current;
        if gap <= cfg.min_allocator_gap {
            continue;
        }

        let candidate = normalize_angle(current + gap / 2.0);
        let distance = angle_difference(candidate, anchor);
        if wedge < TAU && distance > wedge / 2.0 {
            continue;
        }

        let score = gap - distance * cfg.anchor_proximity_weight;
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }

    best
}
