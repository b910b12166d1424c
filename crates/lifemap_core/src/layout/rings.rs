//! Per-kind ring radius and base bubble size.

use crate::model::bubble::BubbleKind;
use std::collections::BTreeMap;

/// Radius and default diameter for one bubble kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSpec {
    pub radius: f64,
    pub base_size: f64,
}

impl RingSpec {
    pub const fn new(radius: f64, base_size: f64) -> Self {
        Self { radius, base_size }
    }
}

/// Static ring configuration keyed by bubble kind.
///
/// A missing entry is a configuration bug: `spec` panics instead of
/// guessing a radius.
#[derive(Debug, Clone, PartialEq)]
pub struct RingTable {
    entries: BTreeMap<BubbleKind, RingSpec>,
}

impl Default for RingTable {
    fn default() -> Self {
        Self::empty()
            .with(BubbleKind::Area, RingSpec::new(260.0, 110.0))
            .with(BubbleKind::Project, RingSpec::new(285.0, 46.0))
            .with(BubbleKind::Process, RingSpec::new(285.0, 46.0))
            .with(BubbleKind::Task, RingSpec::new(320.0, 30.0))
            .with(BubbleKind::Idea, RingSpec::new(360.0, 26.0))
            .with(BubbleKind::Vision, RingSpec::new(320.0, 56.0))
    }
}

impl RingTable {
    /// Table with no entries; every lookup panics until kinds are added.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds or replaces the entry for `kind`.
    pub fn with(mut self, kind: BubbleKind, spec: RingSpec) -> Self {
        self.entries.insert(kind, spec);
        self
    }

    pub fn get(&self, kind: BubbleKind) -> Option<RingSpec> {
        self.entries.get(&kind).copied()
    }

    /// # Panics
    /// Panics when `kind` has no configured entry.
    pub fn spec(&self, kind: BubbleKind) -> RingSpec {
        match self.get(kind) {
            Some(spec) => spec,
            None => panic!("ring table has no entry for bubble kind `{kind}`"),
        }
    }

    pub fn radius(&self, kind: BubbleKind) -> f64 {
        self.spec(kind).radius
    }

    pub fn base_size(&self, kind: BubbleKind) -> f64 {
        self.spec(kind).base_size
    }
}
