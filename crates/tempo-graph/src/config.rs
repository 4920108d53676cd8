// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Construction-time configuration for a [`Graph`](crate::Graph).
//!
//! Every switch that influences behaviour lives on [`GraphConfig`] and is
//! handed to the components that need it when the graph is built. Nothing in
//! the crate reads ambient or global state.

use crate::registry::LabelKind;
use crate::version::VersionRange;

/// How time keys are represented for dynamic attributes and the temporal
/// index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeRepresentation {
    /// Values are stamped with single points in time.
    #[default]
    Timestamp,
    /// Values are stamped with intervals.
    Interval,
}

/// Graph construction options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphConfig {
    /// Time-key flavour used by dynamic columns and the temporal indices.
    pub time_representation: TimeRepresentation,
    /// Label type accepted by the edge-type registry.
    pub edge_label_kind: LabelKind,
    /// Hold the graph read lock for the full lifetime of lazy temporal
    /// queries. When disabled, queries collect their result under a momentary
    /// lock and keep nothing locked afterwards.
    pub auto_locking: bool,
    /// Allow creation of graph, column and table observers.
    pub observers_enabled: bool,
    /// Index edge time keys in addition to node time keys.
    pub index_edges: bool,
    /// Bounds of the node/edge version counters.
    pub version_range: VersionRange,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            time_representation: TimeRepresentation::Timestamp,
            edge_label_kind: LabelKind::String,
            auto_locking: true,
            observers_enabled: true,
            index_edges: true,
            version_range: VersionRange::FULL,
        }
    }
}

impl GraphConfig {
    /// Returns the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the time representation.
    pub fn with_time_representation(mut self, repr: TimeRepresentation) -> Self {
        self.time_representation = repr;
        self
    }

    /// Selects the edge label type.
    pub fn with_edge_label_kind(mut self, kind: LabelKind) -> Self {
        self.edge_label_kind = kind;
        self
    }

    /// Enables or disables traversal-long read locking.
    pub fn with_auto_locking(mut self, enabled: bool) -> Self {
        self.auto_locking = enabled;
        self
    }

    /// Enables or disables observers.
    pub fn with_observers(mut self, enabled: bool) -> Self {
        self.observers_enabled = enabled;
        self
    }

    /// Enables or disables edge time-key indexing.
    pub fn with_edge_index(mut self, enabled: bool) -> Self {
        self.index_edges = enabled;
        self
    }

    /// Overrides the version counter bounds.
    pub fn with_version_range(mut self, range: VersionRange) -> Self {
        self.version_range = range;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = GraphConfig::new()
            .with_time_representation(TimeRepresentation::Interval)
            .with_edge_label_kind(LabelKind::Int)
            .with_auto_locking(false)
            .with_observers(false)
            .with_edge_index(false);
        assert_eq!(cfg.time_representation, TimeRepresentation::Interval);
        assert_eq!(cfg.edge_label_kind, LabelKind::Int);
        assert!(!cfg.auto_locking);
        assert!(!cfg.observers_enabled);
        assert!(!cfg.index_edges);
        assert_eq!(cfg.version_range, VersionRange::FULL);
    }
}
