// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Monotonic structural version counters.
//!
//! A [`VersionCounter`] carries two independent signed counters, one for node
//! mutations and one for edge mutations. Graph observers compare a captured
//! `(node, edge)` pair against the live counters to answer "has anything
//! changed" without touching the element stores.
//!
//! # Wraparound
//!
//! Counters never overflow. When an increment reaches [`VersionRange::max`]
//! the counter restarts at [`VersionRange::min`] and the increment reports
//! [`VersionStep::wrapped`]. The owner must then reset every dependent
//! observer baseline before releasing its write lock; a reset baseline always
//! compares as changed, so no observer can mistake the restarted value for
//! one it has already seen.

/// Inclusive lower / exclusive upper bound of a version counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionRange {
    min: i32,
    max: i32,
}

impl VersionRange {
    /// Full `i32` range.
    pub const FULL: Self = Self {
        min: i32::MIN,
        max: i32::MAX,
    };

    /// Builds a custom range, or `None` when `min >= max`.
    #[must_use]
    pub const fn new(min: i32, max: i32) -> Option<Self> {
        if min < max {
            Some(Self { min, max })
        } else {
            None
        }
    }

    /// Initial (and post-wrap) counter value.
    #[must_use]
    pub const fn min(&self) -> i32 {
        self.min
    }

    /// Value at which the counter wraps back to [`min`](Self::min).
    #[must_use]
    pub const fn max(&self) -> i32 {
        self.max
    }

    /// Number of increments after which a counter is back at its initial value.
    #[must_use]
    pub fn period(&self) -> u64 {
        (i64::from(self.max) - i64::from(self.min)).unsigned_abs()
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// Result of a single increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionStep {
    /// Counter value after the increment.
    pub value: i32,
    /// `true` when the increment restarted the counter at its initial value.
    pub wrapped: bool,
}

/// Counter axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VersionAxis {
    /// Node mutations.
    Node,
    /// Edge mutations.
    Edge,
}

/// Snapshot of both counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VersionPair {
    /// Node counter.
    pub node: i32,
    /// Edge counter.
    pub edge: i32,
}

/// Node and edge version counters of one graph or view.
#[derive(Clone, Debug)]
pub struct VersionCounter {
    range: VersionRange,
    node: i32,
    edge: i32,
}

impl Default for VersionCounter {
    fn default() -> Self {
        Self::new(VersionRange::FULL)
    }
}

impl VersionCounter {
    /// Creates a counter pair at the range's initial value.
    #[must_use]
    pub fn new(range: VersionRange) -> Self {
        Self {
            range,
            node: range.min,
            edge: range.min,
        }
    }

    /// Configured bounds.
    #[must_use]
    pub fn range(&self) -> VersionRange {
        self.range
    }

    /// Current node counter.
    #[must_use]
    pub fn node(&self) -> i32 {
        self.node
    }

    /// Current edge counter.
    #[must_use]
    pub fn edge(&self) -> i32 {
        self.edge
    }

    /// Both counters at once.
    #[must_use]
    pub fn pair(&self) -> VersionPair {
        VersionPair {
            node: self.node,
            edge: self.edge,
        }
    }

    /// Increments the node counter.
    pub fn increment_node(&mut self) -> VersionStep {
        Self::step(&mut self.node, self.range)
    }

    /// Increments the edge counter.
    pub fn increment_edge(&mut self) -> VersionStep {
        Self::step(&mut self.edge, self.range)
    }

    /// Increments the counter for `axis`.
    pub fn increment(&mut self, axis: VersionAxis) -> VersionStep {
        match axis {
            VersionAxis::Node => self.increment_node(),
            VersionAxis::Edge => self.increment_edge(),
        }
    }

    fn step(counter: &mut i32, range: VersionRange) -> VersionStep {
        // `counter < max` holds between calls, so the add cannot overflow.
        let next = counter.saturating_add(1);
        if next >= range.max {
            *counter = range.min;
            VersionStep {
                value: range.min,
                wrapped: true,
            }
        } else {
            *counter = next;
            VersionStep {
                value: next,
                wrapped: false,
            }
        }
    }
}

/// Baseline held by a graph observer.
///
/// `Reset` is the sentinel installed on counter wraparound; it never equals a
/// live counter pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionBaseline {
    /// Last pair the observer compared against.
    Seen(VersionPair),
    /// Forced-changed sentinel.
    Reset,
}

impl VersionBaseline {
    /// Returns `true` when `current` differs from this baseline.
    #[must_use]
    pub fn differs_from(&self, current: VersionPair) -> bool {
        match self {
            Self::Seen(seen) => *seen != current,
            Self::Reset => true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn increments_are_strictly_monotonic_until_wrap() {
        let mut counter = VersionCounter::new(VersionRange::new(0, 4).unwrap());
        let values: Vec<_> = (0..3).map(|_| counter.increment_node().value).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(counter.edge(), 0, "axes are independent");
    }

    #[test]
    fn full_period_returns_to_initial_value() {
        let range = VersionRange::new(-3, 5).unwrap();
        let mut counter = VersionCounter::new(range);
        let mut wraps = 0;
        for _ in 0..range.period() {
            if counter.increment_edge().wrapped {
                wraps += 1;
            }
        }
        assert_eq!(counter.edge(), range.min());
        assert_eq!(wraps, 1, "wrap must be reported exactly once per period");
    }

    #[test]
    fn full_i32_range_wraps_without_overflow() {
        let mut counter = VersionCounter::new(VersionRange::FULL);
        counter.node = i32::MAX - 1;
        let step = counter.increment_node();
        assert!(step.wrapped);
        assert_eq!(step.value, i32::MIN);
        assert_eq!(VersionRange::FULL.period(), u64::from(u32::MAX));
    }

    #[test]
    fn reset_baseline_always_differs() {
        let pair = VersionPair { node: 1, edge: 2 };
        assert!(VersionBaseline::Reset.differs_from(pair));
        assert!(!VersionBaseline::Seen(pair).differs_from(pair));
    }

    #[test]
    fn degenerate_range_is_rejected() {
        assert!(VersionRange::new(3, 3).is_none());
        assert!(VersionRange::new(4, 1).is_none());
    }
}
