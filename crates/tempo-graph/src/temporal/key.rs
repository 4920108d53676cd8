// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Time keys: timestamps and intervals.
//!
//! The temporal index is generic over [`TimeKey`]. A key type supplies its
//! validity check, its bounds, a total order (primarily by low bound), and the
//! two lookup strategies the index needs: which stored keys match a point, and
//! which match a range. [`Timestamp`] and [`Interval`] are the two
//! instantiations.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use thiserror::Error;

use crate::config::TimeRepresentation;

/// Position of a time key in the slot-indexed entry arrays.
pub type Slot = usize;

/// Invalid-argument errors for time keys and queries.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TimeKeyError {
    /// NaN was supplied where a time value was required.
    #[error("time value is NaN")]
    NaN,
    /// An infinite value was supplied where a finite timestamp was required.
    #[error("timestamp must be finite, got {0}")]
    NonFinite(f64),
    /// Interval low bound exceeds its high bound.
    #[error("interval low bound {low} exceeds high bound {high}")]
    Inverted {
        /// Low bound.
        low: f64,
        /// High bound.
        high: f64,
    },
    /// Degenerate interval with an excluded endpoint; it contains no point.
    #[error("interval ({low}, {high}) is empty")]
    Empty {
        /// Low bound.
        low: f64,
        /// High bound.
        high: f64,
    },
    /// A key of the other representation was supplied.
    #[error("time key representation mismatch: expected {expected:?}, found {found:?}")]
    RepresentationMismatch {
        /// Representation configured for the graph.
        expected: TimeRepresentation,
        /// Representation of the rejected key.
        found: TimeRepresentation,
    },
}

/// Checks a query point: NaN and infinities are rejected, `-0.0` comes back
/// as `0.0`.
pub fn check_point(t: f64) -> Result<f64, TimeKeyError> {
    if t.is_nan() {
        Err(TimeKeyError::NaN)
    } else if t.is_infinite() {
        Err(TimeKeyError::NonFinite(t))
    } else {
        Ok(canonical_zero(t))
    }
}

/// Folds `-0.0` into `0.0` so keys that compare equal numerically also compare
/// equal under `total_cmp`.
fn canonical_zero(t: f64) -> f64 {
    t + 0.0
}

/// Capability set the temporal index needs from a time key type.
pub trait TimeKey: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Representation this key type implements.
    const REPRESENTATION: TimeRepresentation;

    /// Rejects keys that must never enter the index.
    fn validate(&self) -> Result<(), TimeKeyError>;

    /// Lowest point covered by the key.
    fn low(&self) -> f64;

    /// Highest point covered by the key.
    fn high(&self) -> f64;

    /// Slots of stored keys that cover `point`, in key order.
    fn slots_at(map: &BTreeMap<Self, Slot>, point: f64) -> Vec<Slot>;

    /// Slots of stored keys that overlap `range`, in key order.
    fn slots_within(map: &BTreeMap<Self, Slot>, range: &Interval) -> Vec<Slot>;
}

/// A single finite point in time.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Timestamp(f64);

impl Timestamp {
    /// Builds a timestamp, rejecting NaN and infinities.
    ///
    /// # Errors
    /// [`TimeKeyError::NaN`] or [`TimeKeyError::NonFinite`].
    pub fn new(t: f64) -> Result<Self, TimeKeyError> {
        check_point(t).map(Self)
    }

    /// The point in time.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TimeKey for Timestamp {
    const REPRESENTATION: TimeRepresentation = TimeRepresentation::Timestamp;

    fn validate(&self) -> Result<(), TimeKeyError> {
        check_point(self.0).map(|_| ())
    }

    fn low(&self) -> f64 {
        self.0
    }

    fn high(&self) -> f64 {
        self.0
    }

    fn slots_at(map: &BTreeMap<Self, Slot>, point: f64) -> Vec<Slot> {
        map.get(&Self(canonical_zero(point)))
            .copied()
            .into_iter()
            .collect()
    }

    fn slots_within(map: &BTreeMap<Self, Slot>, range: &Interval) -> Vec<Slot> {
        let low = Self(canonical_zero(range.low));
        let high = Self(canonical_zero(range.high));
        // `BTreeMap::range` panics on an inverted or empty-exclusive range.
        match low.cmp(&high) {
            Ordering::Greater => return Vec::new(),
            Ordering::Equal if !(range.low_inclusive && range.high_inclusive) => return Vec::new(),
            _ => {}
        }
        let lower = if range.low_inclusive {
            Bound::Included(low)
        } else {
            Bound::Excluded(low)
        };
        let upper = if range.high_inclusive {
            Bound::Included(high)
        } else {
            Bound::Excluded(high)
        };
        map.range((lower, upper)).map(|(_, slot)| *slot).collect()
    }
}

/// A numeric interval with per-bound inclusivity.
///
/// Ordering is by low bound first, then high bound, then inclusivity, so the
/// sorted key map can stop scanning as soon as a low bound passes the query.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    low: f64,
    high: f64,
    low_inclusive: bool,
    high_inclusive: bool,
}

impl Interval {
    /// Closed interval `[low, high]`.
    ///
    /// # Errors
    /// See [`with_bounds`](Self::with_bounds).
    pub fn new(low: f64, high: f64) -> Result<Self, TimeKeyError> {
        Self::with_bounds(low, high, true, true)
    }

    /// Interval with explicit bound inclusivity. Infinite bounds are allowed.
    ///
    /// # Errors
    /// [`TimeKeyError::NaN`] for NaN bounds, [`TimeKeyError::Inverted`] when
    /// `low > high`, [`TimeKeyError::Empty`] when `low == high` with an
    /// excluded endpoint.
    pub fn with_bounds(
        low: f64,
        high: f64,
        low_inclusive: bool,
        high_inclusive: bool,
    ) -> Result<Self, TimeKeyError> {
        let interval = Self {
            low: canonical_zero(low),
            high: canonical_zero(high),
            low_inclusive,
            high_inclusive,
        };
        interval.validate()?;
        Ok(interval)
    }

    /// Unbounded interval covering every point.
    #[must_use]
    pub const fn everything() -> Self {
        Self {
            low: f64::NEG_INFINITY,
            high: f64::INFINITY,
            low_inclusive: true,
            high_inclusive: true,
        }
    }

    /// Low bound.
    #[must_use]
    pub fn low(&self) -> f64 {
        self.low
    }

    /// High bound.
    #[must_use]
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Returns `true` if `t` lies inside the interval.
    #[must_use]
    pub fn contains(&self, t: f64) -> bool {
        let above_low = if self.low_inclusive {
            t >= self.low
        } else {
            t > self.low
        };
        let below_high = if self.high_inclusive {
            t <= self.high
        } else {
            t < self.high
        };
        above_low && below_high
    }

    /// Returns `true` if the two intervals share at least one point.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let starts_before_other_ends = match self.low.partial_cmp(&other.high) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => self.low_inclusive && other.high_inclusive,
            _ => false,
        };
        let ends_after_other_starts = match self.high.partial_cmp(&other.low) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => self.high_inclusive && other.low_inclusive,
            _ => false,
        };
        starts_before_other_ends && ends_after_other_starts
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Interval {}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.low
            .total_cmp(&other.low)
            .then_with(|| self.high.total_cmp(&other.high))
            // An included low bound starts earlier than an excluded one.
            .then_with(|| other.low_inclusive.cmp(&self.low_inclusive))
            .then_with(|| self.high_inclusive.cmp(&other.high_inclusive))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.low_inclusive { '[' } else { '(' };
        let close = if self.high_inclusive { ']' } else { ')' };
        write!(f, "{open}{}, {}{close}", self.low, self.high)
    }
}

impl TimeKey for Interval {
    const REPRESENTATION: TimeRepresentation = TimeRepresentation::Interval;

    fn validate(&self) -> Result<(), TimeKeyError> {
        if self.low.is_nan() || self.high.is_nan() {
            return Err(TimeKeyError::NaN);
        }
        if self.low > self.high {
            return Err(TimeKeyError::Inverted {
                low: self.low,
                high: self.high,
            });
        }
        if self.low == self.high && !(self.low_inclusive && self.high_inclusive) {
            return Err(TimeKeyError::Empty {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn high(&self) -> f64 {
        self.high
    }

    // Linear in the number of keys starting at or before the point; no
    // augmented interval tree is kept.
    fn slots_at(map: &BTreeMap<Self, Slot>, point: f64) -> Vec<Slot> {
        map.iter()
            .take_while(|(key, _)| key.low <= point)
            .filter(|(key, _)| key.contains(point))
            .map(|(_, slot)| *slot)
            .collect()
    }

    fn slots_within(map: &BTreeMap<Self, Slot>, range: &Interval) -> Vec<Slot> {
        map.iter()
            .take_while(|(key, _)| key.low <= range.high)
            .filter(|(key, _)| key.intersects(range))
            .map(|(_, slot)| *slot)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_rejects_non_finite_values() {
        assert_eq!(Timestamp::new(f64::NAN), Err(TimeKeyError::NaN));
        assert_eq!(
            Timestamp::new(f64::INFINITY),
            Err(TimeKeyError::NonFinite(f64::INFINITY))
        );
        assert_eq!(Timestamp::new(1.5).unwrap().value(), 1.5);
    }

    #[test]
    fn interval_validation() {
        assert!(matches!(
            Interval::new(3.0, 1.0),
            Err(TimeKeyError::Inverted { .. })
        ));
        assert!(matches!(
            Interval::with_bounds(1.0, 1.0, true, false),
            Err(TimeKeyError::Empty { .. })
        ));
        assert!(Interval::new(1.0, 1.0).is_ok());
        assert_eq!(Interval::new(f64::NAN, 1.0), Err(TimeKeyError::NaN));
        assert!(Interval::new(f64::NEG_INFINITY, 0.0).is_ok());
    }

    #[test]
    fn interval_intersection_respects_inclusivity() {
        let a = Interval::new(0.0, 1.0).unwrap();
        let b = Interval::new(1.0, 2.0).unwrap();
        let open_b = Interval::with_bounds(1.0, 2.0, false, true).unwrap();
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&open_b));
        assert!(!open_b.intersects(&a));
        assert!(!open_b.contains(1.0));
        assert!(open_b.contains(2.0));
    }

    #[test]
    fn intervals_order_by_low_bound_first() {
        let a = Interval::new(0.0, 10.0).unwrap();
        let b = Interval::new(1.0, 2.0).unwrap();
        let c = Interval::with_bounds(0.0, 10.0, false, true).unwrap();
        assert!(a < b);
        assert!(a < c);
        assert!(c < b);
    }

    #[test]
    fn interval_point_lookup_scans_prefix() {
        let mut map = BTreeMap::new();
        map.insert(Interval::new(0.0, 5.0).unwrap(), 0);
        map.insert(Interval::new(2.0, 3.0).unwrap(), 1);
        map.insert(Interval::new(4.0, 9.0).unwrap(), 2);
        assert_eq!(Interval::slots_at(&map, 2.5), vec![0, 1]);
        assert_eq!(Interval::slots_at(&map, 4.5), vec![0, 2]);
        let query = Interval::new(3.5, 3.9).unwrap();
        assert_eq!(Interval::slots_within(&map, &query), vec![0]);
    }

    #[test]
    fn timestamp_range_lookup_respects_bounds() {
        let mut map = BTreeMap::new();
        for (slot, t) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            map.insert(Timestamp::new(t).unwrap(), slot);
        }
        let closed = Interval::new(1.0, 3.0).unwrap();
        assert_eq!(Timestamp::slots_within(&map, &closed), vec![0, 1, 2]);
        let half = Interval::with_bounds(1.0, 3.0, false, true).unwrap();
        assert_eq!(Timestamp::slots_within(&map, &half), vec![1, 2]);
        assert_eq!(Timestamp::slots_at(&map, 2.0), vec![1]);
        assert!(Timestamp::slots_at(&map, 2.5).is_empty());
    }

    #[test]
    fn negative_zero_is_the_same_key_as_zero() {
        assert_eq!(Timestamp::new(-0.0).unwrap(), Timestamp::new(0.0).unwrap());
        assert!(Timestamp::new(-0.0).unwrap().value().is_sign_positive());
        let flipped = Interval::new(0.0, -0.0).unwrap();
        assert!(flipped.low().is_sign_positive() && flipped.high().is_sign_positive());
        assert_eq!(flipped, Interval::new(0.0, 0.0).unwrap());
    }

    #[test]
    fn timestamp_range_lookup_never_inverts_the_map_range() {
        let mut map = BTreeMap::new();
        map.insert(Timestamp::new(0.0).unwrap(), 0);
        let zero = Interval::new(0.0, -0.0).unwrap();
        assert_eq!(Timestamp::slots_within(&map, &zero), vec![0]);
        assert_eq!(Timestamp::slots_at(&map, -0.0), vec![0]);

        let inverted = Interval {
            low: 0.0,
            high: -0.0,
            low_inclusive: true,
            high_inclusive: true,
        };
        assert_eq!(Timestamp::slots_within(&map, &inverted), vec![0]);
        let empty = Interval {
            low: 1.0,
            high: 1.0,
            low_inclusive: false,
            high_inclusive: true,
        };
        assert!(Timestamp::slots_within(&map, &empty).is_empty());
    }
}
