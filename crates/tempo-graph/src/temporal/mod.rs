// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Temporal indices: which elements are live at a given time.
//!
//! - [`key`]: the [`TimeKey`] capability and its two instantiations,
//!   [`Timestamp`] and [`Interval`].
//! - [`index`]: per-scope slot → element-set arrays.
//! - [`store`]: the sorted key map owning the main and per-view indices.
//! - [`query`]: lazy, lock-holding result sequences.
//!
//! The graph picks one representation at construction time
//! ([`TimeRepresentation`]); [`TemporalStore`] and [`TimeKeyValue`] carry that
//! choice at runtime by enum dispatch onto the generic store.

pub mod index;
pub mod key;
pub mod query;
pub mod store;

pub use index::{IndexEntry, TemporalIndex};
pub use key::{check_point, Interval, Slot, TimeKey, TimeKeyError, Timestamp};
pub use query::{IndexSource, SlotCursor, TimeQuery};
pub use store::{IndexScope, TemporalIndexStore};

use std::fmt;

use crate::config::TimeRepresentation;
use crate::ident::ViewId;

/// A time key of either representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimeKeyValue {
    /// Point key.
    Timestamp(Timestamp),
    /// Interval key.
    Interval(Interval),
}

impl TimeKeyValue {
    /// Representation of this key.
    #[must_use]
    pub fn representation(&self) -> TimeRepresentation {
        match self {
            Self::Timestamp(_) => TimeRepresentation::Timestamp,
            Self::Interval(_) => TimeRepresentation::Interval,
        }
    }

    /// Point key at `t`.
    ///
    /// # Errors
    /// See [`Timestamp::new`].
    pub fn at(t: f64) -> Result<Self, TimeKeyError> {
        Timestamp::new(t).map(Self::Timestamp)
    }

    /// Closed interval key.
    ///
    /// # Errors
    /// See [`Interval::new`].
    pub fn span(low: f64, high: f64) -> Result<Self, TimeKeyError> {
        Interval::new(low, high).map(Self::Interval)
    }
}

impl From<Timestamp> for TimeKeyValue {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Interval> for TimeKeyValue {
    fn from(value: Interval) -> Self {
        Self::Interval(value)
    }
}

impl fmt::Display for TimeKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(t) => t.fmt(f),
            Self::Interval(i) => i.fmt(f),
        }
    }
}

/// Temporal index store of the representation chosen at construction.
#[derive(Clone, Debug)]
pub enum TemporalStore<E> {
    /// Point-keyed store.
    Timestamp(TemporalIndexStore<Timestamp, E>),
    /// Interval-keyed store.
    Interval(TemporalIndexStore<Interval, E>),
}

fn mismatch(expected: TimeRepresentation, key: &TimeKeyValue) -> TimeKeyError {
    TimeKeyError::RepresentationMismatch {
        expected,
        found: key.representation(),
    }
}

impl<E: Ord + Copy> TemporalStore<E> {
    /// Empty store for `repr`.
    #[must_use]
    pub fn new(repr: TimeRepresentation) -> Self {
        match repr {
            TimeRepresentation::Timestamp => Self::Timestamp(TemporalIndexStore::new()),
            TimeRepresentation::Interval => Self::Interval(TemporalIndexStore::new()),
        }
    }

    /// Representation of the keys held.
    #[must_use]
    pub fn representation(&self) -> TimeRepresentation {
        match self {
            Self::Timestamp(_) => TimeRepresentation::Timestamp,
            Self::Interval(_) => TimeRepresentation::Interval,
        }
    }

    /// Rejects keys of the other representation or with invalid bounds.
    ///
    /// # Errors
    /// [`TimeKeyError::RepresentationMismatch`] or the key's own validation
    /// error.
    pub fn check(&self, key: &TimeKeyValue) -> Result<(), TimeKeyError> {
        match (self, key) {
            (Self::Timestamp(_), TimeKeyValue::Timestamp(k)) => k.validate(),
            (Self::Interval(_), TimeKeyValue::Interval(k)) => k.validate(),
            _ => Err(mismatch(self.representation(), key)),
        }
    }

    /// See [`TemporalIndexStore::add`].
    ///
    /// # Errors
    /// See [`check`](Self::check).
    pub fn add(
        &mut self,
        key: TimeKeyValue,
        element: E,
        views: impl IntoIterator<Item = ViewId>,
    ) -> Result<Slot, TimeKeyError> {
        match (self, key) {
            (Self::Timestamp(store), TimeKeyValue::Timestamp(k)) => store.add(k, element, views),
            (Self::Interval(store), TimeKeyValue::Interval(k)) => store.add(k, element, views),
            (this, key) => Err(mismatch(this.representation(), &key)),
        }
    }

    /// See [`TemporalIndexStore::remove`].
    ///
    /// # Errors
    /// See [`check`](Self::check).
    pub fn remove(
        &mut self,
        key: TimeKeyValue,
        element: &E,
        views: impl IntoIterator<Item = ViewId>,
    ) -> Result<bool, TimeKeyError> {
        match (self, key) {
            (Self::Timestamp(store), TimeKeyValue::Timestamp(k)) => {
                store.remove(k, element, views)
            }
            (Self::Interval(store), TimeKeyValue::Interval(k)) => store.remove(k, element, views),
            (this, key) => Err(mismatch(this.representation(), &key)),
        }
    }

    /// See [`TemporalIndexStore::ensure_view_index`].
    pub fn ensure_view_index(&mut self, view: ViewId, member: impl Fn(&E) -> bool) {
        match self {
            Self::Timestamp(store) => store.ensure_view_index(view, member),
            Self::Interval(store) => store.ensure_view_index(view, member),
        }
    }

    /// See [`TemporalIndexStore::admit_to_view`]. Keys of the other
    /// representation are ignored.
    pub fn admit_to_view(&mut self, view: ViewId, key: &TimeKeyValue, element: E) {
        match (self, key) {
            (Self::Timestamp(store), TimeKeyValue::Timestamp(k)) => {
                store.admit_to_view(view, k, element);
            }
            (Self::Interval(store), TimeKeyValue::Interval(k)) => {
                store.admit_to_view(view, k, element);
            }
            _ => {}
        }
    }

    /// See [`TemporalIndexStore::evict_from_view`].
    pub fn evict_from_view(&mut self, view: ViewId, key: &TimeKeyValue, element: &E) {
        match (self, key) {
            (Self::Timestamp(store), TimeKeyValue::Timestamp(k)) => {
                store.evict_from_view(view, k, element);
            }
            (Self::Interval(store), TimeKeyValue::Interval(k)) => {
                store.evict_from_view(view, k, element);
            }
            _ => {}
        }
    }

    /// See [`TemporalIndexStore::delete_view_index`].
    pub fn delete_view_index(&mut self, view: ViewId) -> bool {
        match self {
            Self::Timestamp(store) => store.delete_view_index(view),
            Self::Interval(store) => store.delete_view_index(view),
        }
    }

    /// See [`TemporalIndexStore::index`].
    #[must_use]
    pub fn index(&self, scope: IndexScope) -> Option<&TemporalIndex<E>> {
        match self {
            Self::Timestamp(store) => store.index(scope),
            Self::Interval(store) => store.index(scope),
        }
    }

    /// See [`TemporalIndexStore::slots_at`].
    ///
    /// # Errors
    /// [`TimeKeyError`] for NaN or infinite points.
    pub fn slots_at(&self, scope: IndexScope, point: f64) -> Result<Vec<Slot>, TimeKeyError> {
        match self {
            Self::Timestamp(store) => store.slots_at(scope, point),
            Self::Interval(store) => store.slots_at(scope, point),
        }
    }

    /// See [`TemporalIndexStore::slots_within`].
    #[must_use]
    pub fn slots_within(&self, scope: IndexScope, range: &Interval) -> Vec<Slot> {
        match self {
            Self::Timestamp(store) => store.slots_within(scope, range),
            Self::Interval(store) => store.slots_within(scope, range),
        }
    }

    /// See [`TemporalIndexStore::min_timestamp`].
    #[must_use]
    pub fn min_timestamp(&self, scope: IndexScope) -> f64 {
        match self {
            Self::Timestamp(store) => store.min_timestamp(scope),
            Self::Interval(store) => store.min_timestamp(scope),
        }
    }

    /// See [`TemporalIndexStore::max_timestamp`].
    #[must_use]
    pub fn max_timestamp(&self, scope: IndexScope) -> f64 {
        match self {
            Self::Timestamp(store) => store.max_timestamp(scope),
            Self::Interval(store) => store.max_timestamp(scope),
        }
    }

    /// See [`TemporalIndexStore::clear`].
    pub fn clear(&mut self) {
        match self {
            Self::Timestamp(store) => store.clear(),
            Self::Interval(store) => store.clear(),
        }
    }
}
