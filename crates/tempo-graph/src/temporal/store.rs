// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Owner of the sorted time-key map and of every per-scope index.
//!
//! [`TemporalIndexStore`] assigns each distinct time key a slot the first time
//! the key is seen. Slots are handed out monotonically and never reused, even
//! after every element has left the key, so the slot-indexed entry arrays of
//! all scopes only ever grow at the end. The key map is sorted, which is what
//! point, range and extreme-bound queries walk.
//!
//! There is exactly one main index (the whole store) and any number of view
//! indices. A view index is only ever fed by replaying an add/remove that is
//! also applied to the main index (or by copying the main index's references),
//! so its membership is a subset of the main index at every slot.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::index::TemporalIndex;
use super::key::{check_point, Interval, Slot, TimeKey, TimeKeyError};
use crate::config::TimeRepresentation;
use crate::ident::ViewId;

/// Which index of a store a query addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IndexScope {
    /// The main index covering the whole store.
    Main,
    /// The sub-index of a view.
    View(ViewId),
}

/// Sorted key map plus main and per-view indices for one element kind.
#[derive(Clone, Debug)]
pub struct TemporalIndexStore<K, E> {
    sorted: BTreeMap<K, Slot>,
    keys: Vec<K>,
    main: TemporalIndex<E>,
    views: FxHashMap<ViewId, TemporalIndex<E>>,
}

impl<K, E> Default for TemporalIndexStore<K, E> {
    fn default() -> Self {
        Self {
            sorted: BTreeMap::new(),
            keys: Vec::new(),
            main: TemporalIndex::default(),
            views: FxHashMap::default(),
        }
    }
}

impl<K: TimeKey, E: Ord + Copy> TemporalIndexStore<K, E> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Time representation of the keys held by this store.
    #[must_use]
    pub fn representation(&self) -> TimeRepresentation {
        K::REPRESENTATION
    }

    /// Number of slots ever assigned.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.keys.len()
    }

    /// Key owning `slot`.
    #[must_use]
    pub fn key(&self, slot: Slot) -> Option<K> {
        self.keys.get(slot).copied()
    }

    /// Slot assigned to `key`, if any.
    #[must_use]
    pub fn slot(&self, key: &K) -> Option<Slot> {
        self.sorted.get(key).copied()
    }

    fn slot_or_assign(&mut self, key: K) -> Slot {
        if let Some(slot) = self.sorted.get(&key) {
            return *slot;
        }
        let slot = self.keys.len();
        self.keys.push(key);
        self.sorted.insert(key, slot);
        trace!(slot, key = ?key, "assigned temporal slot");
        slot
    }

    /// Index for `scope`, if it exists.
    #[must_use]
    pub fn index(&self, scope: IndexScope) -> Option<&TemporalIndex<E>> {
        match scope {
            IndexScope::Main => Some(&self.main),
            IndexScope::View(view) => self.views.get(&view),
        }
    }

    /// Returns `true` if a sub-index exists for `view`.
    #[must_use]
    pub fn has_view_index(&self, view: ViewId) -> bool {
        self.views.contains_key(&view)
    }

    /// Registers one reference of `element` at `key` in the main index and in
    /// the existing sub-index of every view in `views`.
    ///
    /// Views without a sub-index are skipped; their index is built from the
    /// main index when first needed.
    ///
    /// # Errors
    /// Returns [`TimeKeyError`] for invalid keys; nothing is modified then.
    pub fn add(
        &mut self,
        key: K,
        element: E,
        views: impl IntoIterator<Item = ViewId>,
    ) -> Result<Slot, TimeKeyError> {
        key.validate()?;
        let slot = self.slot_or_assign(key);
        self.main.add(slot, element);
        for view in views {
            if let Some(index) = self.views.get_mut(&view) {
                index.add(slot, element);
            }
        }
        Ok(slot)
    }

    /// Drops one reference of `element` at `key` from the main index and the
    /// sub-index of every view in `views`. Returns `true` if the element left
    /// the main index slot.
    ///
    /// # Errors
    /// Returns [`TimeKeyError`] for invalid keys.
    pub fn remove(
        &mut self,
        key: K,
        element: &E,
        views: impl IntoIterator<Item = ViewId>,
    ) -> Result<bool, TimeKeyError> {
        key.validate()?;
        let Some(slot) = self.slot(&key) else {
            return Ok(false);
        };
        for view in views {
            if let Some(index) = self.views.get_mut(&view) {
                index.remove(slot, element);
            }
        }
        Ok(self.main.remove(slot, element))
    }

    /// Creates the sub-index of `view` if missing, seeding it with every main
    /// index reference whose element satisfies `member`.
    pub fn ensure_view_index(&mut self, view: ViewId, member: impl Fn(&E) -> bool) {
        if self.views.contains_key(&view) {
            return;
        }
        let mut index = TemporalIndex::new();
        for (slot, entry) in self.main.occupied() {
            for element in entry.elements().filter(|e| member(e)) {
                index.add_refs(slot, element, entry.count(&element));
            }
        }
        debug!(
            view = view.0,
            elements = index.element_count(),
            "created view temporal index"
        );
        self.views.insert(view, index);
    }

    /// Copies the main index references of `element` at `key` into the
    /// sub-index of `view` (used when the element joins the view).
    pub fn admit_to_view(&mut self, view: ViewId, key: &K, element: E) {
        let Some(slot) = self.slot(key) else {
            return;
        };
        let count = self.main.entry(slot).map_or(0, |entry| entry.count(&element));
        if let Some(index) = self.views.get_mut(&view) {
            let already = index.entry(slot).map_or(0, |entry| entry.count(&element));
            index.add_refs(slot, element, count.saturating_sub(already));
        }
    }

    /// Drops every reference of `element` at `key` from the sub-index of
    /// `view` (used when the element leaves the view).
    pub fn evict_from_view(&mut self, view: ViewId, key: &K, element: &E) {
        let Some(slot) = self.slot(key) else {
            return;
        };
        if let Some(index) = self.views.get_mut(&view) {
            index.evict(slot, element);
        }
    }

    /// Drops the sub-index of `view`.
    pub fn delete_view_index(&mut self, view: ViewId) -> bool {
        let removed = self.views.remove(&view).is_some();
        if removed {
            debug!(view = view.0, "dropped view temporal index");
        }
        removed
    }

    fn occupied_in(&self, scope: IndexScope, slots: Vec<Slot>) -> Vec<Slot> {
        match self.index(scope) {
            Some(index) => slots.into_iter().filter(|s| index.is_occupied(*s)).collect(),
            None => Vec::new(),
        }
    }

    /// Occupied slots of `scope` whose key covers `point`.
    ///
    /// # Errors
    /// [`TimeKeyError`] for NaN or infinite points.
    pub fn slots_at(&self, scope: IndexScope, point: f64) -> Result<Vec<Slot>, TimeKeyError> {
        let point = check_point(point)?;
        Ok(self.occupied_in(scope, K::slots_at(&self.sorted, point)))
    }

    /// Occupied slots of `scope` whose key overlaps `range`.
    pub fn slots_within(&self, scope: IndexScope, range: &Interval) -> Vec<Slot> {
        self.occupied_in(scope, K::slots_within(&self.sorted, range))
    }

    /// Lowest bound among occupied slots of `scope`, or `+∞` when empty.
    #[must_use]
    pub fn min_timestamp(&self, scope: IndexScope) -> f64 {
        let Some(index) = self.index(scope) else {
            return f64::INFINITY;
        };
        self.sorted
            .iter()
            .find(|(_, slot)| index.is_occupied(**slot))
            .map_or(f64::INFINITY, |(key, _)| key.low())
    }

    /// Highest bound among occupied slots of `scope`, or `-∞` when empty.
    ///
    /// Timestamp keys are sorted by their only bound, so a reverse scan stops
    /// at the first occupied slot. Interval keys are sorted by low bound, so
    /// every occupied slot has to be inspected.
    #[must_use]
    pub fn max_timestamp(&self, scope: IndexScope) -> f64 {
        let Some(index) = self.index(scope) else {
            return f64::NEG_INFINITY;
        };
        let mut occupied = self
            .sorted
            .iter()
            .rev()
            .filter(|(_, slot)| index.is_occupied(**slot));
        match K::REPRESENTATION {
            TimeRepresentation::Timestamp => {
                occupied.next().map_or(f64::NEG_INFINITY, |(key, _)| key.high())
            }
            TimeRepresentation::Interval => {
                occupied.fold(f64::NEG_INFINITY, |acc, (key, _)| acc.max(key.high()))
            }
        }
    }

    /// Resets the store: every key, slot and index is dropped.
    pub fn clear(&mut self) {
        self.sorted.clear();
        self.keys.clear();
        self.main.clear();
        self.views.clear();
    }
}
