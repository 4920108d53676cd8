// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Slot-indexed element sets.
//!
//! A [`TemporalIndex`] is the per-scope half of the temporal index: for every
//! slot handed out by the owning store it keeps the set of elements live at
//! that slot's time key. The main index and every view index share the same
//! slot numbering, which is what lets a view query reuse the store's sorted
//! key map.
//!
//! Entries are reference counted. Two dynamic columns stamping the same
//! element with the same key register it twice; the element only leaves the
//! slot when both stamps are gone.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::key::Slot;

/// Element set of one slot, with per-element reference counts.
#[derive(Clone, Debug)]
pub struct IndexEntry<E> {
    refs: BTreeMap<E, u32>,
}

impl<E: Ord + Copy> IndexEntry<E> {
    fn new() -> Self {
        Self {
            refs: BTreeMap::new(),
        }
    }

    /// Number of distinct elements in the slot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    /// Returns `true` when the slot holds no element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Returns `true` if `element` is in the slot.
    #[must_use]
    pub fn contains(&self, element: &E) -> bool {
        self.refs.contains_key(element)
    }

    /// Reference count of `element` in the slot (0 when absent).
    #[must_use]
    pub fn count(&self, element: &E) -> u32 {
        self.refs.get(element).copied().unwrap_or(0)
    }

    /// Elements in ascending order.
    pub fn elements(&self) -> impl Iterator<Item = E> + '_ {
        self.refs.keys().copied()
    }
}

/// Per-scope mapping `slot → live elements`.
///
/// Invariant: `element_count` equals the sum of distinct elements over all
/// occupied slots, and a slot is `None` exactly when it holds no element.
#[derive(Clone, Debug)]
pub struct TemporalIndex<E> {
    entries: Vec<Option<IndexEntry<E>>>,
    element_count: usize,
}

impl<E> Default for TemporalIndex<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            element_count: 0,
        }
    }
}

impl<E: Ord + Copy> TemporalIndex<E> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of distinct elements over all slots.
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Returns `true` when no slot holds an element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Entry at `slot`, if occupied.
    #[must_use]
    pub fn entry(&self, slot: Slot) -> Option<&IndexEntry<E>> {
        self.entries.get(slot).and_then(Option::as_ref)
    }

    /// Returns `true` if `slot` holds at least one element.
    #[must_use]
    pub fn is_occupied(&self, slot: Slot) -> bool {
        self.entry(slot).is_some()
    }

    /// Adds `count` references of `element` at `slot`. Returns `true` if the
    /// element was not in the slot before.
    pub(crate) fn add_refs(&mut self, slot: Slot, element: E, count: u32) -> bool {
        if count == 0 {
            return false;
        }
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, || None);
        }
        let Some(cell) = self.entries.get_mut(slot) else {
            return false;
        };
        let entry = cell.get_or_insert_with(IndexEntry::new);
        let refs = entry.refs.entry(element).or_insert(0);
        let fresh = *refs == 0;
        *refs = refs.saturating_add(count);
        if fresh {
            self.element_count += 1;
        }
        fresh
    }

    /// Adds one reference of `element` at `slot`.
    pub(crate) fn add(&mut self, slot: Slot, element: E) -> bool {
        self.add_refs(slot, element, 1)
    }

    /// Drops one reference of `element` at `slot`. Returns `true` if the
    /// element left the slot.
    pub(crate) fn remove(&mut self, slot: Slot, element: &E) -> bool {
        self.remove_refs(slot, element, 1)
    }

    /// Drops every reference of `element` at `slot`.
    pub(crate) fn evict(&mut self, slot: Slot, element: &E) -> bool {
        self.remove_refs(slot, element, u32::MAX)
    }

    fn remove_refs(&mut self, slot: Slot, element: &E, count: u32) -> bool {
        let Some(cell) = self.entries.get_mut(slot) else {
            return false;
        };
        let Some(entry) = cell.as_mut() else {
            return false;
        };
        let Some(refs) = entry.refs.get_mut(element) else {
            return false;
        };
        *refs = refs.saturating_sub(count);
        if *refs > 0 {
            return false;
        }
        entry.refs.remove(element);
        self.element_count -= 1;
        if entry.is_empty() {
            *cell = None;
        }
        true
    }

    /// First element of `slot` strictly after `after` (or the first element
    /// when `after` is `None`).
    #[must_use]
    pub fn next_after(&self, slot: Slot, after: Option<&E>) -> Option<E> {
        let entry = self.entry(slot)?;
        match after {
            None => entry.refs.keys().next().copied(),
            Some(last) => entry
                .refs
                .range((Bound::Excluded(last), Bound::Unbounded))
                .next()
                .map(|(e, _)| *e),
        }
    }

    /// Occupied slots with their entries, in slot order.
    pub fn occupied(&self) -> impl Iterator<Item = (Slot, &IndexEntry<E>)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(slot, e)| e.as_ref().map(|e| (slot, e)))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.element_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_remove_track_distinct_counts() {
        let mut index = TemporalIndex::new();
        assert!(index.add(3, 10u32));
        assert!(!index.add(3, 10u32), "second stamp is a reference, not a new element");
        assert!(index.add(3, 11u32));
        assert!(index.add(0, 10u32));
        assert_eq!(index.element_count(), 3);

        assert!(!index.remove(3, &10));
        assert!(index.is_occupied(3));
        assert!(index.remove(3, &10));
        assert!(index.remove(3, &11));
        assert!(!index.is_occupied(3), "empty slot must be cleared");
        assert_eq!(index.element_count(), 1);
    }

    #[test]
    fn evict_drops_all_references() {
        let mut index = TemporalIndex::new();
        index.add_refs(1, 'a', 3);
        assert!(index.evict(1, &'a'));
        assert!(index.is_empty());
        assert!(!index.evict(1, &'a'));
    }

    #[test]
    fn next_after_walks_in_order() {
        let mut index = TemporalIndex::new();
        for e in [5u8, 1, 3] {
            index.add(0, e);
        }
        let mut seen = Vec::new();
        let mut last = None;
        while let Some(e) = index.next_after(0, last.as_ref()) {
            seen.push(e);
            last = Some(e);
        }
        assert_eq!(seen, vec![1, 3, 5]);
        assert_eq!(index.next_after(9, None), None);
    }
}
