// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dense element storage with store-id reuse.

use std::collections::BTreeSet;

use crate::ident::StoreId;

/// Read access the diff machinery needs from a block store.
pub trait ElementStore {
    /// Stored element type.
    type Element;

    /// One past the highest store id currently addressable.
    fn max_store_id(&self) -> usize;

    /// Returns `true` if `id` holds a live element.
    fn is_valid_index(&self, id: StoreId) -> bool;

    /// Element at `id`, if live.
    fn get(&self, id: StoreId) -> Option<&Self::Element>;

    /// Live elements in store-id order.
    fn iter(&self) -> Box<dyn Iterator<Item = (StoreId, &Self::Element)> + '_>;
}

/// `Vec`-backed store that hands out the lowest free store id first.
#[derive(Clone, Debug)]
pub struct SlotStore<T> {
    slots: Vec<Option<T>>,
    free: BTreeSet<u32>,
    len: usize,
}

impl<T> Default for SlotStore<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: BTreeSet::new(),
            len: 0,
        }
    }
}

impl<T> SlotStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value`, reusing the lowest freed id. Returns `None` once the
    /// `u32` id space is exhausted.
    pub fn insert(&mut self, value: T) -> Option<StoreId> {
        if let Some(id) = self.free.pop_first() {
            if let Some(slot) = self.slots.get_mut(id as usize) {
                *slot = Some(value);
                self.len += 1;
                return Some(StoreId(id));
            }
        }
        let id = u32::try_from(self.slots.len()).ok()?;
        self.slots.push(Some(value));
        self.len += 1;
        Some(StoreId(id))
    }

    /// Removes and returns the element at `id`; the id becomes reusable.
    pub fn remove(&mut self, id: StoreId) -> Option<T> {
        let value = self.slots.get_mut(id.index())?.take()?;
        self.len -= 1;
        if id.index() + 1 == self.slots.len() {
            // Trim trailing holes so `max_store_id` shrinks with the store.
            self.slots.pop();
            while matches!(self.slots.last(), Some(None)) {
                self.slots.pop();
            }
            let bound = self.slots.len();
            self.free.retain(|free| (*free as usize) < bound);
        } else {
            self.free.insert(id.0);
        }
        Some(value)
    }

    /// Mutable access to the element at `id`.
    pub fn get_mut(&mut self, id: StoreId) -> Option<&mut T> {
        self.slots.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Drops every element and forgets freed ids.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.len = 0;
    }
}

impl<T> ElementStore for SlotStore<T> {
    type Element = T;

    fn max_store_id(&self) -> usize {
        self.slots.len()
    }

    fn is_valid_index(&self, id: StoreId) -> bool {
        self.get(id).is_some()
    }

    fn get(&self, id: StoreId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (StoreId, &T)> + '_> {
        Box::new(self.slots.iter().enumerate().filter_map(|(i, slot)| {
            let id = u32::try_from(i).ok()?;
            slot.as_ref().map(|value| (StoreId(id), value))
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn lowest_freed_id_is_reused_first() {
        let mut store = SlotStore::new();
        let ids: Vec<_> = (0..4).map(|v| store.insert(v).unwrap()).collect();
        store.remove(ids[2]);
        store.remove(ids[1]);
        assert_eq!(store.insert(10).unwrap(), StoreId(1));
        assert_eq!(store.insert(11).unwrap(), StoreId(2));
        assert_eq!(store.insert(12).unwrap(), StoreId(4));
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn trailing_removals_shrink_the_id_bound() {
        let mut store = SlotStore::new();
        for v in 0..3 {
            store.insert(v);
        }
        store.remove(StoreId(1));
        assert_eq!(store.max_store_id(), 3);
        store.remove(StoreId(2));
        assert_eq!(store.max_store_id(), 1);
        assert_eq!(store.insert(7).unwrap(), StoreId(1));
        assert!(store.is_valid_index(StoreId(0)));
        assert!(!store.is_valid_index(StoreId(5)));
        let live: Vec<_> = store.iter().map(|(id, v)| (id.0, *v)).collect();
        assert_eq!(live, vec![(0, 0), (1, 7)]);
    }
}
