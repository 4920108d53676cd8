// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Growable bit-set keyed by store id.
//!
//! Column observers record touched store ids here between two
//! `has_changed()` sweeps. Capacity grows geometrically by roughly 10% (never
//! less than what the triggering index needs) and is capped at [`MAX_BITS`].

/// Upper bound on addressable bits.
pub const MAX_BITS: usize = isize::MAX as usize;

const WORD_BITS: usize = u64::BITS as usize;

/// Dense bit-set that grows on demand.
#[derive(Clone, Debug, Default)]
pub struct GrowableBitSet {
    words: Vec<u64>,
    capacity: usize,
}

impl GrowableBitSet {
    /// Creates an empty set with room for `capacity` bits.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_BITS);
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            capacity,
        }
    }

    /// Number of addressable bits before the next growth.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn grow_to_fit(&mut self, index: usize) {
        if index < self.capacity {
            return;
        }
        let geometric = self.capacity.saturating_add(self.capacity / 10);
        let needed = index.saturating_add(1);
        self.capacity = geometric.max(needed).min(MAX_BITS);
        self.words.resize(self.capacity.div_ceil(WORD_BITS), 0);
    }

    /// Sets bit `index`, growing if needed. Indices at or past [`MAX_BITS`]
    /// are ignored and reported with `false`.
    pub fn set(&mut self, index: usize) -> bool {
        if index >= MAX_BITS {
            return false;
        }
        self.grow_to_fit(index);
        if let Some(word) = self.words.get_mut(index / WORD_BITS) {
            *word |= 1u64 << (index % WORD_BITS);
        }
        true
    }

    /// Returns bit `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        self.words
            .get(index / WORD_BITS)
            .is_some_and(|word| word & (1u64 << (index % WORD_BITS)) != 0)
    }

    /// Returns `true` when no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears every bit, keeping capacity.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    /// Iterates set bits in ascending order.
    pub fn ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut rest = word;
            std::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_grows_and_iterates_in_order() {
        let mut bits = GrowableBitSet::with_capacity(4);
        assert!(bits.set(2));
        assert!(bits.set(130));
        assert!(bits.set(64));
        assert!(bits.capacity() >= 131);
        assert_eq!(bits.ones().collect::<Vec<_>>(), vec![2, 64, 130]);
        assert_eq!(bits.count_ones(), 3);
        assert!(bits.get(64));
        assert!(!bits.get(65));
        assert!(!bits.get(10_000));
    }

    #[test]
    fn growth_is_geometric() {
        let mut bits = GrowableBitSet::with_capacity(1000);
        bits.set(1000);
        assert_eq!(bits.capacity(), 1100);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut bits = GrowableBitSet::default();
        bits.set(7);
        let cap = bits.capacity();
        bits.clear();
        assert!(bits.is_empty());
        assert_eq!(bits.capacity(), cap);
    }
}
