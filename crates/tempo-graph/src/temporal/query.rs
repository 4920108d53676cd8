// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lazy, lock-holding temporal query results.
//!
//! A [`TimeQuery`] is an at-most-once iterator over the distinct elements of a
//! set of slots. In locked mode it owns the graph's read guard for as long as
//! it is traversing and gives it back exactly once, on whichever comes first:
//!
//! - natural exhaustion (the iterator returns `None`),
//! - an explicit [`TimeQuery::close`] (early break),
//! - drop.
//!
//! The guard lives in the query's state; every exit path moves the state to
//! `Closed`, which drops the guard, so a second release cannot happen.

use std::iter::FusedIterator;

use rustc_hash::FxHashSet;

use super::index::TemporalIndex;
use super::key::Slot;
use super::store::IndexScope;
use crate::lock::ReadGuard;

/// Data guarded by the graph lock that can hand out temporal indices.
pub trait IndexSource<E> {
    /// Index for `scope`, if it exists.
    fn temporal_index(&self, scope: IndexScope) -> Option<&TemporalIndex<E>>;
}

/// Position of a traversal over a list of slots.
#[derive(Clone, Debug)]
pub struct SlotCursor<E> {
    slots: Vec<Slot>,
    pos: usize,
    last: Option<E>,
    /// Only needed when more than one slot is walked.
    seen: Option<FxHashSet<E>>,
}

impl<E: Ord + Copy + std::hash::Hash> SlotCursor<E> {
    /// Cursor over `slots`, yielding each element at most once.
    #[must_use]
    pub fn new(slots: Vec<Slot>) -> Self {
        let seen = (slots.len() > 1).then(FxHashSet::default);
        Self {
            slots,
            pos: 0,
            last: None,
            seen,
        }
    }

    /// Returns `true` if the cursor has no slot to visit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Advances over `index`.
    pub fn next_in(&mut self, index: &TemporalIndex<E>) -> Option<E> {
        loop {
            let slot = *self.slots.get(self.pos)?;
            let Some(element) = index.next_after(slot, self.last.as_ref()) else {
                self.pos += 1;
                self.last = None;
                continue;
            };
            self.last = Some(element);
            if let Some(seen) = self.seen.as_mut() {
                if !seen.insert(element) {
                    continue;
                }
            }
            return Some(element);
        }
    }

    /// Drains the remaining elements eagerly.
    pub fn collect_in(mut self, index: &TemporalIndex<E>) -> Vec<E> {
        let mut out = Vec::new();
        while let Some(element) = self.next_in(index) {
            out.push(element);
        }
        out
    }
}

enum QueryState<'a, T, E> {
    Open {
        guard: ReadGuard<'a, T>,
        scope: IndexScope,
        cursor: SlotCursor<E>,
    },
    Detached(std::vec::IntoIter<E>),
    Closed,
}

/// Distinct elements live at a time point or within a range.
pub struct TimeQuery<'a, T, E> {
    state: QueryState<'a, T, E>,
}

impl<'a, T, E> TimeQuery<'a, T, E>
where
    T: IndexSource<E>,
    E: Ord + Copy + std::hash::Hash,
{
    /// Query that holds `guard` until the traversal ends.
    ///
    /// The caller takes `guard` to resolve `slots`, so a read lock is always
    /// briefly acquired. An empty slot list releases it here, before the query
    /// is handed out, and yields an already-closed query that never holds the
    /// lock.
    pub fn locked(guard: ReadGuard<'a, T>, scope: IndexScope, slots: Vec<Slot>) -> Self {
        if slots.is_empty() || guard.temporal_index(scope).is_none() {
            drop(guard);
            return Self::closed();
        }
        Self {
            state: QueryState::Open {
                guard,
                scope,
                cursor: SlotCursor::new(slots),
            },
        }
    }

    /// Query over an already materialized result; holds no lock.
    #[must_use]
    pub fn detached(elements: Vec<E>) -> Self {
        if elements.is_empty() {
            return Self::closed();
        }
        Self {
            state: QueryState::Detached(elements.into_iter()),
        }
    }

    /// Query that yields nothing and holds nothing.
    #[must_use]
    pub fn closed() -> Self {
        Self {
            state: QueryState::Closed,
        }
    }

    /// Returns `true` once the query has released its resources.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.state, QueryState::Closed)
    }

    /// Returns `true` while the query holds the graph read lock.
    #[must_use]
    pub fn holds_lock(&self) -> bool {
        matches!(self.state, QueryState::Open { .. })
    }

    /// Ends the traversal early, releasing the read lock if held. Calling it
    /// again is a no-op.
    pub fn close(&mut self) {
        self.state = QueryState::Closed;
    }
}

impl<T, E> Iterator for TimeQuery<'_, T, E>
where
    T: IndexSource<E>,
    E: Ord + Copy + std::hash::Hash,
{
    type Item = E;

    fn next(&mut self) -> Option<E> {
        let next = match &mut self.state {
            QueryState::Open {
                guard,
                scope,
                cursor,
            } => guard
                .temporal_index(*scope)
                .and_then(|index| cursor.next_in(index)),
            QueryState::Detached(rest) => rest.next(),
            QueryState::Closed => return None,
        };
        if next.is_none() {
            self.close();
        }
        next
    }
}

impl<T, E> FusedIterator for TimeQuery<'_, T, E>
where
    T: IndexSource<E>,
    E: Ord + Copy + std::hash::Hash,
{
}

impl<T, E> std::fmt::Debug for TimeQuery<'_, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            QueryState::Open { .. } => "open",
            QueryState::Detached(_) => "detached",
            QueryState::Closed => "closed",
        };
        f.debug_struct("TimeQuery").field("state", &state).finish()
    }
}
