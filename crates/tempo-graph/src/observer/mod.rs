// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Change observers.
//!
//! Every observer answers "has anything changed since I last looked" for its
//! subject and, when created with diffing enabled, materializes what changed:
//!
//! | observer           | baseline                      | diff            |
//! |--------------------|-------------------------------|-----------------|
//! | [`GraphObserver`]  | `(node, edge)` version pair   | [`GraphDiff`]   |
//! | [`ColumnObserver`] | column write counter          | [`ColumnDiff`]  |
//! | [`TableObserver`]  | blake3 hash of column schema  | [`TableDiff`]   |
//!
//! The protocol is the same for all three: `has_changed()` compares and moves
//! the baseline forward, caching a diff when it reports `true`; `get_diff()`
//! hands that diff out exactly once; `destroy()` deregisters the observer and
//! every later call fails with [`ObserverError::Destroyed`].
//!
//! # Locking
//!
//! Observer handles hold the graph handle plus their own mutex-guarded state.
//! Checks take the graph read lock for the comparison window and then the
//! observer's mutex. Writers reach observer state from under the graph write
//! lock (marking column bits, resetting baselines on version wraparound).
//! Registration lists are guarded by their own mutexes so creating or
//! destroying an observer only needs the read lock. Lock order is always
//! graph lock, then registration list, then observer state.

pub mod column;
pub mod graph;
pub mod table;

pub use column::{ColumnDiff, ColumnObserver};
pub use graph::{GraphDiff, GraphObserver};
pub use table::{TableDiff, TableObserver};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::ident::{ObserverId, ViewId};
use crate::version::VersionBaseline;
use graph::GraphWatch;
use table::TableWatch;

/// Protocol and state errors raised by observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ObserverError {
    /// The observer was destroyed, or its subject (column, view) is gone.
    #[error("observer has been destroyed")]
    Destroyed,
    /// Diffs were requested from an observer created without diffing.
    #[error("observer was created without diff support")]
    DiffDisabled,
    /// `get_diff()` without a preceding positive `has_changed()`, or twice.
    #[error("no diff pending; call has_changed() first")]
    NoPendingDiff,
    /// Observers are disabled in the graph configuration.
    #[error("observers are disabled for this graph")]
    Disabled,
}

/// Holder for the diff produced by the last positive check.
#[derive(Debug)]
pub(crate) struct DiffSlot<D> {
    enabled: bool,
    pending: Option<D>,
}

impl<D> DiffSlot<D> {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pending: None,
        }
    }

    /// Replaces any diff not yet retrieved.
    pub(crate) fn store(&mut self, diff: D) {
        if self.enabled {
            self.pending = Some(diff);
        }
    }

    pub(crate) fn take(&mut self) -> Result<D, ObserverError> {
        if !self.enabled {
            return Err(ObserverError::DiffDisabled);
        }
        self.pending.take().ok_or(ObserverError::NoPendingDiff)
    }

    pub(crate) fn disable(&mut self) {
        self.enabled = false;
        self.pending = None;
    }
}

/// Registration lists for graph and table observers. Column observers are
/// registered on their column.
#[derive(Debug, Default)]
pub(crate) struct ObserverRegistry {
    next: AtomicU64,
    graph: Mutex<Vec<(Option<ViewId>, Arc<Mutex<GraphWatch>>)>>,
    tables: Mutex<Vec<Arc<Mutex<TableWatch>>>>,
}

impl ObserverRegistry {
    pub(crate) fn next_id(&self) -> ObserverId {
        ObserverId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn register_graph(&self, view: Option<ViewId>, watch: Arc<Mutex<GraphWatch>>) {
        self.graph.lock().push((view, watch));
    }

    pub(crate) fn deregister_graph(&self, watch: &Arc<Mutex<GraphWatch>>) {
        self.graph.lock().retain(|(_, w)| !Arc::ptr_eq(w, watch));
    }

    pub(crate) fn register_table(&self, watch: Arc<Mutex<TableWatch>>) {
        self.tables.lock().push(watch);
    }

    pub(crate) fn deregister_table(&self, watch: &Arc<Mutex<TableWatch>>) {
        self.tables.lock().retain(|w| !Arc::ptr_eq(w, watch));
    }

    /// Installs the forced-changed sentinel on every graph observer of
    /// `scope` (`None` is the whole graph). Called under the graph write lock.
    pub(crate) fn reset_baselines(&mut self, scope: Option<ViewId>) -> usize {
        let mut count = 0;
        for (view, watch) in self.graph.get_mut().iter() {
            if *view == scope {
                watch.lock().baseline = VersionBaseline::Reset;
                count += 1;
            }
        }
        count
    }

    /// Destroys every graph observer of `view`; called when the view goes.
    pub(crate) fn close_view(&mut self, view: ViewId) {
        self.graph.get_mut().retain(|(scope, watch)| {
            if *scope == Some(view) {
                watch.lock().destroy();
                false
            } else {
                true
            }
        });
    }

    /// Number of live graph and table observers.
    pub(crate) fn len(&self) -> usize {
        self.graph.lock().len() + self.tables.lock().len()
    }
}
