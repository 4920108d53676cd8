// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Single-column observers.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{DiffSlot, ObserverError};
use crate::bitset::GrowableBitSet;
use crate::graph::{Graph, GraphData};
use crate::ident::{AnyRef, ColumnHandle, ElementKind, ObserverId, StoreId};
use crate::table::Column;

/// Elements whose value in the column was written since the previous
/// positive check, in store-id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnDiff {
    /// Live elements that were written.
    pub touched: Vec<AnyRef>,
}

#[derive(Debug)]
pub(crate) struct ColumnWatch {
    baseline: u64,
    touched: Option<GrowableBitSet>,
    diff: DiffSlot<ColumnDiff>,
    destroyed: bool,
}

impl ColumnWatch {
    /// Records a write to `store_id`. No-op unless diffing.
    pub(crate) fn mark(&mut self, store_id: StoreId) {
        if let Some(bits) = self.touched.as_mut() {
            bits.set(store_id.index());
        }
    }

    /// Forgets pending writes; the store ids they named no longer exist.
    pub(crate) fn forget_touched(&mut self) {
        if let Some(bits) = self.touched.as_mut() {
            bits.clear();
        }
    }

    pub(crate) fn destroy(&mut self) {
        self.destroyed = true;
        self.touched = None;
        self.diff.disable();
    }
}

/// Observer of the values written to one column.
#[derive(Debug)]
pub struct ColumnObserver {
    id: ObserverId,
    graph: Graph,
    kind: ElementKind,
    column: ColumnHandle,
    watch: Arc<Mutex<ColumnWatch>>,
}

impl ColumnObserver {
    /// Registers a watcher on `column`. Called with the graph read lock held.
    pub(crate) fn attach(graph: Graph, data: &GraphData, kind: ElementKind, column: &Column, diffing: bool) -> Self {
        let watch = Arc::new(Mutex::new(ColumnWatch {
            baseline: column.version(),
            touched: diffing.then(|| GrowableBitSet::with_capacity(data.bound(kind))),
            diff: DiffSlot::new(diffing),
            destroyed: false,
        }));
        column.watchers().lock().push(Arc::clone(&watch));
        let id = data.observers().next_id();
        debug!(observer = id.0, ?kind, column = column.id(), diffing, "created column observer");
        Self {
            id,
            graph,
            kind,
            column: column.handle(),
            watch,
        }
    }

    /// Observer id.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Identity of the observed column.
    pub fn column(&self) -> ColumnHandle {
        self.column
    }

    /// Returns `true` once destroyed (explicitly or with its column).
    pub fn is_destroyed(&self) -> bool {
        self.watch.lock().destroyed
    }

    /// Compares the column's write counter with the baseline. When diffing,
    /// sweeps the touched bits once, resolving each to the element currently
    /// stored there; bits whose element is gone are dropped.
    ///
    /// # Errors
    /// [`ObserverError::Destroyed`] after [`destroy`](Self::destroy) or once
    /// the column is removed.
    pub fn has_changed(&self) -> Result<bool, ObserverError> {
        let data = self.graph.data();
        let mut guard = self.watch.lock();
        let watch = &mut *guard;
        if watch.destroyed {
            return Err(ObserverError::Destroyed);
        }
        let Some(column) = data.table(self.kind).column_by_handle(self.column) else {
            watch.destroy();
            return Err(ObserverError::Destroyed);
        };
        let version = column.version();
        if version == watch.baseline {
            return Ok(false);
        }
        watch.baseline = version;
        if let Some(bits) = watch.touched.as_mut() {
            let touched: Vec<AnyRef> = bits
                .ones()
                .filter_map(|index| u32::try_from(index).ok())
                .filter_map(|index| data.resolve(self.kind, StoreId(index)))
                .collect();
            bits.clear();
            trace!(observer = self.id.0, touched = touched.len(), "column diff");
            watch.diff.store(ColumnDiff { touched });
        }
        Ok(true)
    }

    /// Diff cached by the last positive [`has_changed`](Self::has_changed).
    ///
    /// # Errors
    /// [`ObserverError::DiffDisabled`], [`ObserverError::NoPendingDiff`] or
    /// [`ObserverError::Destroyed`].
    pub fn get_diff(&self) -> Result<ColumnDiff, ObserverError> {
        let mut watch = self.watch.lock();
        if watch.destroyed {
            return Err(ObserverError::Destroyed);
        }
        watch.diff.take()
    }

    /// Deregisters the observer from its column. Idempotent.
    pub fn destroy(&self) {
        let data = self.graph.data();
        if let Some(column) = data.table(self.kind).column_by_handle(self.column) {
            column.watchers().lock().retain(|w| !Arc::ptr_eq(w, &self.watch));
        }
        let mut watch = self.watch.lock();
        if !watch.destroyed {
            watch.destroy();
            debug!(observer = self.id.0, "destroyed column observer");
        }
    }
}

impl Drop for ColumnObserver {
    fn drop(&mut self) {
        self.destroy();
    }
}
