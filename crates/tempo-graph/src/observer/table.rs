// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Column-schema observers.
//!
//! Tables have no version counter. The baseline is the blake3 structural hash
//! of the ordered column definitions; a diff compares the cached column
//! snapshots with the live ones by column identity.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{DiffSlot, ObserverError};
use crate::graph::{Graph, GraphData};
use crate::ident::{short_hex, ElementKind, Hash, ObserverId};
use crate::table::ColumnSnapshot;

/// Column-level changes since the previous positive check.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableDiff {
    /// Columns that appeared.
    pub added_columns: Vec<ColumnSnapshot>,
    /// Columns that disappeared (as last seen).
    pub removed_columns: Vec<ColumnSnapshot>,
    /// Columns whose definition changed (as now).
    pub modified_columns: Vec<ColumnSnapshot>,
}

impl TableDiff {
    /// Returns `true` when no column changed.
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty() && self.removed_columns.is_empty() && self.modified_columns.is_empty()
    }

    fn between(cached: Vec<ColumnSnapshot>, live: &[ColumnSnapshot]) -> Self {
        let mut before: BTreeMap<_, _> = cached.into_iter().map(|c| (c.handle(), c)).collect();
        let mut diff = Self::default();
        for column in live {
            match before.remove(&column.handle()) {
                None => diff.added_columns.push(column.clone()),
                Some(seen) if seen.hash() != column.hash() => diff.modified_columns.push(column.clone()),
                Some(_) => {}
            }
        }
        diff.removed_columns = before.into_values().collect();
        diff
    }
}

#[derive(Debug)]
pub(crate) struct TableWatch {
    baseline: Hash,
    cache: Option<Vec<ColumnSnapshot>>,
    diff: DiffSlot<TableDiff>,
    destroyed: bool,
}

impl TableWatch {
    fn destroy(&mut self) {
        self.destroyed = true;
        self.cache = None;
        self.diff.disable();
    }
}

/// Observer of the column schema of the node or edge table.
#[derive(Debug)]
pub struct TableObserver {
    id: ObserverId,
    graph: Graph,
    kind: ElementKind,
    watch: Arc<Mutex<TableWatch>>,
}

impl TableObserver {
    /// Captures the current schema. Called with the graph read lock held.
    pub(crate) fn attach(graph: Graph, data: &GraphData, kind: ElementKind, diffing: bool) -> Self {
        let table = data.table(kind);
        let watch = Arc::new(Mutex::new(TableWatch {
            baseline: table.structural_hash(),
            cache: diffing.then(|| table.snapshot()),
            diff: DiffSlot::new(diffing),
            destroyed: false,
        }));
        data.observers().register_table(Arc::clone(&watch));
        let id = data.observers().next_id();
        debug!(observer = id.0, ?kind, diffing, "created table observer");
        Self {
            id,
            graph,
            kind,
            watch,
        }
    }

    /// Observer id.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Observed table.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Returns `true` once destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.watch.lock().destroyed
    }

    /// Recomputes the structural hash and compares it with the baseline.
    ///
    /// # Errors
    /// [`ObserverError::Destroyed`] after [`destroy`](Self::destroy).
    pub fn has_changed(&self) -> Result<bool, ObserverError> {
        let data = self.graph.data();
        let mut guard = self.watch.lock();
        let watch = &mut *guard;
        if watch.destroyed {
            return Err(ObserverError::Destroyed);
        }
        let table = data.table(self.kind);
        let hash = table.structural_hash();
        if hash == watch.baseline {
            return Ok(false);
        }
        trace!(
            observer = self.id.0,
            from = %short_hex(&watch.baseline),
            to = %short_hex(&hash),
            "table schema changed"
        );
        watch.baseline = hash;
        if let Some(cache) = watch.cache.as_mut() {
            let live = table.snapshot();
            let diff = TableDiff::between(std::mem::take(cache), &live);
            *cache = live;
            watch.diff.store(diff);
        }
        Ok(true)
    }

    /// Alias of [`has_changed`](Self::has_changed).
    ///
    /// # Errors
    /// See [`has_changed`](Self::has_changed).
    pub fn has_table_changed(&self) -> Result<bool, ObserverError> {
        self.has_changed()
    }

    /// Diff cached by the last positive [`has_changed`](Self::has_changed).
    ///
    /// # Errors
    /// [`ObserverError::DiffDisabled`], [`ObserverError::NoPendingDiff`] or
    /// [`ObserverError::Destroyed`].
    pub fn get_diff(&self) -> Result<TableDiff, ObserverError> {
        let mut watch = self.watch.lock();
        if watch.destroyed {
            return Err(ObserverError::Destroyed);
        }
        watch.diff.take()
    }

    /// Deregisters the observer. Idempotent.
    pub fn destroy(&self) {
        let data = self.graph.data();
        data.observers().deregister_table(&self.watch);
        let mut watch = self.watch.lock();
        if !watch.destroyed {
            watch.destroy();
            debug!(observer = self.id.0, "destroyed table observer");
        }
    }
}

impl Drop for TableObserver {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::TimeRepresentation;
    use crate::table::{ColumnDef, Table};
    use crate::value::{ScalarType, ValueType};

    #[test]
    fn three_way_diff_classifies_by_identity() {
        let mut table = Table::new(ElementKind::Node, TimeRepresentation::Timestamp);
        let int = ValueType::Static(ScalarType::Int);
        table.add_column(ColumnDef::new("a", int)).unwrap();
        table.add_column(ColumnDef::new("b", int)).unwrap();
        let before = table.snapshot();

        table.remove_column("a").unwrap();
        table.update_column("b", |def| *def = def.clone().with_title("B")).unwrap();
        table.add_column(ColumnDef::new("a", int)).unwrap();

        let diff = TableDiff::between(before, &table.snapshot());
        assert_eq!(diff.added_columns.len(), 1);
        assert_eq!(diff.removed_columns.len(), 1);
        assert_ne!(diff.added_columns[0].handle(), diff.removed_columns[0].handle());
        assert_eq!(diff.modified_columns.len(), 1);
        assert_eq!(diff.modified_columns[0].def().title(), "B");
    }
}
