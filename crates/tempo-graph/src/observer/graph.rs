// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Whole-graph and per-view structural observers.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::{DiffSlot, ObserverError};
use crate::graph::{Graph, GraphData};
use crate::ident::{EdgeRef, ElementRef, NodeRef, ObserverId, ViewId};
use crate::version::{VersionBaseline, VersionPair};

/// Elements added and removed since the previous positive check.
///
/// A store id reused by a different element shows up as a removal of the old
/// reference plus an addition of the new one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphDiff {
    /// Nodes that appeared.
    pub added_nodes: Vec<NodeRef>,
    /// Nodes that disappeared.
    pub removed_nodes: Vec<NodeRef>,
    /// Edges that appeared.
    pub added_edges: Vec<EdgeRef>,
    /// Edges that disappeared.
    pub removed_edges: Vec<EdgeRef>,
}

impl GraphDiff {
    /// Returns `true` when nothing was added or removed.
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

/// Store-id-indexed cache of the references seen at the last check.
#[derive(Debug, Default)]
struct RefCache {
    nodes: Vec<Option<NodeRef>>,
    edges: Vec<Option<EdgeRef>>,
}

/// Reconciles one cache half against the live elements; returns
/// `(added, removed)`.
fn reconcile<E: ElementRef>(
    cache: &mut Vec<Option<E>>,
    bound: usize,
    live: &[E],
    is_live: impl Fn(&E) -> bool,
) -> (Vec<E>, Vec<E>) {
    let mut removed = Vec::new();
    for slot in cache.iter_mut() {
        if let Some(seen) = *slot {
            if !is_live(&seen) {
                removed.push(seen);
                *slot = None;
            }
        }
    }
    if cache.len() < bound {
        cache.resize(bound, None);
    }
    let mut added = Vec::new();
    for element in live {
        let index = element.store_id().index();
        if cache.len() <= index {
            cache.resize(index + 1, None);
        }
        if let Some(slot) = cache.get_mut(index) {
            if *slot != Some(*element) {
                added.push(*element);
                *slot = Some(*element);
            }
        }
    }
    cache.truncate(bound.max(cache.iter().rposition(Option::is_some).map_or(0, |i| i + 1)));
    (added, removed)
}

impl RefCache {
    fn refresh(&mut self, data: &GraphData, view: Option<ViewId>) -> GraphDiff {
        let nodes = data.live_nodes(view);
        let edges = data.live_edges(view);
        let (added_nodes, removed_nodes) = reconcile(&mut self.nodes, data.node_bound(), &nodes, |r| {
            data.contains_node_ref(r, view)
        });
        let (added_edges, removed_edges) = reconcile(&mut self.edges, data.edge_bound(), &edges, |r| {
            data.contains_edge_ref(r, view)
        });
        GraphDiff {
            added_nodes,
            removed_nodes,
            added_edges,
            removed_edges,
        }
    }
}

#[derive(Debug)]
pub(crate) struct GraphWatch {
    pub(crate) baseline: VersionBaseline,
    cache: Option<RefCache>,
    diff: DiffSlot<GraphDiff>,
    destroyed: bool,
}

impl GraphWatch {
    pub(crate) fn destroy(&mut self) {
        self.destroyed = true;
        self.cache = None;
        self.diff.disable();
    }
}

/// Observer of the structural version of a graph or of one view.
#[derive(Debug)]
pub struct GraphObserver {
    id: ObserverId,
    graph: Graph,
    view: Option<ViewId>,
    watch: Arc<Mutex<GraphWatch>>,
}

impl GraphObserver {
    /// Captures the current versions (and, when diffing, the current element
    /// set) of `view` as the baseline. Called with the graph read lock held.
    pub(crate) fn attach(
        graph: Graph,
        data: &GraphData,
        view: Option<ViewId>,
        current: VersionPair,
        diffing: bool,
    ) -> Self {
        let cache = diffing.then(|| {
            let mut cache = RefCache::default();
            cache.refresh(data, view);
            cache
        });
        let watch = Arc::new(Mutex::new(GraphWatch {
            baseline: VersionBaseline::Seen(current),
            cache,
            diff: DiffSlot::new(diffing),
            destroyed: false,
        }));
        let id = data.observers().next_id();
        data.observers().register_graph(view, Arc::clone(&watch));
        debug!(observer = id.0, ?view, diffing, "created graph observer");
        Self {
            id,
            graph,
            view,
            watch,
        }
    }

    /// Observer id.
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Observed view, or `None` for the whole graph.
    pub fn view(&self) -> Option<ViewId> {
        self.view
    }

    /// Returns `true` once destroyed (explicitly or with its view).
    pub fn is_destroyed(&self) -> bool {
        self.watch.lock().destroyed
    }

    /// Compares the live version pair with the baseline and moves the
    /// baseline forward. After a version wraparound the next call reports
    /// `true` even without further mutation.
    ///
    /// # Errors
    /// [`ObserverError::Destroyed`] after [`destroy`](Self::destroy) or once
    /// the observed view is gone.
    pub fn has_changed(&self) -> Result<bool, ObserverError> {
        let data = self.graph.data();
        let mut guard = self.watch.lock();
        let watch = &mut *guard;
        if watch.destroyed {
            return Err(ObserverError::Destroyed);
        }
        let Some(current) = data.versions(self.view) else {
            watch.destroy();
            return Err(ObserverError::Destroyed);
        };
        if !watch.baseline.differs_from(current) {
            return Ok(false);
        }
        watch.baseline = VersionBaseline::Seen(current);
        if let Some(cache) = watch.cache.as_mut() {
            let diff = cache.refresh(&data, self.view);
            trace!(
                observer = self.id.0,
                added_nodes = diff.added_nodes.len(),
                removed_nodes = diff.removed_nodes.len(),
                added_edges = diff.added_edges.len(),
                removed_edges = diff.removed_edges.len(),
                "graph diff"
            );
            watch.diff.store(diff);
        }
        Ok(true)
    }

    /// Diff cached by the last positive [`has_changed`](Self::has_changed).
    ///
    /// # Errors
    /// [`ObserverError::DiffDisabled`], [`ObserverError::NoPendingDiff`] or
    /// [`ObserverError::Destroyed`].
    pub fn get_diff(&self) -> Result<GraphDiff, ObserverError> {
        let mut watch = self.watch.lock();
        if watch.destroyed {
            return Err(ObserverError::Destroyed);
        }
        watch.diff.take()
    }

    /// Deregisters the observer. Idempotent.
    pub fn destroy(&self) {
        let data = self.graph.data();
        data.observers().deregister_graph(&self.watch);
        let mut watch = self.watch.lock();
        if !watch.destroyed {
            watch.destroy();
            debug!(observer = self.id.0, "destroyed graph observer");
        }
    }
}

impl Drop for GraphObserver {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ident::{NodeId, StoreId};

    fn node(id: u64, store: u32) -> NodeRef {
        NodeRef {
            id: NodeId(id),
            store_id: StoreId(store),
        }
    }

    #[test]
    fn reconcile_reports_reuse_as_remove_plus_add() {
        let mut cache = Vec::new();
        let first = [node(1, 0), node(2, 1)];
        let (added, removed) = reconcile(&mut cache, 2, &first, |r| first.contains(r));
        assert_eq!(added, first.to_vec());
        assert!(removed.is_empty());

        let second = [node(1, 0), node(3, 1)];
        let (added, removed) = reconcile(&mut cache, 2, &second, |r| second.contains(r));
        assert_eq!(added, vec![node(3, 1)]);
        assert_eq!(removed, vec![node(2, 1)]);

        let (added, removed) = reconcile(&mut cache, 2, &second, |r| second.contains(r));
        assert!(added.is_empty() && removed.is_empty());
    }

    #[test]
    fn reconcile_shrinks_with_the_store() {
        let mut cache = Vec::new();
        let live = [node(1, 0), node(2, 5)];
        reconcile(&mut cache, 6, &live, |r| live.contains(r));
        assert_eq!(cache.len(), 6);
        let rest = [node(1, 0)];
        let (_, removed) = reconcile(&mut cache, 1, &rest, |r| rest.contains(r));
        assert_eq!(removed, vec![node(2, 5)]);
        assert_eq!(cache.len(), 1);
    }
}
