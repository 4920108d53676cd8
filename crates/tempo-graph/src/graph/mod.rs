// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The graph handle: element, column and view mutations, temporal queries and
//! observer factories over one [`GraphLock`].
//!
//! Mutations take the write lock for their whole duration and either apply
//! completely or fail before touching anything. Reads take the read lock;
//! temporal queries may keep it for the lifetime of the returned
//! [`TimeQuery`] (see [`GraphConfig::auto_locking`]).

mod data;

pub use data::GraphData;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::GraphConfig;
use crate::ident::{AnyRef, ColumnHandle, EdgeId, EdgeRef, ElementId, ElementKind, ElementRef, NodeId, NodeRef, ViewId};
use crate::lock::{GraphLock, ReadGuard, WriteGuard};
use crate::observer::{ColumnObserver, GraphObserver, ObserverError, TableObserver};
use crate::registry::{EdgeType, Label, RegistryError};
use crate::table::{ColumnDef, ColumnError};
use crate::temporal::{IndexScope, IndexSource, Interval, Slot, SlotCursor, TimeKeyError, TimeKeyValue, TimeQuery};
use crate::value::{Scalar, ValueError};
use crate::version::VersionPair;

/// Errors returned by [`Graph`] operations.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No node with this id.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    /// No edge with this id.
    #[error("unknown edge {0:?}")]
    UnknownEdge(EdgeId),
    /// No view with this id.
    #[error("unknown view {0:?}")]
    UnknownView(ViewId),
    /// A node with this id already exists.
    #[error("node {0:?} already exists")]
    NodeExists(NodeId),
    /// An edge with this id already exists.
    #[error("edge {0:?} already exists")]
    EdgeExists(EdgeId),
    /// An edge was added to a view that lacks one of its endpoints.
    #[error("edge {edge:?} has an endpoint outside view {view:?}")]
    EndpointNotInView {
        /// Rejected edge.
        edge: EdgeId,
        /// Target view.
        view: ViewId,
    },
    /// Live edges still carry the edge type.
    #[error("edge type {label} is used by {edges} edges")]
    EdgeTypeInUse {
        /// Type label.
        label: Label,
        /// Live edges of that type.
        edges: u32,
    },
    /// The element store has no free store id left.
    #[error("{0:?} store is full")]
    StoreFull(ElementKind),
    /// View ids are exhausted.
    #[error("view ids exhausted")]
    ViewsExhausted,
    /// Invalid or mismatched time key.
    #[error(transparent)]
    TimeKey(#[from] TimeKeyError),
    /// Edge-type registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Observer creation failure.
    #[error(transparent)]
    Observer(#[from] ObserverError),
    /// Column definition or column write failure.
    #[error(transparent)]
    Column(#[from] ColumnError),
    /// Value container failure.
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Shared handle to an in-memory temporal graph.
///
/// Cloning is cheap; clones address the same graph.
#[derive(Clone)]
pub struct Graph {
    config: GraphConfig,
    inner: Arc<GraphLock<GraphData>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("config", &self.config)
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl Graph {
    /// Empty graph configured by `config`.
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            inner: Arc::new(GraphLock::new(GraphData::new(config))),
        }
    }

    /// Construction-time configuration.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub(crate) fn data(&self) -> ReadGuard<'_, GraphData> {
        self.inner.read()
    }

    fn write(&self) -> WriteGuard<'_, GraphData> {
        self.inner.write()
    }

    // ── elements ─────────────────────────────────────────────────────────

    /// Adds node `id`.
    ///
    /// # Errors
    /// [`GraphError::NodeExists`] or [`GraphError::StoreFull`].
    pub fn add_node(&self, id: NodeId) -> Result<NodeRef, GraphError> {
        self.write().add_node(id)
    }

    /// Removes node `id`, its incident edges, its values and its view
    /// memberships.
    pub fn remove_node(&self, id: NodeId) -> Result<NodeRef, GraphError> {
        self.write().remove_node(id)
    }

    /// Adds edge `id` from `source` to `target`. An unregistered `label` is
    /// registered as a new edge type.
    ///
    /// # Errors
    /// [`GraphError::EdgeExists`], [`GraphError::UnknownNode`] or any
    /// registry error for `label`.
    pub fn add_edge(
        &self,
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        label: impl Into<Label>,
    ) -> Result<EdgeRef, GraphError> {
        self.write().add_edge(id, source, target, label.into())
    }

    /// Removes edge `id` and its values.
    pub fn remove_edge(&self, id: EdgeId) -> Result<EdgeRef, GraphError> {
        self.write().remove_edge(id)
    }

    /// Current reference of node `id`.
    pub fn node(&self, id: NodeId) -> Option<NodeRef> {
        match self.data().locate(ElementId::Node(id)) {
            Ok(AnyRef::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// Current reference of edge `id`.
    pub fn edge(&self, id: EdgeId) -> Option<EdgeRef> {
        match self.data().locate(ElementId::Edge(id)) {
            Ok(AnyRef::Edge(edge)) => Some(edge),
            _ => None,
        }
    }

    /// Returns `true` if node `id` exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Returns `true` if edge `id` exists.
    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edge(id).is_some()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.data().node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.data().edge_count()
    }

    /// Every node in store-id order.
    pub fn nodes(&self) -> Vec<NodeRef> {
        self.data().live_nodes(None)
    }

    /// Every edge in store-id order.
    pub fn edges(&self) -> Vec<EdgeRef> {
        self.data().live_edges(None)
    }

    /// Source and target of edge `id`.
    pub fn edge_endpoints(&self, id: EdgeId) -> Option<(NodeRef, NodeRef)> {
        self.data().endpoints(id)
    }

    /// Edge type of edge `id`.
    pub fn edge_type_of(&self, id: EdgeId) -> Option<EdgeType> {
        self.data().edge_type_of(id)
    }

    /// Current `(node, edge)` versions of the graph.
    pub fn versions(&self) -> VersionPair {
        self.data().versions(None).unwrap_or_default()
    }

    // ── columns ──────────────────────────────────────────────────────────

    /// Appends a column to the node table.
    ///
    /// # Errors
    /// [`ColumnError`] for empty or duplicate ids, a mistyped default or a
    /// value type without container.
    pub fn add_node_column(&self, def: ColumnDef) -> Result<ColumnHandle, GraphError> {
        self.write().add_column(ElementKind::Node, def)
    }

    /// Appends a column to the edge table.
    pub fn add_edge_column(&self, def: ColumnDef) -> Result<ColumnHandle, GraphError> {
        self.write().add_column(ElementKind::Edge, def)
    }

    /// Removes a node column with its values, time keys and observers.
    pub fn remove_node_column(&self, id: &str) -> Result<(), GraphError> {
        self.write().remove_column(ElementKind::Node, id)
    }

    /// Removes an edge column with its values, time keys and observers.
    pub fn remove_edge_column(&self, id: &str) -> Result<(), GraphError> {
        self.write().remove_column(ElementKind::Edge, id)
    }

    /// Retitles a column.
    pub fn set_column_title(&self, kind: ElementKind, id: &str, title: impl Into<String>) -> Result<(), GraphError> {
        let title = title.into();
        self.write().update_column(kind, id, |def| *def = def.clone().with_title(title))
    }

    /// Replaces a column's default value.
    ///
    /// # Errors
    /// [`ColumnError::DefaultTypeMismatch`] if `default` does not match the
    /// column's type.
    pub fn set_column_default(&self, kind: ElementKind, id: &str, default: impl Into<Scalar>) -> Result<(), GraphError> {
        let default = default.into();
        self.write().update_column(kind, id, |def| *def = def.clone().with_default(default))
    }

    /// Column ids of the node or edge table, in order.
    pub fn column_ids(&self, kind: ElementKind) -> Vec<String> {
        self.data().table(kind).columns().map(|c| c.id().to_owned()).collect()
    }

    /// Definition of a column.
    pub fn column_def(&self, kind: ElementKind, id: &str) -> Option<ColumnDef> {
        self.data().table(kind).column(id).map(|c| c.def().clone())
    }

    // ── attributes ───────────────────────────────────────────────────────

    /// Writes a static value.
    ///
    /// # Errors
    /// Unknown node or column, dynamic column, or type mismatch.
    pub fn set_node_attribute(&self, node: NodeId, column: &str, value: impl Into<Scalar>) -> Result<(), GraphError> {
        self.write().set_value(ElementId::Node(node), column, value.into())
    }

    /// Writes a time-keyed value and registers the key in the temporal index.
    ///
    /// # Errors
    /// As [`set_node_attribute`](Self::set_node_attribute), plus time keys of
    /// the wrong representation.
    pub fn set_node_attribute_at(
        &self,
        node: NodeId,
        column: &str,
        key: impl Into<TimeKeyValue>,
        value: impl Into<Scalar>,
    ) -> Result<(), GraphError> {
        self.write()
            .set_value_at(ElementId::Node(node), column, key.into(), value.into())
    }

    /// Removes a time-keyed value. Returns `false` if none was stored.
    pub fn remove_node_attribute_at(
        &self,
        node: NodeId,
        column: &str,
        key: impl Into<TimeKeyValue>,
    ) -> Result<bool, GraphError> {
        self.write()
            .remove_value_at(ElementId::Node(node), column, key.into())
    }

    /// Edge counterpart of [`set_node_attribute`](Self::set_node_attribute).
    pub fn set_edge_attribute(&self, edge: EdgeId, column: &str, value: impl Into<Scalar>) -> Result<(), GraphError> {
        self.write().set_value(ElementId::Edge(edge), column, value.into())
    }

    /// Edge counterpart of [`set_node_attribute_at`](Self::set_node_attribute_at).
    pub fn set_edge_attribute_at(
        &self,
        edge: EdgeId,
        column: &str,
        key: impl Into<TimeKeyValue>,
        value: impl Into<Scalar>,
    ) -> Result<(), GraphError> {
        self.write()
            .set_value_at(ElementId::Edge(edge), column, key.into(), value.into())
    }

    /// Edge counterpart of
    /// [`remove_node_attribute_at`](Self::remove_node_attribute_at).
    pub fn remove_edge_attribute_at(
        &self,
        edge: EdgeId,
        column: &str,
        key: impl Into<TimeKeyValue>,
    ) -> Result<bool, GraphError> {
        self.write()
            .remove_value_at(ElementId::Edge(edge), column, key.into())
    }

    /// Value of `column` on `element`: the static value, or the estimator's
    /// summary of a time-keyed column, falling back to the column default.
    pub fn attribute(&self, element: impl Into<ElementId>, column: &str) -> Result<Option<Scalar>, GraphError> {
        self.data().value(element.into(), column)
    }

    /// Value of `column` on `element` in effect at time `t`.
    pub fn attribute_at(
        &self,
        element: impl Into<ElementId>,
        column: &str,
        t: f64,
    ) -> Result<Option<Scalar>, GraphError> {
        self.data().value_at(element.into(), column, t)
    }

    // ── temporal queries ─────────────────────────────────────────────────

    fn query<E>(
        &self,
        view: Option<ViewId>,
        slots: impl FnOnce(&GraphData, IndexScope) -> Result<Vec<Slot>, GraphError>,
    ) -> Result<TimeQuery<'_, GraphData, E>, GraphError>
    where
        GraphData: IndexSource<E>,
        E: ElementRef,
    {
        // Slot resolution needs the read lock even when nothing matches.
        let data = self.data();
        let scope = data.scope(view)?;
        let slots = slots(&*data, scope)?;
        if self.config.auto_locking {
            return Ok(TimeQuery::locked(data, scope, slots));
        }
        let elements = <GraphData as IndexSource<E>>::temporal_index(&*data, scope)
            .map(|index| SlotCursor::new(slots).collect_in(index))
            .unwrap_or_default();
        Ok(TimeQuery::detached(elements))
    }

    /// Nodes holding a time key that contains `t`, in the whole graph or in
    /// `view`.
    ///
    /// # Errors
    /// [`TimeKeyError`] for a non-finite `t`, [`GraphError::UnknownView`].
    pub fn nodes_at(&self, t: f64, view: Option<ViewId>) -> Result<TimeQuery<'_, GraphData, NodeRef>, GraphError> {
        self.query(view, |data, scope| Ok(data.node_times().slots_at(scope, t)?))
    }

    /// Nodes holding a time key that intersects `range`.
    pub fn nodes_in(
        &self,
        range: &Interval,
        view: Option<ViewId>,
    ) -> Result<TimeQuery<'_, GraphData, NodeRef>, GraphError> {
        self.query(view, |data, scope| Ok(data.node_times().slots_within(scope, range)))
    }

    /// Edge counterpart of [`nodes_at`](Self::nodes_at). Empty when edge
    /// indexing is disabled.
    pub fn edges_at(&self, t: f64, view: Option<ViewId>) -> Result<TimeQuery<'_, GraphData, EdgeRef>, GraphError> {
        self.query(view, |data, scope| Ok(data.edge_times().slots_at(scope, t)?))
    }

    /// Edge counterpart of [`nodes_in`](Self::nodes_in).
    pub fn edges_in(
        &self,
        range: &Interval,
        view: Option<ViewId>,
    ) -> Result<TimeQuery<'_, GraphData, EdgeRef>, GraphError> {
        self.query(view, |data, scope| Ok(data.edge_times().slots_within(scope, range)))
    }

    /// Lowest bound among indexed time keys of `kind`; `+∞` when empty.
    pub fn min_timestamp(&self, kind: ElementKind, view: Option<ViewId>) -> Result<f64, GraphError> {
        let data = self.data();
        let scope = data.scope(view)?;
        Ok(match kind {
            ElementKind::Node => data.node_times().min_timestamp(scope),
            ElementKind::Edge => data.edge_times().min_timestamp(scope),
        })
    }

    /// Highest bound among indexed time keys of `kind`; `-∞` when empty.
    pub fn max_timestamp(&self, kind: ElementKind, view: Option<ViewId>) -> Result<f64, GraphError> {
        let data = self.data();
        let scope = data.scope(view)?;
        Ok(match kind {
            ElementKind::Node => data.node_times().max_timestamp(scope),
            ElementKind::Edge => data.edge_times().max_timestamp(scope),
        })
    }

    // ── views ────────────────────────────────────────────────────────────

    /// Creates an empty view.
    pub fn create_view(&self) -> Result<ViewId, GraphError> {
        self.write().create_view()
    }

    /// Destroys `view`, its temporal sub-indices and its observers.
    pub fn destroy_view(&self, view: ViewId) -> Result<(), GraphError> {
        self.write().destroy_view(view)
    }

    /// Adds a node to `view`. Returns `false` if already a member.
    pub fn view_add_node(&self, view: ViewId, node: NodeId) -> Result<bool, GraphError> {
        self.write().view_add(view, ElementId::Node(node))
    }

    /// Removes a node and its incident edges from `view`.
    pub fn view_remove_node(&self, view: ViewId, node: NodeId) -> Result<bool, GraphError> {
        self.write().view_remove(view, ElementId::Node(node))
    }

    /// Adds an edge to `view`.
    ///
    /// # Errors
    /// [`GraphError::EndpointNotInView`] unless both endpoints are members.
    pub fn view_add_edge(&self, view: ViewId, edge: EdgeId) -> Result<bool, GraphError> {
        self.write().view_add(view, ElementId::Edge(edge))
    }

    /// Removes an edge from `view`.
    pub fn view_remove_edge(&self, view: ViewId, edge: EdgeId) -> Result<bool, GraphError> {
        self.write().view_remove(view, ElementId::Edge(edge))
    }

    /// Returns `true` if `element` is a member of `view`.
    pub fn view_contains(&self, view: ViewId, element: impl Into<ElementId>) -> Result<bool, GraphError> {
        self.data().view_contains(view, element.into())
    }

    /// Nodes of `view`.
    pub fn view_nodes(&self, view: ViewId) -> Result<Vec<NodeRef>, GraphError> {
        let data = self.data();
        data.scope(Some(view))?;
        Ok(data.live_nodes(Some(view)))
    }

    /// Edges of `view`.
    pub fn view_edges(&self, view: ViewId) -> Result<Vec<EdgeRef>, GraphError> {
        let data = self.data();
        data.scope(Some(view))?;
        Ok(data.live_edges(Some(view)))
    }

    /// Number of `kind` members of `view`.
    pub fn view_len(&self, view: ViewId, kind: ElementKind) -> Result<usize, GraphError> {
        self.data().view_len(view, kind)
    }

    /// Current `(node, edge)` versions of `view`.
    pub fn view_versions(&self, view: ViewId) -> Result<VersionPair, GraphError> {
        self.data().versions(Some(view)).ok_or(GraphError::UnknownView(view))
    }

    // ── observers ────────────────────────────────────────────────────────

    fn observers_enabled(&self) -> Result<(), ObserverError> {
        if self.config.observers_enabled {
            Ok(())
        } else {
            Err(ObserverError::Disabled)
        }
    }

    /// Observer of the whole graph's structure.
    ///
    /// # Errors
    /// [`ObserverError::Disabled`] when observers are turned off.
    pub fn create_graph_observer(&self, diffing: bool) -> Result<GraphObserver, GraphError> {
        self.observers_enabled()?;
        let data = self.data();
        let current = data.versions(None).unwrap_or_default();
        Ok(GraphObserver::attach(self.clone(), &data, None, current, diffing))
    }

    /// Observer of one view's membership.
    pub fn create_view_observer(&self, view: ViewId, diffing: bool) -> Result<GraphObserver, GraphError> {
        self.observers_enabled()?;
        let data = self.data();
        let current = data.versions(Some(view)).ok_or(GraphError::UnknownView(view))?;
        Ok(GraphObserver::attach(self.clone(), &data, Some(view), current, diffing))
    }

    /// Observer of the values written to one column.
    pub fn create_column_observer(
        &self,
        kind: ElementKind,
        column: &str,
        diffing: bool,
    ) -> Result<ColumnObserver, GraphError> {
        self.observers_enabled()?;
        let data = self.data();
        let target = data
            .table(kind)
            .column(column)
            .ok_or_else(|| ColumnError::UnknownColumn(column.to_owned()))?;
        Ok(ColumnObserver::attach(self.clone(), &data, kind, target, diffing))
    }

    /// Observer of the node or edge table's column schema.
    pub fn create_table_observer(&self, kind: ElementKind, diffing: bool) -> Result<TableObserver, GraphError> {
        self.observers_enabled()?;
        let data = self.data();
        Ok(TableObserver::attach(self.clone(), &data, kind, diffing))
    }

    /// Live graph, view and table observers.
    pub fn observer_count(&self) -> usize {
        self.data().observers().len()
    }

    // ── edge types ───────────────────────────────────────────────────────

    /// Id bound to `label`, if any.
    pub fn edge_type_id(&self, label: impl Into<Label>) -> Result<Option<EdgeType>, GraphError> {
        Ok(self.data().edge_types().get_id(&label.into())?)
    }

    /// Registers `label`, reusing freed ids first.
    pub fn add_edge_type(&self, label: impl Into<Label>) -> Result<EdgeType, GraphError> {
        Ok(self.write().edge_types_mut().add_type(label.into())?)
    }

    /// Registers `label` at `id`, filling the gap below it with free ids.
    pub fn add_edge_type_with_id(&self, label: impl Into<Label>, id: u32) -> Result<EdgeType, GraphError> {
        Ok(self.write().edge_types_mut().add_type_with_id(label.into(), id)?)
    }

    /// Unbinds `label`.
    ///
    /// # Errors
    /// [`GraphError::EdgeTypeInUse`] while edges of that type exist.
    pub fn remove_edge_type(&self, label: impl Into<Label>) -> Result<Option<EdgeType>, GraphError> {
        self.write().remove_edge_type(&label.into())
    }

    /// Label bound to `id`.
    pub fn edge_type_label(&self, id: EdgeType) -> Option<Label> {
        self.data().edge_types().label(id).cloned()
    }

    /// Every bound label, null entry included, in id order.
    pub fn edge_type_labels(&self) -> Vec<Label> {
        self.data().edge_types().labels()
    }

    /// Number of bound labels, null entry included.
    pub fn edge_type_count(&self) -> usize {
        self.data().edge_types().size()
    }

    // ── reset ────────────────────────────────────────────────────────────

    /// Removes every element, value, time key and edge type. Columns, views
    /// and observers survive.
    pub fn clear(&self) {
        self.write().clear();
    }
}
