// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! State guarded by the graph lock and the write paths that keep its parts
//! consistent.
//!
//! Every mutation runs with `&mut GraphData` obtained from the write guard.
//! A mutation validates first and only then touches the stores, tables,
//! temporal indices, views and version counters, so a rejected call leaves
//! everything as it was.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use super::GraphError;
use crate::config::GraphConfig;
use crate::ident::{
    AnyRef, ColumnHandle, EdgeId, EdgeRef, ElementId, ElementKind, ElementRef, NodeId, NodeRef, StoreId, ViewId,
};
use crate::observer::ObserverRegistry;
use crate::registry::{CompactIdRegistry, EdgeType, Label};
use crate::store::{ElementStore, SlotStore};
use crate::table::{Column, ColumnDef, ColumnError, Table};
use crate::temporal::{IndexScope, IndexSource, TemporalIndex, TemporalStore, TimeKeyValue};
use crate::value::Scalar;
use crate::version::{VersionAxis, VersionCounter, VersionPair};
use crate::view::Views;

/// Stored node.
#[derive(Clone, Debug)]
pub(crate) struct NodeRecord {
    id: NodeId,
    incident: BTreeSet<EdgeId>,
}

/// Stored edge.
#[derive(Clone, Debug)]
pub(crate) struct EdgeRecord {
    id: EdgeId,
    source: NodeRef,
    target: NodeRef,
    edge_type: EdgeType,
}

/// A stored record that can name itself.
pub(crate) trait Record {
    type Ref: ElementRef;

    fn reference(&self, store_id: StoreId) -> Self::Ref;
}

impl Record for NodeRecord {
    type Ref = NodeRef;

    fn reference(&self, store_id: StoreId) -> NodeRef {
        NodeRef { id: self.id, store_id }
    }
}

impl Record for EdgeRecord {
    type Ref = EdgeRef;

    fn reference(&self, store_id: StoreId) -> EdgeRef {
        EdgeRef { id: self.id, store_id }
    }
}

fn live_refs<R: Record>(records: &SlotStore<R>, views: &Views, view: Option<ViewId>) -> Vec<R::Ref> {
    match view {
        None => records.iter().map(|(id, r)| r.reference(id)).collect(),
        Some(view) => views
            .get(view)
            .map(|v| {
                v.iter(<R::Ref as ElementRef>::KIND)
                    .filter_map(|id| records.get(id).map(|r| r.reference(id)))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// The element-kind-specific half of the graph: one record store, its
/// attribute table and its temporal index store, plus the shared views.
struct Half<'a, R: Record> {
    records: &'a SlotStore<R>,
    table: &'a mut Table,
    times: &'a mut TemporalStore<R::Ref>,
    views: &'a mut Views,
    indexed: bool,
}

impl<R: Record> Half<'_, R> {
    fn resolve(&self, store_id: StoreId) -> Option<R::Ref> {
        self.records.get(store_id).map(|r| r.reference(store_id))
    }

    fn set_value(&mut self, element: R::Ref, column: &str, value: Scalar) -> Result<(), GraphError> {
        self.table
            .column_mut(column)?
            .set_value(element.store_id(), value)?;
        Ok(())
    }

    fn set_value_at(
        &mut self,
        element: R::Ref,
        column: &str,
        key: TimeKeyValue,
        value: Scalar,
    ) -> Result<(), GraphError> {
        self.times.check(&key)?;
        let fresh = self
            .table
            .column_mut(column)?
            .set_value_at(element.store_id(), key, value)?;
        if fresh && self.indexed {
            let views = self.views.containing(<R::Ref as ElementRef>::KIND, element.store_id());
            self.times.add(key, element, views)?;
        }
        Ok(())
    }

    fn remove_value_at(&mut self, element: R::Ref, column: &str, key: TimeKeyValue) -> Result<bool, GraphError> {
        self.times.check(&key)?;
        let removed = self
            .table
            .column_mut(column)?
            .remove_value_at(element.store_id(), &key)?;
        if removed && self.indexed {
            let views = self.views.containing(<R::Ref as ElementRef>::KIND, element.store_id());
            self.times.remove(key, &element, views)?;
        }
        Ok(removed)
    }

    /// Drops every value of `element` and unregisters its time keys from the
    /// main index and the indices of the views holding it.
    fn purge(&mut self, element: R::Ref) {
        let views = self.views.containing(<R::Ref as ElementRef>::KIND, element.store_id());
        for column in self.table.columns_mut() {
            for key in column.purge(element.store_id()) {
                if !self.indexed {
                    continue;
                }
                if let Err(err) = self.times.remove(key, &element, views.iter().copied()) {
                    warn!(?element, %key, %err, "stored time key rejected on purge");
                }
            }
        }
    }

    fn keys_of(&self, store_id: StoreId) -> BTreeSet<TimeKeyValue> {
        self.table.columns().flat_map(|c| c.keys_of(store_id)).collect()
    }

    /// Mirrors the time keys of a new view member into the view's index,
    /// creating the index from the main one if the view has none yet.
    fn admit(&mut self, view: ViewId, element: R::Ref) {
        if !self.indexed {
            return;
        }
        let views = &*self.views;
        self.times.ensure_view_index(view, |e| {
            views
                .get(view)
                .is_some_and(|v| v.contains(<R::Ref as ElementRef>::KIND, e.store_id()))
        });
        for key in self.keys_of(element.store_id()) {
            self.times.admit_to_view(view, &key, element);
        }
    }

    fn evict(&mut self, view: ViewId, element: R::Ref) {
        if !self.indexed {
            return;
        }
        for key in self.keys_of(element.store_id()) {
            self.times.evict_from_view(view, &key, &element);
        }
    }

    fn remove_column(&mut self, id: &str) -> Result<(), GraphError> {
        let column = self.table.remove_column(id)?;
        if !self.indexed {
            return Ok(());
        }
        for (store_id, key) in column.stamps() {
            let Some(element) = self.resolve(store_id) else {
                continue;
            };
            let views = self.views.containing(<R::Ref as ElementRef>::KIND, store_id);
            self.times.remove(key, &element, views)?;
        }
        Ok(())
    }
}

/// Everything guarded by the graph lock.
///
/// Only reachable through a [`Graph`](crate::Graph); temporal queries borrow
/// it for as long as they hold the read lock.
#[derive(Debug)]
pub struct GraphData {
    config: GraphConfig,
    nodes: SlotStore<NodeRecord>,
    edges: SlotStore<EdgeRecord>,
    node_ids: FxHashMap<NodeId, StoreId>,
    edge_ids: FxHashMap<EdgeId, StoreId>,
    node_table: Table,
    edge_table: Table,
    node_times: TemporalStore<NodeRef>,
    edge_times: TemporalStore<EdgeRef>,
    views: Views,
    counter: VersionCounter,
    edge_types: CompactIdRegistry,
    /// Live edges per edge type, indexed by type id.
    type_usage: Vec<u32>,
    observers: ObserverRegistry,
}

impl IndexSource<NodeRef> for GraphData {
    fn temporal_index(&self, scope: IndexScope) -> Option<&TemporalIndex<NodeRef>> {
        self.node_times.index(scope)
    }
}

impl IndexSource<EdgeRef> for GraphData {
    fn temporal_index(&self, scope: IndexScope) -> Option<&TemporalIndex<EdgeRef>> {
        self.edge_times.index(scope)
    }
}

impl GraphData {
    pub(crate) fn new(config: GraphConfig) -> Self {
        let repr = config.time_representation;
        Self {
            config,
            nodes: SlotStore::new(),
            edges: SlotStore::new(),
            node_ids: FxHashMap::default(),
            edge_ids: FxHashMap::default(),
            node_table: Table::new(ElementKind::Node, repr),
            edge_table: Table::new(ElementKind::Edge, repr),
            node_times: TemporalStore::new(repr),
            edge_times: TemporalStore::new(repr),
            views: Views::default(),
            counter: VersionCounter::new(config.version_range),
            edge_types: CompactIdRegistry::new(config.edge_label_kind),
            type_usage: Vec::new(),
            observers: ObserverRegistry::default(),
        }
    }

    fn node_half(&mut self) -> Half<'_, NodeRecord> {
        Half {
            records: &self.nodes,
            table: &mut self.node_table,
            times: &mut self.node_times,
            views: &mut self.views,
            indexed: true,
        }
    }

    fn edge_half(&mut self) -> Half<'_, EdgeRecord> {
        Half {
            records: &self.edges,
            table: &mut self.edge_table,
            times: &mut self.edge_times,
            views: &mut self.views,
            indexed: self.config.index_edges,
        }
    }

    // ── reads ────────────────────────────────────────────────────────────

    pub(crate) fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub(crate) fn table(&self, kind: ElementKind) -> &Table {
        match kind {
            ElementKind::Node => &self.node_table,
            ElementKind::Edge => &self.edge_table,
        }
    }

    fn table_mut(&mut self, kind: ElementKind) -> &mut Table {
        match kind {
            ElementKind::Node => &mut self.node_table,
            ElementKind::Edge => &mut self.edge_table,
        }
    }

    pub(crate) fn node_times(&self) -> &TemporalStore<NodeRef> {
        &self.node_times
    }

    pub(crate) fn edge_times(&self) -> &TemporalStore<EdgeRef> {
        &self.edge_times
    }

    pub(crate) fn edge_types(&self) -> &CompactIdRegistry {
        &self.edge_types
    }

    pub(crate) fn edge_types_mut(&mut self) -> &mut CompactIdRegistry {
        &mut self.edge_types
    }

    pub(crate) fn node_ref(&self, store_id: StoreId) -> Option<NodeRef> {
        self.nodes.get(store_id).map(|r| r.reference(store_id))
    }

    pub(crate) fn edge_ref(&self, store_id: StoreId) -> Option<EdgeRef> {
        self.edges.get(store_id).map(|r| r.reference(store_id))
    }

    /// Element currently stored at `store_id`.
    pub(crate) fn resolve(&self, kind: ElementKind, store_id: StoreId) -> Option<AnyRef> {
        match kind {
            ElementKind::Node => self.node_ref(store_id).map(AnyRef::Node),
            ElementKind::Edge => self.edge_ref(store_id).map(AnyRef::Edge),
        }
    }

    pub(crate) fn bound(&self, kind: ElementKind) -> usize {
        match kind {
            ElementKind::Node => self.nodes.max_store_id(),
            ElementKind::Edge => self.edges.max_store_id(),
        }
    }

    pub(crate) fn node_bound(&self) -> usize {
        self.nodes.max_store_id()
    }

    pub(crate) fn edge_bound(&self) -> usize {
        self.edges.max_store_id()
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Version pair of the graph (`None`) or of `view`.
    pub(crate) fn versions(&self, view: Option<ViewId>) -> Option<VersionPair> {
        match view {
            None => Some(self.counter.pair()),
            Some(view) => self.views.get(view).map(|v| v.counter.pair()),
        }
    }

    pub(crate) fn live_nodes(&self, view: Option<ViewId>) -> Vec<NodeRef> {
        live_refs(&self.nodes, &self.views, view)
    }

    pub(crate) fn live_edges(&self, view: Option<ViewId>) -> Vec<EdgeRef> {
        live_refs(&self.edges, &self.views, view)
    }

    fn in_scope(&self, kind: ElementKind, store_id: StoreId, view: Option<ViewId>) -> bool {
        view.is_none_or(|view| {
            self.views
                .get(view)
                .is_some_and(|v| v.contains(kind, store_id))
        })
    }

    /// Returns `true` if `node` is still stored at its store id (and a member
    /// of `view`, when given).
    pub(crate) fn contains_node_ref(&self, node: &NodeRef, view: Option<ViewId>) -> bool {
        self.node_ref(node.store_id) == Some(*node) && self.in_scope(ElementKind::Node, node.store_id, view)
    }

    /// Edge counterpart of [`contains_node_ref`](Self::contains_node_ref).
    pub(crate) fn contains_edge_ref(&self, edge: &EdgeRef, view: Option<ViewId>) -> bool {
        self.edge_ref(edge.store_id) == Some(*edge) && self.in_scope(ElementKind::Edge, edge.store_id, view)
    }

    pub(crate) fn scope(&self, view: Option<ViewId>) -> Result<IndexScope, GraphError> {
        match view {
            None => Ok(IndexScope::Main),
            Some(view) if self.views.get(view).is_some() => Ok(IndexScope::View(view)),
            Some(view) => Err(GraphError::UnknownView(view)),
        }
    }

    pub(crate) fn locate(&self, element: ElementId) -> Result<AnyRef, GraphError> {
        match element {
            ElementId::Node(id) => self
                .node_ids
                .get(&id)
                .and_then(|store_id| self.node_ref(*store_id))
                .map(AnyRef::Node)
                .ok_or(GraphError::UnknownNode(id)),
            ElementId::Edge(id) => self
                .edge_ids
                .get(&id)
                .and_then(|store_id| self.edge_ref(*store_id))
                .map(AnyRef::Edge)
                .ok_or(GraphError::UnknownEdge(id)),
        }
    }

    fn node(&self, id: NodeId) -> Result<NodeRef, GraphError> {
        match self.locate(ElementId::Node(id))? {
            AnyRef::Node(node) => Ok(node),
            AnyRef::Edge(_) => Err(GraphError::UnknownNode(id)),
        }
    }

    fn edge(&self, id: EdgeId) -> Result<EdgeRef, GraphError> {
        match self.locate(ElementId::Edge(id))? {
            AnyRef::Edge(edge) => Ok(edge),
            AnyRef::Node(_) => Err(GraphError::UnknownEdge(id)),
        }
    }

    pub(crate) fn endpoints(&self, edge: EdgeId) -> Option<(NodeRef, NodeRef)> {
        let store_id = self.edge_ids.get(&edge)?;
        self.edges.get(*store_id).map(|r| (r.source, r.target))
    }

    pub(crate) fn edge_type_of(&self, edge: EdgeId) -> Option<EdgeType> {
        let store_id = self.edge_ids.get(&edge)?;
        self.edges.get(*store_id).map(|r| r.edge_type)
    }

    pub(crate) fn view_contains(&self, view: ViewId, element: ElementId) -> Result<bool, GraphError> {
        let members = self.views.get(view).ok_or(GraphError::UnknownView(view))?;
        let element = self.locate(element)?;
        Ok(members.contains(element.kind(), element.store_id()))
    }

    pub(crate) fn view_len(&self, view: ViewId, kind: ElementKind) -> Result<usize, GraphError> {
        self.views
            .get(view)
            .map(|v| v.len(kind))
            .ok_or(GraphError::UnknownView(view))
    }

    fn column(&self, kind: ElementKind, column: &str) -> Result<&Column, GraphError> {
        self.table(kind)
            .column(column)
            .ok_or_else(|| ColumnError::UnknownColumn(column.to_owned()).into())
    }

    /// Static value, or the estimate of a time-keyed column; falls back to
    /// the column default.
    pub(crate) fn value(&self, element: ElementId, column: &str) -> Result<Option<Scalar>, GraphError> {
        let element = self.locate(element)?;
        let column = self.column(element.kind(), column)?;
        let store_id = element.store_id();
        if !column.is_dynamic() {
            return Ok(column.value(store_id).cloned());
        }
        let estimate = column
            .time_map(store_id)
            .zip(column.def().estimator())
            .and_then(|(map, estimator)| map.estimate(estimator));
        Ok(estimate.or_else(|| column.def().default_value().cloned()))
    }

    pub(crate) fn value_at(&self, element: ElementId, column: &str, t: f64) -> Result<Option<Scalar>, GraphError> {
        let element = self.locate(element)?;
        let column = self.column(element.kind(), column)?;
        if column.is_dynamic() {
            Ok(column.value_at(element.store_id(), t).cloned())
        } else {
            Ok(column.value(element.store_id()).cloned())
        }
    }

    // ── writes ───────────────────────────────────────────────────────────

    /// Bumps `axis` of the graph counter (`view == None`) or of a view's
    /// counter. On wraparound every graph observer of that scope gets the
    /// forced-changed baseline before the write lock is released.
    fn bump(&mut self, axis: VersionAxis, view: Option<ViewId>) {
        let step = match view {
            None => self.counter.increment(axis),
            Some(id) => match self.views.get_mut(id) {
                Some(v) => v.counter.increment(axis),
                None => return,
            },
        };
        if step.wrapped {
            let reset = self.observers.reset_baselines(view);
            warn!(?axis, ?view, observers = reset, "version counter wrapped; observer baselines reset");
        }
    }

    pub(crate) fn add_node(&mut self, id: NodeId) -> Result<NodeRef, GraphError> {
        if self.node_ids.contains_key(&id) {
            return Err(GraphError::NodeExists(id));
        }
        let record = NodeRecord {
            id,
            incident: BTreeSet::new(),
        };
        let store_id = self
            .nodes
            .insert(record)
            .ok_or(GraphError::StoreFull(ElementKind::Node))?;
        self.node_ids.insert(id, store_id);
        self.bump(VersionAxis::Node, None);
        Ok(NodeRef { id, store_id })
    }

    /// Removes `id` together with its incident edges, its attribute values
    /// and its view memberships.
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Result<NodeRef, GraphError> {
        let node = self.node(id)?;
        let incident: Vec<EdgeId> = self
            .nodes
            .get(node.store_id)
            .map(|r| r.incident.iter().copied().collect())
            .unwrap_or_default();
        for edge in incident {
            self.remove_edge(edge)?;
        }
        self.node_half().purge(node);
        for view in self.views.containing(ElementKind::Node, node.store_id) {
            if let Some(v) = self.views.get_mut(view) {
                v.remove(ElementKind::Node, node.store_id);
            }
            self.bump(VersionAxis::Node, Some(view));
        }
        self.nodes.remove(node.store_id);
        self.node_ids.remove(&id);
        self.bump(VersionAxis::Node, None);
        Ok(node)
    }

    /// Adds an edge, registering `label` as an edge type when it is new.
    pub(crate) fn add_edge(
        &mut self,
        id: EdgeId,
        source: NodeId,
        target: NodeId,
        label: Label,
    ) -> Result<EdgeRef, GraphError> {
        if self.edge_ids.contains_key(&id) {
            return Err(GraphError::EdgeExists(id));
        }
        let source = self.node(source)?;
        let target = self.node(target)?;
        let (edge_type, fresh) = match self.edge_types.get_id(&label)? {
            Some(edge_type) => (edge_type, false),
            None => (self.edge_types.add_type(label)?, true),
        };
        let record = EdgeRecord {
            id,
            source,
            target,
            edge_type,
        };
        let Some(store_id) = self.edges.insert(record) else {
            if fresh {
                self.edge_types.remove_type_id(edge_type)?;
            }
            return Err(GraphError::StoreFull(ElementKind::Edge));
        };
        self.edge_ids.insert(id, store_id);
        for endpoint in [source, target] {
            if let Some(node) = self.nodes.get_mut(endpoint.store_id) {
                node.incident.insert(id);
            }
        }
        let slot = edge_type.index();
        if self.type_usage.len() <= slot {
            self.type_usage.resize(slot + 1, 0);
        }
        if let Some(count) = self.type_usage.get_mut(slot) {
            *count += 1;
        }
        self.bump(VersionAxis::Edge, None);
        Ok(EdgeRef { id, store_id })
    }

    pub(crate) fn remove_edge(&mut self, id: EdgeId) -> Result<EdgeRef, GraphError> {
        let edge = self.edge(id)?;
        let Some(record) = self.edges.get(edge.store_id).cloned() else {
            return Err(GraphError::UnknownEdge(id));
        };
        self.edge_half().purge(edge);
        for view in self.views.containing(ElementKind::Edge, edge.store_id) {
            if let Some(v) = self.views.get_mut(view) {
                v.remove(ElementKind::Edge, edge.store_id);
            }
            self.bump(VersionAxis::Edge, Some(view));
        }
        self.edges.remove(edge.store_id);
        self.edge_ids.remove(&id);
        for endpoint in [record.source, record.target] {
            if let Some(node) = self.nodes.get_mut(endpoint.store_id) {
                node.incident.remove(&id);
            }
        }
        if let Some(count) = self.type_usage.get_mut(record.edge_type.index()) {
            *count = count.saturating_sub(1);
        }
        self.bump(VersionAxis::Edge, None);
        Ok(edge)
    }

    /// Unbinds `label` unless live edges still use it.
    pub(crate) fn remove_edge_type(&mut self, label: &Label) -> Result<Option<EdgeType>, GraphError> {
        let Some(edge_type) = self.edge_types.get_id(label)? else {
            return Ok(None);
        };
        let edges = self.type_usage.get(edge_type.index()).copied().unwrap_or(0);
        if edges > 0 {
            return Err(GraphError::EdgeTypeInUse {
                label: label.clone(),
                edges,
            });
        }
        Ok(self.edge_types.remove_type(label)?)
    }

    pub(crate) fn add_column(&mut self, kind: ElementKind, def: ColumnDef) -> Result<ColumnHandle, GraphError> {
        Ok(self.table_mut(kind).add_column(def)?)
    }

    /// Removes a column, its time keys and its observers.
    pub(crate) fn remove_column(&mut self, kind: ElementKind, id: &str) -> Result<(), GraphError> {
        match kind {
            ElementKind::Node => self.node_half().remove_column(id),
            ElementKind::Edge => self.edge_half().remove_column(id),
        }
    }

    pub(crate) fn update_column(
        &mut self,
        kind: ElementKind,
        id: &str,
        edit: impl FnOnce(&mut ColumnDef),
    ) -> Result<(), GraphError> {
        Ok(self.table_mut(kind).update_column(id, edit)?)
    }

    pub(crate) fn set_value(&mut self, element: ElementId, column: &str, value: Scalar) -> Result<(), GraphError> {
        match self.locate(element)? {
            AnyRef::Node(node) => self.node_half().set_value(node, column, value),
            AnyRef::Edge(edge) => self.edge_half().set_value(edge, column, value),
        }
    }

    pub(crate) fn set_value_at(
        &mut self,
        element: ElementId,
        column: &str,
        key: TimeKeyValue,
        value: Scalar,
    ) -> Result<(), GraphError> {
        match self.locate(element)? {
            AnyRef::Node(node) => self.node_half().set_value_at(node, column, key, value),
            AnyRef::Edge(edge) => self.edge_half().set_value_at(edge, column, key, value),
        }
    }

    pub(crate) fn remove_value_at(
        &mut self,
        element: ElementId,
        column: &str,
        key: TimeKeyValue,
    ) -> Result<bool, GraphError> {
        match self.locate(element)? {
            AnyRef::Node(node) => self.node_half().remove_value_at(node, column, key),
            AnyRef::Edge(edge) => self.edge_half().remove_value_at(edge, column, key),
        }
    }

    pub(crate) fn create_view(&mut self) -> Result<ViewId, GraphError> {
        let view = self
            .views
            .create(self.config.version_range)
            .ok_or(GraphError::ViewsExhausted)?;
        debug!(view = view.0, "created view");
        Ok(view)
    }

    /// Drops a view, its temporal sub-indices and its observers.
    pub(crate) fn destroy_view(&mut self, view: ViewId) -> Result<(), GraphError> {
        self.views.remove(view).ok_or(GraphError::UnknownView(view))?;
        self.node_times.delete_view_index(view);
        self.edge_times.delete_view_index(view);
        self.observers.close_view(view);
        debug!(view = view.0, "destroyed view");
        Ok(())
    }

    /// Adds an element to a view. Edges need both endpoints in the view.
    /// Returns `false` if it was already a member.
    pub(crate) fn view_add(&mut self, view: ViewId, element: ElementId) -> Result<bool, GraphError> {
        let members = self.views.get(view).ok_or(GraphError::UnknownView(view))?;
        let element = self.locate(element)?;
        if let AnyRef::Edge(edge) = element {
            let endpoints_in = self.edges.get(edge.store_id).is_some_and(|r| {
                members.contains(ElementKind::Node, r.source.store_id)
                    && members.contains(ElementKind::Node, r.target.store_id)
            });
            if !endpoints_in {
                return Err(GraphError::EndpointNotInView { edge: edge.id, view });
            }
        }
        let inserted = self
            .views
            .get_mut(view)
            .is_some_and(|v| v.insert(element.kind(), element.store_id()));
        if !inserted {
            return Ok(false);
        }
        match element {
            AnyRef::Node(node) => {
                self.node_half().admit(view, node);
                self.bump(VersionAxis::Node, Some(view));
            }
            AnyRef::Edge(edge) => {
                self.edge_half().admit(view, edge);
                self.bump(VersionAxis::Edge, Some(view));
            }
        }
        Ok(true)
    }

    /// Removes an element from a view; a node takes its incident view edges
    /// with it. Returns `false` if it was not a member.
    pub(crate) fn view_remove(&mut self, view: ViewId, element: ElementId) -> Result<bool, GraphError> {
        let members = self.views.get(view).ok_or(GraphError::UnknownView(view))?;
        let element = self.locate(element)?;
        if !members.contains(element.kind(), element.store_id()) {
            return Ok(false);
        }
        match element {
            AnyRef::Node(node) => {
                let incident: Vec<EdgeId> = self
                    .nodes
                    .get(node.store_id)
                    .map(|r| r.incident.iter().copied().collect())
                    .unwrap_or_default();
                for edge in incident {
                    self.view_remove(view, ElementId::Edge(edge))?;
                }
                self.node_half().evict(view, node);
                if let Some(v) = self.views.get_mut(view) {
                    v.remove(ElementKind::Node, node.store_id);
                }
                self.bump(VersionAxis::Node, Some(view));
            }
            AnyRef::Edge(edge) => {
                self.edge_half().evict(view, edge);
                if let Some(v) = self.views.get_mut(view) {
                    v.remove(ElementKind::Edge, edge.store_id);
                }
                self.bump(VersionAxis::Edge, Some(view));
            }
        }
        Ok(true)
    }

    /// Store-wide reset. Column definitions, views (emptied) and observers
    /// survive; everything else starts over.
    pub(crate) fn clear(&mut self) {
        let (nodes, edges) = (self.nodes.len(), self.edges.len());
        self.nodes.clear();
        self.edges.clear();
        self.node_ids.clear();
        self.edge_ids.clear();
        self.node_table.clear_values();
        self.edge_table.clear_values();
        self.node_times.clear();
        self.edge_times.clear();
        for view in self.views.ids() {
            if let Some(v) = self.views.get_mut(view) {
                v.clear();
            }
            self.bump(VersionAxis::Node, Some(view));
            self.bump(VersionAxis::Edge, Some(view));
        }
        self.edge_types.clear();
        self.type_usage.clear();
        self.bump(VersionAxis::Node, None);
        self.bump(VersionAxis::Edge, None);
        info!(nodes, edges, "graph cleared");
    }
}
