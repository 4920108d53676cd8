// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use tempo_graph::{
    ColumnDef, EdgeId, EdgeRef, Graph, GraphConfig, NodeId, NodeRef, ScalarType, TimeRepresentation, ValueType,
};

/// Dynamic node column used by most fixtures.
pub const PRESENCE: &str = "presence";

/// Shorthand for `NodeId(n)`.
pub fn n(id: u64) -> NodeId {
    NodeId(id)
}

/// Shorthand for `EdgeId(e)`.
pub fn e(id: u64) -> EdgeId {
    EdgeId(id)
}

/// Graph with a dynamic `Double` node column named [`PRESENCE`] and the same
/// column on edges.
pub fn temporal_graph(config: GraphConfig) -> Graph {
    let graph = Graph::new(config);
    let ty = ValueType::TimeMap(ScalarType::Double);
    graph
        .add_node_column(ColumnDef::new(PRESENCE, ty))
        .expect("node presence column");
    graph
        .add_edge_column(ColumnDef::new(PRESENCE, ty))
        .expect("edge presence column");
    graph
}

/// Timestamp-keyed [`temporal_graph`] with default settings.
pub fn timestamp_graph() -> Graph {
    temporal_graph(GraphConfig::default())
}

/// Interval-keyed [`temporal_graph`].
pub fn interval_graph() -> Graph {
    temporal_graph(GraphConfig::default().with_time_representation(TimeRepresentation::Interval))
}

/// Adds nodes `ids` in order.
pub fn add_nodes(graph: &Graph, ids: &[u64]) -> Vec<NodeRef> {
    ids.iter()
        .map(|id| graph.add_node(n(*id)).expect("add node"))
        .collect()
}

/// Sorted node ids of a query result.
pub fn node_ids(refs: impl IntoIterator<Item = NodeRef>) -> Vec<u64> {
    let mut ids: Vec<u64> = refs.into_iter().map(|r| r.id.0).collect();
    ids.sort_unstable();
    ids
}

/// Sorted edge ids of a query result.
pub fn edge_ids(refs: impl IntoIterator<Item = EdgeRef>) -> Vec<u64> {
    let mut ids: Vec<u64> = refs.into_iter().map(|r| r.id.0).collect();
    ids.sort_unstable();
    ids
}
