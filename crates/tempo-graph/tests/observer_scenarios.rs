// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! End-to-end observer protocol: baselines, diffs, lifecycle.

mod common;

use common::{add_nodes, e, n, timestamp_graph, PRESENCE};
use tempo_graph::{
    AnyRef, ColumnDef, ElementKind, Graph, GraphConfig, GraphError, ObserverError, Origin, ScalarType,
    TimeKeyValue, ValueType, VersionRange,
};

fn scored_graph() -> Graph {
    let graph = Graph::default();
    graph
        .add_node_column(ColumnDef::new("score", ValueType::Static(ScalarType::Int)))
        .expect("score column");
    graph
}

// =============================================================================
// GraphObserver
// =============================================================================

#[test]
fn graph_observer_reports_added_nodes_once() {
    let graph = Graph::default();
    let observer = graph.create_graph_observer(true).unwrap();

    let refs = add_nodes(&graph, &[1, 2]);
    assert!(observer.has_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.added_nodes, refs);
    assert!(diff.removed_nodes.is_empty());

    assert_eq!(observer.get_diff(), Err(ObserverError::NoPendingDiff));
    assert!(!observer.has_changed().unwrap());
}

#[test]
fn graph_observer_reports_store_id_reuse_as_remove_plus_add() {
    let graph = Graph::default();
    let first = add_nodes(&graph, &[1, 2]);
    let observer = graph.create_graph_observer(true).unwrap();

    graph.remove_node(n(1)).unwrap();
    let third = graph.add_node(n(3)).unwrap();
    assert_eq!(third.store_id, first[0].store_id, "lowest free store id is reused");

    assert!(observer.has_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.removed_nodes, vec![first[0]]);
    assert_eq!(diff.added_nodes, vec![third]);
}

#[test]
fn graph_observer_sees_edge_cascade() {
    let graph = Graph::default();
    add_nodes(&graph, &[1, 2]);
    let edge = graph.add_edge(e(10), n(1), n(2), "knows").unwrap();
    let observer = graph.create_graph_observer(true).unwrap();

    graph.remove_node(n(2)).unwrap();
    assert!(observer.has_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.removed_edges, vec![edge]);
    assert_eq!(diff.removed_nodes.len(), 1);
    assert!(!graph.contains_edge(e(10)));
}

#[test]
fn observer_without_diffing_rejects_get_diff() {
    let graph = Graph::default();
    let observer = graph.create_graph_observer(false).unwrap();
    graph.add_node(n(1)).unwrap();
    assert!(observer.has_changed().unwrap());
    assert_eq!(observer.get_diff(), Err(ObserverError::DiffDisabled));
}

#[test]
fn version_wrap_forces_the_next_check() {
    let range = VersionRange::new(0, 3).unwrap();
    let graph = Graph::new(GraphConfig::default().with_version_range(range));
    graph.add_node(n(0)).unwrap();
    let observer = graph.create_graph_observer(false).unwrap();
    let before = graph.versions();

    for id in 1..=range.period() {
        graph.add_node(n(id)).unwrap();
    }
    assert_eq!(graph.versions(), before, "a full period lands on the same pair");
    assert!(observer.has_changed().unwrap());
    assert!(!observer.has_changed().unwrap());
}

#[test]
fn destroyed_observer_is_inert() {
    let graph = Graph::default();
    let observer = graph.create_graph_observer(true).unwrap();
    assert_eq!(graph.observer_count(), 1);
    observer.destroy();
    observer.destroy();
    assert_eq!(graph.observer_count(), 0);
    graph.add_node(n(1)).unwrap();
    assert_eq!(observer.has_changed(), Err(ObserverError::Destroyed));
    assert_eq!(observer.get_diff(), Err(ObserverError::Destroyed));
}

#[test]
fn dropping_an_observer_deregisters_it() {
    let graph = Graph::default();
    {
        let _observer = graph.create_graph_observer(true).unwrap();
        let _table = graph.create_table_observer(ElementKind::Edge, false).unwrap();
        assert_eq!(graph.observer_count(), 2);
    }
    assert_eq!(graph.observer_count(), 0);
}

#[test]
fn disabled_observers_cannot_be_created() {
    let graph = Graph::new(GraphConfig::default().with_observers(false));
    assert!(matches!(
        graph.create_graph_observer(true),
        Err(GraphError::Observer(ObserverError::Disabled))
    ));
}

// =============================================================================
// View observers
// =============================================================================

#[test]
fn view_observer_tracks_membership_only() {
    let graph = Graph::default();
    add_nodes(&graph, &[1, 2]);
    let view = graph.create_view().unwrap();
    let observer = graph.create_view_observer(view, true).unwrap();

    graph.add_node(n(3)).unwrap();
    assert!(!observer.has_changed().unwrap(), "graph mutations outside the view");

    graph.view_add_node(view, n(2)).unwrap();
    assert!(observer.has_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.added_nodes, vec![graph.node(n(2)).unwrap()]);

    graph.destroy_view(view).unwrap();
    assert_eq!(observer.has_changed(), Err(ObserverError::Destroyed));
}

// =============================================================================
// ColumnObserver
// =============================================================================

#[test]
fn column_observer_reports_touched_elements() {
    let graph = scored_graph();
    let refs = add_nodes(&graph, &[1, 2]);
    let observer = graph
        .create_column_observer(ElementKind::Node, "score", true)
        .unwrap();

    graph.set_node_attribute(n(1), "score", 5).unwrap();
    assert!(observer.has_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.touched, vec![AnyRef::Node(refs[0])]);
    assert!(!observer.has_changed().unwrap());
}

#[test]
fn column_observer_drops_writes_to_removed_elements() {
    let graph = scored_graph();
    add_nodes(&graph, &[1, 2]);
    let observer = graph
        .create_column_observer(ElementKind::Node, "score", true)
        .unwrap();

    graph.set_node_attribute(n(1), "score", 1).unwrap();
    graph.set_node_attribute(n(2), "score", 2).unwrap();
    let survivor = graph.node(n(2)).unwrap();
    graph.remove_node(n(1)).unwrap();

    assert!(observer.has_changed().unwrap());
    assert_eq!(observer.get_diff().unwrap().touched, vec![AnyRef::Node(survivor)]);
}

#[test]
fn column_observer_counts_time_keyed_writes() {
    let graph = timestamp_graph();
    add_nodes(&graph, &[1]);
    let observer = graph
        .create_column_observer(ElementKind::Node, PRESENCE, false)
        .unwrap();
    graph
        .set_node_attribute_at(n(1), PRESENCE, TimeKeyValue::at(1.0).unwrap(), 0.5)
        .unwrap();
    assert!(observer.has_changed().unwrap());
    graph
        .remove_node_attribute_at(n(1), PRESENCE, TimeKeyValue::at(1.0).unwrap())
        .unwrap();
    assert!(observer.has_changed().unwrap());
}

#[test]
fn clear_forgets_writes_to_elements_that_no_longer_exist() {
    let graph = scored_graph();
    let before = add_nodes(&graph, &[1, 2]);
    let observer = graph
        .create_column_observer(ElementKind::Node, "score", true)
        .unwrap();
    graph.set_node_attribute(n(1), "score", 4).unwrap();

    graph.clear();
    let reborn = graph.add_node(n(5)).unwrap();
    assert_eq!(reborn.store_id, before[0].store_id);

    assert!(observer.has_changed().unwrap(), "clear moves the column version");
    assert!(observer.get_diff().unwrap().touched.is_empty());

    graph.set_node_attribute(n(5), "score", 1).unwrap();
    assert!(observer.has_changed().unwrap());
    assert_eq!(observer.get_diff().unwrap().touched, vec![AnyRef::Node(reborn)]);
}

#[test]
fn removing_the_column_destroys_its_observers() {
    let graph = scored_graph();
    let observer = graph
        .create_column_observer(ElementKind::Node, "score", true)
        .unwrap();
    graph.remove_node_column("score").unwrap();
    assert!(observer.is_destroyed());
    assert_eq!(observer.has_changed(), Err(ObserverError::Destroyed));
}

// =============================================================================
// TableObserver
// =============================================================================

#[test]
fn table_observer_reports_added_then_removed_column() {
    let graph = Graph::default();
    let observer = graph.create_table_observer(ElementKind::Node, true).unwrap();
    assert!(!observer.has_table_changed().unwrap());

    let handle = graph
        .add_node_column(ColumnDef::new("weight", ValueType::Static(ScalarType::Double)))
        .unwrap();
    assert!(observer.has_table_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.added_columns.len(), 1);
    assert_eq!(diff.added_columns[0].id(), "weight");
    assert!(diff.removed_columns.is_empty() && diff.modified_columns.is_empty());

    graph.remove_node_column("weight").unwrap();
    assert!(observer.has_table_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.removed_columns.len(), 1);
    assert_eq!(diff.removed_columns[0].handle(), handle);
    assert!(diff.added_columns.is_empty());
}

#[test]
fn table_observer_reports_definition_edits_as_modified() {
    let graph = Graph::default();
    graph
        .add_edge_column(
            ColumnDef::new("label", ValueType::Static(ScalarType::String)).with_origin(Origin::Property),
        )
        .unwrap();
    let observer = graph.create_table_observer(ElementKind::Edge, true).unwrap();

    graph.set_column_title(ElementKind::Edge, "label", "Label").unwrap();
    assert!(observer.has_changed().unwrap());
    let diff = observer.get_diff().unwrap();
    assert_eq!(diff.modified_columns.len(), 1);
    assert_eq!(diff.modified_columns[0].def().title(), "Label");

    let err = graph
        .set_column_default(ElementKind::Edge, "label", 3)
        .unwrap_err();
    assert!(matches!(err, GraphError::Column(_)));
    assert!(!observer.has_changed().unwrap(), "rejected edits leave the schema alone");
}
