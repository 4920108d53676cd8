// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tempo-graph: temporal indexing, change observation and compact edge-type
//! ids for an in-memory graph.
//!
//! A [`Graph`] stores nodes and edges with attribute columns, some of them
//! keyed by time. Four pieces keep each other consistent under one
//! reader/writer lock:
//!
//! - the temporal index stores ([`temporal`]), mapping time keys to the
//!   elements holding them, per graph and per view;
//! - the observers ([`observer`]), answering "what changed since I last
//!   looked" for the graph, a view, a column or a table schema;
//! - the edge-type registry ([`CompactIdRegistry`]), binding labels to
//!   reusable 16-bit ids;
//! - the version counters ([`VersionCounter`]), which wrap within a
//!   configured range and force dependent observers to report a change when
//!   they do.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod bitset;
mod config;
mod graph;
mod ident;
mod lock;
/// Change observers and their diffs.
pub mod observer;
mod registry;
mod store;
mod table;
/// Time keys, temporal index stores and lazy temporal queries.
pub mod temporal;
mod value;
mod version;
mod view;

/// Growable bit-set used by column observers.
pub use bitset::{GrowableBitSet, MAX_BITS};
/// Graph construction options.
pub use config::{GraphConfig, TimeRepresentation};
/// The graph handle and its lock-guarded state.
pub use graph::{Graph, GraphData, GraphError};
/// Identifiers and element references.
pub use ident::{
    AnyRef, ColumnHandle, EdgeId, EdgeRef, ElementId, ElementKind, ElementRef, Hash, NodeId, NodeRef, ObserverId,
    StoreId, ViewId,
};
/// Reader/writer lock guarding a graph.
pub use lock::{GraphLock, ReadGuard, WriteGuard};
/// Observer handles and diffs.
pub use observer::{ColumnDiff, ColumnObserver, GraphDiff, GraphObserver, ObserverError, TableDiff, TableObserver};
/// Edge-type registry.
pub use registry::{CompactIdRegistry, EdgeType, Label, LabelKind, RegistryError, MAX_ID, MAX_LABELS};
/// Element stores.
pub use store::{ElementStore, SlotStore};
/// Attribute tables and columns.
pub use table::{Column, ColumnDef, ColumnError, ColumnSnapshot, Origin, Table};
/// Time keys and queries.
pub use temporal::{Interval, TimeKey, TimeKeyError, TimeKeyValue, TimeQuery, Timestamp};
/// Attribute values and time-keyed value containers.
pub use value::{Estimator, Scalar, ScalarType, TimeMap, TimeMapCtor, ValueError, ValueFactory, ValueType};
/// Version counters.
pub use version::{VersionAxis, VersionBaseline, VersionCounter, VersionPair, VersionRange, VersionStep};
