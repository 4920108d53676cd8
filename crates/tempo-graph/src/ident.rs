// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and element-reference types.
//!
//! Two identities coexist for every node and edge:
//! - the caller-chosen stable id ([`NodeId`], [`EdgeId`]), and
//! - the dense [`StoreId`] assigned by the block store, which is reused after
//!   the element is removed.
//!
//! Indices, caches and diffs hold [`NodeRef`]/[`EdgeRef`] pairs so a stale
//! store id can always be told apart from the element that reused its slot.

use std::fmt;

/// 32-byte blake3 digest used for structural hashes.
pub type Hash = [u8; 32];

/// Short hex prefix of `hash` for log lines.
pub(crate) fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

/// Dense index of an element inside its block store.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreId(pub u32);

impl StoreId {
    /// Returns the id as a `usize` suitable for indexing dense arrays.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Caller-chosen stable identity of a node.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);

/// Caller-chosen stable identity of an edge.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub u64);

/// Handle naming a view (subgraph) registered with a graph.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ViewId(pub u32);

/// Handle naming an observer registered with a graph.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ObserverId(pub u64);

/// Handle naming a column within its table. Never reused by that table.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ColumnHandle(pub u64);

/// Which kind of element a reference or table describes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementKind {
    /// Graph vertex.
    Node,
    /// Graph edge.
    Edge,
}

/// Reference to a live (or formerly live) node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeRef {
    /// Stable identity.
    pub id: NodeId,
    /// Store slot the node occupied when this reference was taken.
    pub store_id: StoreId,
}

/// Reference to a live (or formerly live) edge.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EdgeRef {
    /// Stable identity.
    pub id: EdgeId,
    /// Store slot the edge occupied when this reference was taken.
    pub store_id: StoreId,
}

/// Common view over [`NodeRef`] and [`EdgeRef`].
///
/// Generic subsystems (temporal indices, diff caches) only need the store id
/// plus identity comparison, which this trait provides.
pub trait ElementRef: Copy + Ord + std::hash::Hash + fmt::Debug {
    /// Element kind this reference points at.
    const KIND: ElementKind;

    /// Store slot of the referenced element.
    fn store_id(&self) -> StoreId;
}

impl ElementRef for NodeRef {
    const KIND: ElementKind = ElementKind::Node;

    fn store_id(&self) -> StoreId {
        self.store_id
    }
}

impl ElementRef for EdgeRef {
    const KIND: ElementKind = ElementKind::Edge;

    fn store_id(&self) -> StoreId {
        self.store_id
    }
}

/// Reference to an element of either kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AnyRef {
    /// A node.
    Node(NodeRef),
    /// An edge.
    Edge(EdgeRef),
}

impl AnyRef {
    /// Kind of the referenced element.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Node(_) => ElementKind::Node,
            Self::Edge(_) => ElementKind::Edge,
        }
    }

    /// Store slot of the referenced element.
    #[must_use]
    pub fn store_id(&self) -> StoreId {
        match self {
            Self::Node(r) => r.store_id,
            Self::Edge(r) => r.store_id,
        }
    }
}

impl From<NodeRef> for AnyRef {
    fn from(value: NodeRef) -> Self {
        Self::Node(value)
    }
}

impl From<EdgeRef> for AnyRef {
    fn from(value: EdgeRef) -> Self {
        Self::Edge(value)
    }
}

/// Caller-facing identity of an element of either kind.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ElementId {
    /// A node id.
    Node(NodeId),
    /// An edge id.
    Edge(EdgeId),
}

impl From<NodeId> for ElementId {
    fn from(value: NodeId) -> Self {
        Self::Node(value)
    }
}

impl From<EdgeId> for ElementId {
    fn from(value: EdgeId) -> Self {
        Self::Edge(value)
    }
}
