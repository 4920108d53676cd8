// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Views: named element subsets of a graph.
//!
//! A view only records membership and its own version counter. Its temporal
//! sub-index lives in the graph's temporal stores and is created the first
//! time the view's membership changes.

use std::collections::BTreeSet;

use crate::ident::{ElementKind, StoreId, ViewId};
use crate::version::{VersionCounter, VersionRange};

/// Membership and versions of one view.
#[derive(Clone, Debug)]
pub(crate) struct View {
    nodes: BTreeSet<StoreId>,
    edges: BTreeSet<StoreId>,
    pub(crate) counter: VersionCounter,
}

impl View {
    pub(crate) fn new(range: VersionRange) -> Self {
        Self {
            nodes: BTreeSet::new(),
            edges: BTreeSet::new(),
            counter: VersionCounter::new(range),
        }
    }

    fn members(&self, kind: ElementKind) -> &BTreeSet<StoreId> {
        match kind {
            ElementKind::Node => &self.nodes,
            ElementKind::Edge => &self.edges,
        }
    }

    fn members_mut(&mut self, kind: ElementKind) -> &mut BTreeSet<StoreId> {
        match kind {
            ElementKind::Node => &mut self.nodes,
            ElementKind::Edge => &mut self.edges,
        }
    }

    pub(crate) fn contains(&self, kind: ElementKind, store_id: StoreId) -> bool {
        self.members(kind).contains(&store_id)
    }

    /// Returns `true` if `store_id` was not a member yet.
    pub(crate) fn insert(&mut self, kind: ElementKind, store_id: StoreId) -> bool {
        self.members_mut(kind).insert(store_id)
    }

    /// Returns `true` if `store_id` was a member.
    pub(crate) fn remove(&mut self, kind: ElementKind, store_id: StoreId) -> bool {
        self.members_mut(kind).remove(&store_id)
    }

    pub(crate) fn iter(&self, kind: ElementKind) -> impl Iterator<Item = StoreId> + '_ {
        self.members(kind).iter().copied()
    }

    pub(crate) fn len(&self, kind: ElementKind) -> usize {
        self.members(kind).len()
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}

/// Views of a graph, keyed by id. Ids are handed out monotonically.
#[derive(Clone, Debug, Default)]
pub(crate) struct Views {
    next: u32,
    views: std::collections::BTreeMap<ViewId, View>,
}

impl Views {
    pub(crate) fn create(&mut self, range: VersionRange) -> Option<ViewId> {
        let id = ViewId(self.next);
        self.next = self.next.checked_add(1)?;
        self.views.insert(id, View::new(range));
        Some(id)
    }

    pub(crate) fn get(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: ViewId) -> Option<View> {
        self.views.remove(&id)
    }

    /// Views holding `store_id`.
    pub(crate) fn containing(&self, kind: ElementKind, store_id: StoreId) -> Vec<ViewId> {
        self.views
            .iter()
            .filter(|(_, view)| view.contains(kind, store_id))
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn ids(&self) -> Vec<ViewId> {
        self.views.keys().copied().collect()
    }
}
