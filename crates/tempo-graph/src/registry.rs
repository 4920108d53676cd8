// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact bidirectional label ⇄ id registry for edge types.
//!
//! The edge store keeps per-type adjacency in dense arrays, so edge types are
//! addressed by small integers instead of their labels. [`CompactIdRegistry`]
//! owns that mapping:
//!
//! - ids live in `[0, MAX_ID]`; id `0` is permanently bound to
//!   [`Label::Null`] ("no label"),
//! - released ids go to a free list and are handed out again (lowest first)
//!   before the high-water mark advances,
//! - every label must be of the one [`LabelKind`] chosen at construction.
//!
//! `label → id` and `id → label` are mutual inverses over live ids at all
//! times; every mutating call either applies fully or returns an error without
//! touching either map.

use std::collections::BTreeSet;
use std::fmt;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Largest assignable id.
pub const MAX_ID: u16 = 65534;

/// Number of non-null labels the registry can hold at once.
pub const MAX_LABELS: usize = MAX_ID as usize;

/// Compact edge-type id.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeType(pub u16);

impl EdgeType {
    /// Id bound to [`Label::Null`].
    pub const NULL: Self = Self(0);

    /// Returns the id as a dense array index.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// Label type accepted by a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LabelKind {
    /// `bool` labels.
    Bool,
    /// `i32` labels.
    Int,
    /// `i64` labels.
    Long,
    /// `char` labels.
    Char,
    /// String labels.
    String,
}

/// An edge-type label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// The reserved "no label" entry; accepted regardless of kind.
    Null,
    /// Boolean label.
    Bool(bool),
    /// 32-bit integer label.
    Int(i32),
    /// 64-bit integer label.
    Long(i64),
    /// Character label.
    Char(char),
    /// String label.
    String(String),
}

impl Label {
    /// Kind of this label, or `None` for [`Label::Null`].
    #[must_use]
    pub fn kind(&self) -> Option<LabelKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(LabelKind::Bool),
            Self::Int(_) => Some(LabelKind::Int),
            Self::Long(_) => Some(LabelKind::Long),
            Self::Char(_) => Some(LabelKind::Char),
            Self::String(_) => Some(LabelKind::String),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<char> for Label {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<bool> for Label {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Errors returned by [`CompactIdRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// All ids in `[1, MAX_ID]` are bound.
    #[error("edge type capacity exceeded ({max} labels)")]
    CapacityExceeded {
        /// Maximum number of non-null labels.
        max: usize,
    },
    /// The label's kind differs from the registry's configured kind.
    #[error("label kind mismatch: expected {expected:?}, found {found:?}")]
    LabelKindMismatch {
        /// Configured kind.
        expected: LabelKind,
        /// Kind of the rejected label.
        found: LabelKind,
    },
    /// The id is outside `[0, MAX_ID]`.
    #[error("edge type id out of range: {0}")]
    InvalidId(u32),
    /// The label is already bound to another id.
    #[error("label {label} already bound to id {existing}")]
    LabelBound {
        /// Rejected label.
        label: Label,
        /// Id currently bound to it.
        existing: u16,
    },
    /// The id is already bound to another label.
    #[error("id {id} already bound to label {existing}")]
    IdBound {
        /// Rejected id.
        id: u16,
        /// Label currently bound to it.
        existing: Label,
    },
    /// The reserved null entry cannot be removed or rebound.
    #[error("the null label entry is reserved")]
    ReservedNull,
}

/// Label ⇄ compact id table with id reuse.
#[derive(Clone, Debug)]
pub struct CompactIdRegistry {
    kind: LabelKind,
    by_label: FxHashMap<Label, u16>,
    /// Dense `id → label`; `None` marks a free id below the high-water mark.
    by_id: Vec<Option<Label>>,
    /// Released ids below the high-water mark, handed out lowest first.
    free: BTreeSet<u16>,
}

impl CompactIdRegistry {
    /// Creates a registry holding only the null entry.
    #[must_use]
    pub fn new(kind: LabelKind) -> Self {
        let mut registry = Self {
            kind,
            by_label: FxHashMap::default(),
            by_id: Vec::new(),
            free: BTreeSet::new(),
        };
        registry.seed_null();
        registry
    }

    fn seed_null(&mut self) {
        self.by_label.insert(Label::Null, EdgeType::NULL.0);
        self.by_id.push(Some(Label::Null));
    }

    /// Configured label kind.
    #[must_use]
    pub fn kind(&self) -> LabelKind {
        self.kind
    }

    fn check_kind(&self, label: &Label) -> Result<(), RegistryError> {
        match label.kind() {
            Some(found) if found != self.kind => Err(RegistryError::LabelKindMismatch {
                expected: self.kind,
                found,
            }),
            _ => Ok(()),
        }
    }

    fn high_water(&self) -> usize {
        self.by_id.len()
    }

    /// Looks up the id bound to `label`; `Ok(None)` means "no type".
    pub fn get_id(&self, label: &Label) -> Result<Option<EdgeType>, RegistryError> {
        self.check_kind(label)?;
        Ok(self.by_label.get(label).copied().map(EdgeType))
    }

    /// Returns the label bound to `id`.
    #[must_use]
    pub fn label(&self, id: EdgeType) -> Option<&Label> {
        self.by_id.get(id.index()).and_then(Option::as_ref)
    }

    /// Returns `true` if `id` is currently bound.
    #[must_use]
    pub fn is_valid(&self, id: EdgeType) -> bool {
        self.label(id).is_some()
    }

    /// Returns `true` if `label` is currently bound.
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.by_label.contains_key(label)
    }

    /// Number of live entries, the null entry included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.by_label.len()
    }

    /// Live labels in ascending id order, the null entry included.
    #[must_use]
    pub fn labels(&self) -> Vec<Label> {
        self.by_id.iter().flatten().cloned().collect()
    }

    /// Binds `label` to the next free id, or returns its existing id.
    ///
    /// # Errors
    /// [`RegistryError::LabelKindMismatch`] for a label of the wrong kind,
    /// [`RegistryError::CapacityExceeded`] once `MAX_LABELS` labels are live.
    pub fn add_type(&mut self, label: Label) -> Result<EdgeType, RegistryError> {
        self.check_kind(&label)?;
        if let Some(&id) = self.by_label.get(&label) {
            return Ok(EdgeType(id));
        }
        let id = if let Some(id) = self.free.pop_first() {
            id
        } else {
            let next = self.high_water();
            let Some(id) = u16::try_from(next).ok().filter(|id| *id <= MAX_ID) else {
                warn!(max = MAX_LABELS, "edge type registry exhausted");
                return Err(RegistryError::CapacityExceeded { max: MAX_LABELS });
            };
            self.by_id.push(None);
            id
        };
        self.bind(label, id);
        Ok(EdgeType(id))
    }

    /// Binds `label` to exactly `id`.
    ///
    /// Re-registering an existing `(label, id)` pair is a no-op. When `id` is
    /// past the high-water mark, every id in between becomes free.
    ///
    /// # Errors
    /// [`RegistryError::InvalidId`] for ids past `MAX_ID`,
    /// [`RegistryError::LabelBound`] / [`RegistryError::IdBound`] when either
    /// side is bound differently, plus the kind check of
    /// [`add_type`](Self::add_type).
    pub fn add_type_with_id(&mut self, label: Label, id: u32) -> Result<EdgeType, RegistryError> {
        self.check_kind(&label)?;
        let id = u16::try_from(id)
            .ok()
            .filter(|id| *id <= MAX_ID)
            .ok_or(RegistryError::InvalidId(id))?;
        if let Some(&existing) = self.by_label.get(&label) {
            if existing == id {
                return Ok(EdgeType(id));
            }
            return Err(RegistryError::LabelBound { label, existing });
        }
        if let Some(existing) = self.label(EdgeType(id)) {
            return Err(RegistryError::IdBound {
                id,
                existing: existing.clone(),
            });
        }
        let target = usize::from(id);
        if target >= self.high_water() {
            for gap in self.high_water()..target {
                // `gap < target <= MAX_ID`, so the conversion cannot fail.
                if let Ok(gap) = u16::try_from(gap) {
                    self.free.insert(gap);
                }
            }
            self.by_id.resize(target + 1, None);
        } else {
            self.free.remove(&id);
        }
        self.bind(label, id);
        Ok(EdgeType(id))
    }

    fn bind(&mut self, label: Label, id: u16) {
        if let Some(slot) = self.by_id.get_mut(usize::from(id)) {
            *slot = Some(label.clone());
        }
        self.by_label.insert(label, id);
    }

    /// Unbinds `label`, returning the id it held.
    ///
    /// # Errors
    /// [`RegistryError::ReservedNull`] for [`Label::Null`], plus the kind check.
    pub fn remove_type(&mut self, label: &Label) -> Result<Option<EdgeType>, RegistryError> {
        self.check_kind(label)?;
        if *label == Label::Null {
            return Err(RegistryError::ReservedNull);
        }
        let Some(id) = self.by_label.remove(label) else {
            return Ok(None);
        };
        self.release(id);
        Ok(Some(EdgeType(id)))
    }

    /// Unbinds whatever label holds `id`, returning it.
    ///
    /// # Errors
    /// [`RegistryError::ReservedNull`] for [`EdgeType::NULL`].
    pub fn remove_type_id(&mut self, id: EdgeType) -> Result<Option<Label>, RegistryError> {
        if id == EdgeType::NULL {
            return Err(RegistryError::ReservedNull);
        }
        let Some(label) = self.by_id.get_mut(id.index()).and_then(Option::take) else {
            return Ok(None);
        };
        self.by_label.remove(&label);
        self.free.insert(id.0);
        Ok(Some(label))
    }

    fn release(&mut self, id: u16) {
        if let Some(slot) = self.by_id.get_mut(usize::from(id)) {
            *slot = None;
        }
        self.free.insert(id);
    }

    /// Drops every binding and re-seeds the null entry.
    pub fn clear(&mut self) {
        debug!(live = self.size(), "clearing edge type registry");
        self.by_label.clear();
        self.by_id.clear();
        self.free.clear();
        self.seed_null();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn registry() -> CompactIdRegistry {
        CompactIdRegistry::new(LabelKind::String)
    }

    #[test]
    fn null_label_is_seeded_at_zero() {
        let reg = registry();
        assert_eq!(reg.get_id(&Label::Null).unwrap(), Some(EdgeType::NULL));
        assert_eq!(reg.size(), 1);
        assert_eq!(reg.labels(), vec![Label::Null]);
    }

    #[test]
    fn add_type_is_idempotent() {
        let mut reg = registry();
        let a = reg.add_type("knows".into()).unwrap();
        let b = reg.add_type("knows".into()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, EdgeType(1));
        assert_eq!(reg.label(a), Some(&Label::from("knows")));
    }

    #[test]
    fn freed_id_is_reused_before_high_water_advances() {
        let mut reg = registry();
        let first = reg.add_type("a".into()).unwrap();
        reg.add_type("b".into()).unwrap();
        assert_eq!(reg.remove_type(&"a".into()).unwrap(), Some(first));
        assert_eq!(reg.get_id(&"a".into()).unwrap(), None);
        let reused = reg.add_type("c".into()).unwrap();
        assert_eq!(reused, first);
        assert_eq!(reg.add_type("d".into()).unwrap(), EdgeType(3));
    }

    #[test]
    fn explicit_id_backfills_the_gap() {
        let mut reg = registry();
        let id = reg.add_type_with_id("far".into(), 5).unwrap();
        assert_eq!(id, EdgeType(5));
        // 1..=4 are free and handed out lowest first.
        assert_eq!(reg.add_type("x".into()).unwrap(), EdgeType(1));
        assert_eq!(reg.add_type("y".into()).unwrap(), EdgeType(2));
        assert_eq!(reg.add_type_with_id("far".into(), 5).unwrap(), id);
    }

    #[test]
    fn explicit_id_below_high_water_claims_free_id() {
        let mut reg = registry();
        reg.add_type_with_id("far".into(), 4).unwrap();
        reg.add_type_with_id("mid".into(), 2).unwrap();
        assert_eq!(reg.add_type("next".into()).unwrap(), EdgeType(1));
        assert_eq!(reg.add_type("after".into()).unwrap(), EdgeType(3));
        assert_eq!(reg.add_type("tail".into()).unwrap(), EdgeType(5));
    }

    #[test]
    fn explicit_id_conflicts_are_rejected() {
        let mut reg = registry();
        reg.add_type_with_id("a".into(), 3).unwrap();
        assert!(matches!(
            reg.add_type_with_id("a".into(), 4),
            Err(RegistryError::LabelBound { existing: 3, .. })
        ));
        assert!(matches!(
            reg.add_type_with_id("b".into(), 3),
            Err(RegistryError::IdBound { id: 3, .. })
        ));
        assert!(matches!(
            reg.add_type_with_id("b".into(), 0),
            Err(RegistryError::IdBound { id: 0, .. })
        ));
        assert_eq!(
            reg.add_type_with_id("c".into(), 70_000),
            Err(RegistryError::InvalidId(70_000))
        );
        assert_eq!(reg.size(), 2, "rejected calls must not mutate");
    }

    #[test]
    fn wrong_label_kind_is_rejected() {
        let mut reg = registry();
        assert_eq!(
            reg.add_type(Label::Int(3)),
            Err(RegistryError::LabelKindMismatch {
                expected: LabelKind::String,
                found: LabelKind::Int,
            })
        );
        assert!(reg.get_id(&Label::Bool(true)).is_err());
    }

    #[test]
    fn null_entry_cannot_be_removed() {
        let mut reg = registry();
        assert_eq!(reg.remove_type(&Label::Null), Err(RegistryError::ReservedNull));
        assert_eq!(
            reg.remove_type_id(EdgeType::NULL),
            Err(RegistryError::ReservedNull)
        );
    }

    #[test]
    fn remove_by_id_frees_the_label() {
        let mut reg = registry();
        let id = reg.add_type("x".into()).unwrap();
        assert_eq!(reg.remove_type_id(id).unwrap(), Some(Label::from("x")));
        assert!(!reg.contains(&"x".into()));
        assert!(!reg.is_valid(id));
        assert_eq!(reg.remove_type_id(id).unwrap(), None);
    }

    #[test]
    fn capacity_is_bounded() {
        let mut reg = CompactIdRegistry::new(LabelKind::Int);
        for i in 0..i32::from(MAX_ID) {
            reg.add_type(Label::Int(i)).unwrap();
        }
        assert_eq!(reg.size(), MAX_LABELS + 1);
        assert_eq!(
            reg.add_type(Label::Int(-1)),
            Err(RegistryError::CapacityExceeded { max: MAX_LABELS })
        );
        reg.remove_type(&Label::Int(17)).unwrap();
        assert_eq!(reg.add_type(Label::Int(-1)).unwrap(), EdgeType(18));
    }

    #[test]
    fn clear_reseeds_null() {
        let mut reg = registry();
        reg.add_type("a".into()).unwrap();
        reg.add_type_with_id("b".into(), 9).unwrap();
        reg.clear();
        assert_eq!(reg.size(), 1);
        assert_eq!(reg.add_type("c".into()).unwrap(), EdgeType(1));
    }
}
