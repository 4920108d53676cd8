// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Attribute tables and columns.
//!
//! Each graph owns one [`Table`] for nodes and one for edges. A [`Column`]
//! stores the values of one attribute for every element that has one, keyed
//! by store id, plus the version counter and watcher list its column
//! observers read.
//!
//! Tables carry no version counter. Table observers compare a blake3
//! structural hash over the column definitions instead; see
//! [`Table::structural_hash`].

use std::collections::BTreeMap;
use std::sync::Arc;

use blake3::Hasher;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::config::TimeRepresentation;
use crate::ident::{short_hex, ColumnHandle, ElementKind, Hash, StoreId};
use crate::observer::column::ColumnWatch;
use crate::temporal::TimeKeyValue;
use crate::value::{Estimator, Scalar, ScalarType, TimeMap, TimeMapCtor, ValueError, ValueFactory, ValueType};

/// Errors raised by table and column operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColumnError {
    /// Column ids must be non-empty.
    #[error("column id is empty")]
    EmptyId,
    /// A column with the same id (compared case-insensitively) exists.
    #[error("column {0:?} already exists")]
    DuplicateId(String),
    /// No column has this id.
    #[error("column {0:?} not found")]
    UnknownColumn(String),
    /// The declared default does not match the column type.
    #[error("column {column:?}: default of type {found:?} does not match {expected:?}")]
    DefaultTypeMismatch {
        /// Column id.
        column: String,
        /// Declared type.
        expected: ValueType,
        /// Type of the supplied default.
        found: ScalarType,
    },
    /// A time-keyed write targeted a static column.
    #[error("column {0:?} is not time-keyed")]
    NotDynamic(String),
    /// A plain write targeted a time-keyed column.
    #[error("column {0:?} is time-keyed")]
    NotStatic(String),
    /// The value container rejected the write.
    #[error("column {column:?}: {source}")]
    Value {
        /// Column id.
        column: String,
        /// Underlying container error.
        #[source]
        source: ValueError,
    },
}

/// Where a column comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Origin {
    /// Built-in element property.
    Property,
    /// User data.
    #[default]
    Data,
}

/// Declarative description of a column.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnDef {
    id: String,
    title: String,
    value_type: ValueType,
    default: Option<Scalar>,
    origin: Origin,
    estimator: Option<Estimator>,
}

impl ColumnDef {
    /// Data column `id` of type `value_type`, titled after its id.
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            value_type,
            default: None,
            origin: Origin::Data,
            estimator: None,
        }
    }

    /// Sets the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the default value returned for elements without a value.
    pub fn with_default(mut self, default: impl Into<Scalar>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets the origin.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the estimator used to collapse time-keyed values.
    pub fn with_estimator(mut self, estimator: Estimator) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Column id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Declared type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Default value.
    pub fn default_value(&self) -> Option<&Scalar> {
        self.default.as_ref()
    }

    /// Origin.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Estimator.
    pub fn estimator(&self) -> Option<Estimator> {
        self.estimator
    }

    fn validate(&self) -> Result<(), ColumnError> {
        if self.id.is_empty() {
            return Err(ColumnError::EmptyId);
        }
        match &self.default {
            Some(default) if default.scalar_type() != self.value_type.scalar() => {
                Err(ColumnError::DefaultTypeMismatch {
                    column: self.id.clone(),
                    expected: self.value_type,
                    found: default.scalar_type(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Canonical blake3 hash of every structural field.
    pub fn structural_hash(&self) -> Hash {
        let mut hasher = Hasher::new();
        for text in [&self.id, &self.title] {
            hasher.update(&(text.len() as u64).to_le_bytes());
            hasher.update(text.as_bytes());
        }
        self.value_type.feed(&mut hasher);
        match &self.default {
            Some(default) => {
                hasher.update(&[1]);
                default.feed(&mut hasher);
            }
            None => {
                hasher.update(&[0]);
            }
        }
        hasher.update(&[match self.origin {
            Origin::Property => 1,
            Origin::Data => 2,
        }]);
        hasher.update(&[self.estimator.map_or(0, Estimator::tag)]);
        hasher.finalize().into()
    }
}

/// Identity, definition and structural hash of a column at one point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSnapshot {
    handle: ColumnHandle,
    def: ColumnDef,
    hash: Hash,
}

impl ColumnSnapshot {
    /// Column identity.
    pub fn handle(&self) -> ColumnHandle {
        self.handle
    }

    /// Column id.
    pub fn id(&self) -> &str {
        self.def.id()
    }

    /// Definition at snapshot time.
    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    /// Structural hash at snapshot time.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}

#[derive(Debug)]
enum Cells {
    Static(BTreeMap<StoreId, Scalar>),
    Dynamic {
        ctor: TimeMapCtor,
        repr: TimeRepresentation,
        maps: BTreeMap<StoreId, TimeMap>,
    },
}

/// One attribute column.
#[derive(Debug)]
pub struct Column {
    handle: ColumnHandle,
    def: ColumnDef,
    hash: Hash,
    version: u64,
    cells: Cells,
    watchers: Mutex<Vec<Arc<Mutex<ColumnWatch>>>>,
}

impl Column {
    fn new(handle: ColumnHandle, def: ColumnDef, factory: &ValueFactory, repr: TimeRepresentation) -> Result<Self, ColumnError> {
        def.validate()?;
        let cells = match factory.resolve(def.value_type()) {
            Ok(None) => Cells::Static(BTreeMap::new()),
            Ok(Some(ctor)) => Cells::Dynamic {
                ctor,
                repr,
                maps: BTreeMap::new(),
            },
            Err(source) => {
                return Err(ColumnError::Value {
                    column: def.id.clone(),
                    source,
                })
            }
        };
        Ok(Self {
            handle,
            hash: def.structural_hash(),
            def,
            version: 0,
            cells,
            watchers: Mutex::new(Vec::new()),
        })
    }

    /// Column identity.
    pub fn handle(&self) -> ColumnHandle {
        self.handle
    }

    /// Column id.
    pub fn id(&self) -> &str {
        self.def.id()
    }

    /// Definition.
    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    /// Structural hash of the definition.
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Write counter; bumped on every value change.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns `true` for time-keyed columns.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.cells, Cells::Dynamic { .. })
    }

    /// Number of elements holding a value.
    pub fn value_count(&self) -> usize {
        match &self.cells {
            Cells::Static(values) => values.len(),
            Cells::Dynamic { maps, .. } => maps.len(),
        }
    }

    /// Static value of `store_id`, or the column default.
    pub fn value(&self, store_id: StoreId) -> Option<&Scalar> {
        match &self.cells {
            Cells::Static(values) => values.get(&store_id).or(self.def.default.as_ref()),
            Cells::Dynamic { .. } => None,
        }
    }

    /// Time-keyed values of `store_id`.
    pub fn time_map(&self, store_id: StoreId) -> Option<&TimeMap> {
        match &self.cells {
            Cells::Dynamic { maps, .. } => maps.get(&store_id),
            Cells::Static(_) => None,
        }
    }

    /// Value of `store_id` at `t`, or the column default.
    pub fn value_at(&self, store_id: StoreId, t: f64) -> Option<&Scalar> {
        self.time_map(store_id)
            .and_then(|map| map.value_at(t))
            .or(self.def.default.as_ref())
    }

    /// Time keys `store_id` holds a value at.
    pub fn keys_of(&self, store_id: StoreId) -> Vec<TimeKeyValue> {
        self.time_map(store_id)
            .map(|map| map.keys().collect())
            .unwrap_or_default()
    }

    fn value_error(&self, source: ValueError) -> ColumnError {
        ColumnError::Value {
            column: self.def.id.clone(),
            source,
        }
    }

    fn touch(&mut self, store_id: StoreId) {
        self.version = self.version.wrapping_add(1);
        for watcher in self.watchers.get_mut().iter() {
            watcher.lock().mark(store_id);
        }
    }

    /// Sets the static value of `store_id`, returning the replaced value.
    pub(crate) fn set_value(&mut self, store_id: StoreId, value: Scalar) -> Result<Option<Scalar>, ColumnError> {
        let expected = self.def.value_type.scalar();
        if value.scalar_type() != expected {
            return Err(self.value_error(ValueError::TypeMismatch {
                expected,
                found: value.scalar_type(),
            }));
        }
        let Cells::Static(values) = &mut self.cells else {
            return Err(ColumnError::NotStatic(self.def.id.clone()));
        };
        let previous = values.insert(store_id, value);
        self.touch(store_id);
        Ok(previous)
    }

    /// Sets the value of `store_id` at `key`. Returns `true` when the key is
    /// new for this element (the caller then registers it in the temporal
    /// index).
    pub(crate) fn set_value_at(&mut self, store_id: StoreId, key: TimeKeyValue, value: Scalar) -> Result<bool, ColumnError> {
        let Cells::Dynamic { ctor, repr, maps } = &mut self.cells else {
            return Err(ColumnError::NotDynamic(self.def.id.clone()));
        };
        let mut map = maps.remove(&store_id).unwrap_or_else(|| ctor(*repr));
        let result = map.insert(key, value);
        if !map.is_empty() {
            maps.insert(store_id, map);
        }
        let previous = result.map_err(|source| self.value_error(source))?;
        self.touch(store_id);
        Ok(previous.is_none())
    }

    /// Removes the value of `store_id` at `key`. Returns `true` if a value was
    /// removed.
    pub(crate) fn remove_value_at(&mut self, store_id: StoreId, key: &TimeKeyValue) -> Result<bool, ColumnError> {
        let Cells::Dynamic { maps, .. } = &mut self.cells else {
            return Err(ColumnError::NotDynamic(self.def.id.clone()));
        };
        let Some(map) = maps.get_mut(&store_id) else {
            return Ok(false);
        };
        let removed = map.remove(key).is_some();
        if map.is_empty() {
            maps.remove(&store_id);
        }
        if removed {
            self.touch(store_id);
        }
        Ok(removed)
    }

    /// Drops every value of `store_id`, returning the time keys it held.
    pub(crate) fn purge(&mut self, store_id: StoreId) -> Vec<TimeKeyValue> {
        let (removed, keys) = match &mut self.cells {
            Cells::Static(values) => (values.remove(&store_id).is_some(), Vec::new()),
            Cells::Dynamic { maps, .. } => match maps.remove(&store_id) {
                Some(map) => (true, map.keys().collect()),
                None => (false, Vec::new()),
            },
        };
        if removed {
            self.touch(store_id);
        }
        keys
    }

    /// Every `(store id, key)` pair held by a time-keyed column.
    pub(crate) fn stamps(&self) -> Vec<(StoreId, TimeKeyValue)> {
        match &self.cells {
            Cells::Static(_) => Vec::new(),
            Cells::Dynamic { maps, .. } => maps
                .iter()
                .flat_map(|(id, map)| map.keys().map(move |key| (*id, key)))
                .collect(),
        }
    }

    fn clear_values(&mut self) {
        match &mut self.cells {
            Cells::Static(values) => values.clear(),
            Cells::Dynamic { maps, .. } => maps.clear(),
        }
        self.version = self.version.wrapping_add(1);
        for watcher in self.watchers.get_mut().iter() {
            watcher.lock().forget_touched();
        }
    }

    pub(crate) fn watchers(&self) -> &Mutex<Vec<Arc<Mutex<ColumnWatch>>>> {
        &self.watchers
    }

    /// Marks every watcher destroyed; used when the column goes away.
    fn close_watchers(&mut self) {
        for watcher in self.watchers.get_mut().drain(..) {
            watcher.lock().destroy();
        }
    }

    fn snapshot(&self) -> ColumnSnapshot {
        ColumnSnapshot {
            handle: self.handle,
            def: self.def.clone(),
            hash: self.hash,
        }
    }
}

/// Ordered column list of one element kind.
#[derive(Debug)]
pub struct Table {
    kind: ElementKind,
    repr: TimeRepresentation,
    factory: ValueFactory,
    columns: Vec<Column>,
    next_handle: u64,
}

impl Table {
    /// Empty table for `kind`, building dynamic containers keyed by `repr`.
    pub fn new(kind: ElementKind, repr: TimeRepresentation) -> Self {
        Self::with_factory(kind, repr, ValueFactory::default())
    }

    /// Empty table using a custom container factory.
    pub fn with_factory(kind: ElementKind, repr: TimeRepresentation, factory: ValueFactory) -> Self {
        Self {
            kind,
            repr,
            factory,
            columns: Vec::new(),
            next_handle: 1,
        }
    }

    /// Element kind described by this table.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` when the table has no column.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> + '_ {
        self.columns.iter()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id().eq_ignore_ascii_case(id))
    }

    /// Column `id`, compared case-insensitively.
    pub fn column(&self, id: &str) -> Option<&Column> {
        self.position(id).and_then(|i| self.columns.get(i))
    }

    pub(crate) fn column_mut(&mut self, id: &str) -> Result<&mut Column, ColumnError> {
        let index = self.position(id).ok_or_else(|| ColumnError::UnknownColumn(id.to_owned()))?;
        self.columns
            .get_mut(index)
            .ok_or_else(|| ColumnError::UnknownColumn(id.to_owned()))
    }

    /// Column with identity `handle`.
    pub fn column_by_handle(&self, handle: ColumnHandle) -> Option<&Column> {
        self.columns.iter().find(|c| c.handle == handle)
    }

    pub(crate) fn columns_mut(&mut self) -> impl Iterator<Item = &mut Column> + '_ {
        self.columns.iter_mut()
    }

    /// Appends a column.
    pub(crate) fn add_column(&mut self, def: ColumnDef) -> Result<ColumnHandle, ColumnError> {
        if self.position(def.id()).is_some() {
            return Err(ColumnError::DuplicateId(def.id().to_owned()));
        }
        let handle = ColumnHandle(self.next_handle);
        let column = Column::new(handle, def, &self.factory, self.repr)?;
        self.next_handle += 1;
        debug!(
            kind = ?self.kind,
            column = column.id(),
            hash = %short_hex(column.hash()),
            "added column"
        );
        self.columns.push(column);
        Ok(handle)
    }

    /// Removes column `id`, destroying its observers. The returned column
    /// still holds its values so the caller can unregister time keys.
    pub(crate) fn remove_column(&mut self, id: &str) -> Result<Column, ColumnError> {
        let index = self.position(id).ok_or_else(|| ColumnError::UnknownColumn(id.to_owned()))?;
        let mut column = self.columns.remove(index);
        column.close_watchers();
        debug!(kind = ?self.kind, column = column.id(), "removed column");
        Ok(column)
    }

    /// Applies `edit` to the definition of column `id`. The id itself cannot
    /// change; a changed default must still match the declared type.
    pub(crate) fn update_column(&mut self, id: &str, edit: impl FnOnce(&mut ColumnDef)) -> Result<(), ColumnError> {
        let column = self.column_mut(id)?;
        let mut def = column.def.clone();
        edit(&mut def);
        def.id.clone_from(&column.def.id);
        def.value_type = column.def.value_type;
        def.validate()?;
        column.hash = def.structural_hash();
        column.def = def;
        Ok(())
    }

    /// Drops every value of every column; definitions stay.
    pub(crate) fn clear_values(&mut self) {
        for column in &mut self.columns {
            column.clear_values();
        }
    }

    /// Canonical hash over the ordered column definitions.
    pub fn structural_hash(&self) -> Hash {
        let mut hasher = Hasher::new();
        hasher.update(&(self.columns.len() as u64).to_le_bytes());
        for column in &self.columns {
            hasher.update(column.hash());
        }
        hasher.finalize().into()
    }

    /// Identity and definition of every column.
    pub fn snapshot(&self) -> Vec<ColumnSnapshot> {
        self.columns.iter().map(Column::snapshot).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(ElementKind::Node, TimeRepresentation::Timestamp)
    }

    #[test]
    fn ids_are_unique_case_insensitively() {
        let mut t = table();
        t.add_column(ColumnDef::new("Weight", ValueType::Static(ScalarType::Double)))
            .unwrap();
        assert_eq!(
            t.add_column(ColumnDef::new("weight", ValueType::Static(ScalarType::Int))),
            Err(ColumnError::DuplicateId("weight".into()))
        );
        assert!(t.column("WEIGHT").is_some());
        assert_eq!(
            t.add_column(ColumnDef::new("", ValueType::Static(ScalarType::Int))),
            Err(ColumnError::EmptyId)
        );
    }

    #[test]
    fn default_must_match_the_declared_type() {
        let mut t = table();
        let bad = ColumnDef::new("w", ValueType::TimeMap(ScalarType::Int)).with_default("heavy");
        assert!(matches!(
            t.add_column(bad),
            Err(ColumnError::DefaultTypeMismatch { found: ScalarType::String, .. })
        ));
        assert!(t.is_empty());
    }

    #[test]
    fn writes_bump_the_column_version() {
        let mut t = table();
        t.add_column(ColumnDef::new("w", ValueType::Static(ScalarType::Int)).with_default(0))
            .unwrap();
        let col = t.column_mut("w").unwrap();
        assert_eq!(col.value(StoreId(3)), Some(&Scalar::Int(0)));
        col.set_value(StoreId(3), Scalar::Int(7)).unwrap();
        assert_eq!(col.version(), 1);
        assert!(col.set_value(StoreId(3), Scalar::from(true)).is_err());
        assert_eq!(col.version(), 1, "rejected writes leave the version alone");
        assert_eq!(col.value(StoreId(3)), Some(&Scalar::Int(7)));
        assert!(col.purge(StoreId(3)).is_empty());
        assert_eq!(col.version(), 2);
    }

    #[test]
    fn dynamic_cells_report_new_keys() {
        let mut t = table();
        t.add_column(ColumnDef::new("w", ValueType::TimeMap(ScalarType::Int)))
            .unwrap();
        let col = t.column_mut("w").unwrap();
        let k = TimeKeyValue::at(2.0).unwrap();
        assert!(col.set_value_at(StoreId(0), k, Scalar::Int(1)).unwrap());
        assert!(!col.set_value_at(StoreId(0), k, Scalar::Int(2)).unwrap());
        let span = TimeKeyValue::span(0.0, 1.0).unwrap();
        assert!(col.set_value_at(StoreId(1), span, Scalar::Int(1)).is_err());
        assert_eq!(col.value_count(), 1, "failed write must not leave an empty map");
        assert_eq!(col.value_at(StoreId(0), 2.0), Some(&Scalar::Int(2)));
        assert!(matches!(
            col.set_value(StoreId(0), Scalar::Int(1)),
            Err(ColumnError::NotStatic(_))
        ));
        assert_eq!(col.purge(StoreId(0)), vec![k]);
    }

    #[test]
    fn structural_hash_tracks_definitions() {
        let mut t = table();
        let empty = t.structural_hash();
        t.add_column(ColumnDef::new("w", ValueType::Static(ScalarType::Int)))
            .unwrap();
        let one = t.structural_hash();
        assert_ne!(empty, one);
        t.update_column("w", |def| def.title = "Weight".into()).unwrap();
        assert_ne!(one, t.structural_hash());
        t.remove_column("w").unwrap();
        assert_eq!(empty, t.structural_hash());
    }
}
