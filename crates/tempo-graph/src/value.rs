// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Attribute values, declared value types and dynamic value containers.
//!
//! A column declares a [`ValueType`]: either a static scalar or a
//! [`TimeMap`] of scalars keyed by the graph's time representation. Dynamic
//! containers are built through a [`ValueFactory`], which maps a declared
//! type to its constructor once, when the column is created.

use std::collections::BTreeMap;
use std::fmt;

use blake3::Hasher;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::TimeRepresentation;
use crate::temporal::{TimeKeyError, TimeKeyValue};

/// Scalar type carried by a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarType {
    /// `bool`.
    Bool,
    /// `i32`.
    Int,
    /// `i64`.
    Long,
    /// `f64`.
    Double,
    /// UTF-8 string.
    String,
}

impl ScalarType {
    fn tag(self) -> u8 {
        match self {
            Self::Bool => 1,
            Self::Int => 2,
            Self::Long => 3,
            Self::Double => 4,
            Self::String => 5,
        }
    }
}

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Scalar {
    /// Boolean value.
    Bool(bool),
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Double precision float.
    Double(f64),
    /// String value.
    String(String),
}

impl Scalar {
    /// Type of this value.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Self::Bool(_) => ScalarType::Bool,
            Self::Int(_) => ScalarType::Int,
            Self::Long(_) => ScalarType::Long,
            Self::Double(_) => ScalarType::Double,
            Self::String(_) => ScalarType::String,
        }
    }

    /// Numeric view used by estimators; `None` for booleans and strings.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Bool(_) | Self::String(_) => None,
        }
    }

    pub(crate) fn feed(&self, hasher: &mut Hasher) {
        hasher.update(&[self.scalar_type().tag()]);
        match self {
            Self::Bool(v) => {
                hasher.update(&[u8::from(*v)]);
            }
            Self::Int(v) => {
                hasher.update(&v.to_le_bytes());
            }
            Self::Long(v) => {
                hasher.update(&v.to_le_bytes());
            }
            Self::Double(v) => {
                hasher.update(&v.to_bits().to_le_bytes());
            }
            Self::String(v) => {
                hasher.update(&(v.len() as u64).to_le_bytes());
                hasher.update(v.as_bytes());
            }
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Declared type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    /// One value per element.
    Static(ScalarType),
    /// Time-keyed values per element.
    TimeMap(ScalarType),
}

impl ValueType {
    /// Scalar type of the stored values.
    #[must_use]
    pub fn scalar(self) -> ScalarType {
        match self {
            Self::Static(s) | Self::TimeMap(s) => s,
        }
    }

    /// Returns `true` for time-keyed types.
    #[must_use]
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::TimeMap(_))
    }

    pub(crate) fn feed(self, hasher: &mut Hasher) {
        hasher.update(&[u8::from(self.is_dynamic()), self.scalar().tag()]);
    }
}

/// How a dynamic column collapses its time-keyed values into one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Estimator {
    /// Arithmetic mean (numeric columns only).
    Average,
    /// Smallest value (numeric columns only).
    Min,
    /// Largest value (numeric columns only).
    Max,
    /// Value at the earliest key.
    First,
    /// Value at the latest key.
    Last,
}

impl Estimator {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::Average => 1,
            Self::Min => 2,
            Self::Max => 3,
            Self::First => 4,
            Self::Last => 5,
        }
    }
}

/// Errors raised by value containers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// A value of the wrong scalar type was supplied.
    #[error("expected a {expected:?} value, got {found:?}")]
    TypeMismatch {
        /// Declared scalar type.
        expected: ScalarType,
        /// Type of the rejected value.
        found: ScalarType,
    },
    /// The time key is invalid or of the wrong representation.
    #[error(transparent)]
    TimeKey(#[from] TimeKeyError),
    /// No container constructor is registered for a dynamic type.
    #[error("no value container registered for {0:?}")]
    NoContainer(ValueType),
}

/// Time-keyed values of one element in one dynamic column.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeMap {
    scalar: ScalarType,
    repr: TimeRepresentation,
    values: BTreeMap<TimeKeyValue, Scalar>,
}

impl TimeMap {
    /// Empty map of `scalar` values keyed by `repr`.
    #[must_use]
    pub fn new(scalar: ScalarType, repr: TimeRepresentation) -> Self {
        Self {
            scalar,
            repr,
            values: BTreeMap::new(),
        }
    }

    /// Scalar type of the stored values.
    #[must_use]
    pub fn scalar_type(&self) -> ScalarType {
        self.scalar
    }

    /// Key representation.
    #[must_use]
    pub fn representation(&self) -> TimeRepresentation {
        self.repr
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no key is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sets `value` at `key`, returning the value it replaced.
    ///
    /// # Errors
    /// [`ValueError::TypeMismatch`] or a [`TimeKeyError`] for invalid keys and
    /// keys of the other representation. The map is unchanged on error.
    pub fn insert(&mut self, key: TimeKeyValue, value: Scalar) -> Result<Option<Scalar>, ValueError> {
        if value.scalar_type() != self.scalar {
            return Err(ValueError::TypeMismatch {
                expected: self.scalar,
                found: value.scalar_type(),
            });
        }
        if key.representation() != self.repr {
            return Err(TimeKeyError::RepresentationMismatch {
                expected: self.repr,
                found: key.representation(),
            }
            .into());
        }
        Ok(self.values.insert(key, value))
    }

    /// Removes the value at `key`.
    pub fn remove(&mut self, key: &TimeKeyValue) -> Option<Scalar> {
        self.values.remove(key)
    }

    /// Value stored at exactly `key`.
    #[must_use]
    pub fn get(&self, key: &TimeKeyValue) -> Option<&Scalar> {
        self.values.get(key)
    }

    /// Keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = TimeKeyValue> + '_ {
        self.values.keys().copied()
    }

    /// Value of the earliest key covering `t`.
    #[must_use]
    pub fn value_at(&self, t: f64) -> Option<&Scalar> {
        self.values
            .iter()
            .find(|(key, _)| match key {
                TimeKeyValue::Timestamp(ts) => ts.value() == t,
                TimeKeyValue::Interval(iv) => iv.contains(t),
            })
            .map(|(_, v)| v)
    }

    /// Collapses the map into a single value.
    ///
    /// Numeric estimators return `None` for non-numeric columns; every
    /// estimator returns `None` on an empty map.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn estimate(&self, estimator: Estimator) -> Option<Scalar> {
        let numeric = || self.values.values().filter_map(|v| v.as_f64().map(|n| (n, v)));
        match estimator {
            Estimator::First => self.values.values().next().cloned(),
            Estimator::Last => self.values.values().next_back().cloned(),
            Estimator::Min => numeric()
                .min_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, v)| v.clone()),
            Estimator::Max => numeric()
                .max_by(|a, b| a.0.total_cmp(&b.0))
                .map(|(_, v)| v.clone()),
            Estimator::Average => {
                let (sum, count) = numeric().fold((0.0, 0usize), |(s, c), (n, _)| (s + n, c + 1));
                (count > 0).then(|| Scalar::Double(sum / count as f64))
            }
        }
    }
}

/// Constructor for the dynamic value container of one element.
pub type TimeMapCtor = fn(TimeRepresentation) -> TimeMap;

/// Maps declared dynamic types to their container constructors.
#[derive(Clone, Debug)]
pub struct ValueFactory {
    ctors: FxHashMap<ScalarType, TimeMapCtor>,
}

impl Default for ValueFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register(ScalarType::Bool, |repr| TimeMap::new(ScalarType::Bool, repr));
        factory.register(ScalarType::Int, |repr| TimeMap::new(ScalarType::Int, repr));
        factory.register(ScalarType::Long, |repr| TimeMap::new(ScalarType::Long, repr));
        factory.register(ScalarType::Double, |repr| TimeMap::new(ScalarType::Double, repr));
        factory.register(ScalarType::String, |repr| TimeMap::new(ScalarType::String, repr));
        factory
    }
}

impl ValueFactory {
    /// Factory with no constructor registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ctors: FxHashMap::default(),
        }
    }

    /// Registers the constructor for `TimeMap(scalar)` columns, returning the
    /// one it replaces.
    pub fn register(&mut self, scalar: ScalarType, ctor: TimeMapCtor) -> Option<TimeMapCtor> {
        self.ctors.insert(scalar, ctor)
    }

    /// Constructor for `ty`: `None` for static types.
    ///
    /// # Errors
    /// [`ValueError::NoContainer`] when a dynamic type has no constructor.
    pub fn resolve(&self, ty: ValueType) -> Result<Option<TimeMapCtor>, ValueError> {
        match ty {
            ValueType::Static(_) => Ok(None),
            ValueType::TimeMap(scalar) => self
                .ctors
                .get(&scalar)
                .copied()
                .map(Some)
                .ok_or(ValueError::NoContainer(ty)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn at(t: f64) -> TimeKeyValue {
        TimeKeyValue::at(t).unwrap()
    }

    #[test]
    fn time_map_rejects_foreign_values_and_keys() {
        let mut map = TimeMap::new(ScalarType::Int, TimeRepresentation::Timestamp);
        assert!(matches!(
            map.insert(at(1.0), Scalar::from("x")),
            Err(ValueError::TypeMismatch { .. })
        ));
        let span = TimeKeyValue::span(0.0, 1.0).unwrap();
        assert!(matches!(
            map.insert(span, Scalar::Int(1)),
            Err(ValueError::TimeKey(TimeKeyError::RepresentationMismatch { .. }))
        ));
        assert!(map.is_empty());
        assert_eq!(map.insert(at(1.0), Scalar::Int(4)).unwrap(), None);
        assert_eq!(map.insert(at(1.0), Scalar::Int(5)).unwrap(), Some(Scalar::Int(4)));
        assert_eq!(map.value_at(1.0), Some(&Scalar::Int(5)));
        assert_eq!(map.value_at(2.0), None);
    }

    #[test]
    fn estimators_follow_key_order() {
        let mut map = TimeMap::new(ScalarType::Double, TimeRepresentation::Interval);
        map.insert(TimeKeyValue::span(5.0, 6.0).unwrap(), Scalar::Double(1.0))
            .unwrap();
        map.insert(TimeKeyValue::span(0.0, 9.0).unwrap(), Scalar::Double(3.0))
            .unwrap();
        assert_eq!(map.estimate(Estimator::First), Some(Scalar::Double(3.0)));
        assert_eq!(map.estimate(Estimator::Last), Some(Scalar::Double(1.0)));
        assert_eq!(map.estimate(Estimator::Average), Some(Scalar::Double(2.0)));
        assert_eq!(map.estimate(Estimator::Min), Some(Scalar::Double(1.0)));
        assert_eq!(map.value_at(5.5), Some(&Scalar::Double(3.0)));

        let strings = TimeMap::new(ScalarType::String, TimeRepresentation::Interval);
        assert_eq!(strings.estimate(Estimator::Max), None);
    }

    #[test]
    fn factory_resolves_once_per_type() {
        let factory = ValueFactory::default();
        assert!(factory
            .resolve(ValueType::Static(ScalarType::Int))
            .unwrap()
            .is_none());
        let ctor = factory
            .resolve(ValueType::TimeMap(ScalarType::Long))
            .unwrap()
            .unwrap();
        let map = ctor(TimeRepresentation::Interval);
        assert_eq!(map.scalar_type(), ScalarType::Long);
        assert_eq!(map.representation(), TimeRepresentation::Interval);

        let empty = ValueFactory::empty();
        assert!(matches!(
            empty.resolve(ValueType::TimeMap(ScalarType::Bool)),
            Err(ValueError::NoContainer(ValueType::TimeMap(ScalarType::Bool)))
        ));
    }
}
