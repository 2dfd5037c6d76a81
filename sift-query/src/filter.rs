//! Operand values and predicate collections for building WHERE clauses.
//!
//! A [`FilterValue`] never reaches query text: it only travels through the
//! positional parameter list of a [`QueryBuilder`](crate::QueryBuilder).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::condition::Condition;
use crate::error::{QueryError, QueryResult};

/// A value that can be bound to a query parameter or read from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit integer value.
    Int(i32),
    /// 64-bit integer value.
    BigInt(i64),
    /// Float value.
    Float(f64),
    /// Exact decimal value.
    Decimal(Decimal),
    /// String value.
    String(String),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without zone.
    DateTime(NaiveDateTime),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Float(_) => "float",
            Self::Decimal(_) => "decimal",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::BigInt(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::String(v) => f.write_str(v),
            Self::Date(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<Decimal> for FilterValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for FilterValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// A row value could not be converted into the requested Rust type.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("expected {expected}, found {found}")]
pub struct ValueError {
    /// The Rust type that was requested.
    pub expected: &'static str,
    /// The variant that was found.
    pub found: &'static str,
}

impl ValueError {
    fn mismatch(expected: &'static str, value: &FilterValue) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

/// Conversion from a row value into a Rust field type.
pub trait FromValue: Sized {
    /// Convert the value, failing on a type mismatch.
    fn from_value(value: FilterValue) -> Result<Self, ValueError>;
}

impl FromValue for FilterValue {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::Bool(v) => Ok(v),
            other => Err(ValueError::mismatch("bool", &other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::Int(v) => Ok(v),
            FilterValue::BigInt(v) => {
                i32::try_from(v).map_err(|_| ValueError::mismatch("i32", &FilterValue::BigInt(v)))
            }
            other => Err(ValueError::mismatch("i32", &other)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::Int(v) => Ok(v as i64),
            FilterValue::BigInt(v) => Ok(v),
            other => Err(ValueError::mismatch("i64", &other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::Float(v) => Ok(v),
            FilterValue::Int(v) => Ok(v as f64),
            other => Err(ValueError::mismatch("f64", &other)),
        }
    }
}

impl FromValue for Decimal {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::Decimal(v) => Ok(v),
            FilterValue::Int(v) => Ok(Decimal::from(v)),
            FilterValue::BigInt(v) => Ok(Decimal::from(v)),
            other => Err(ValueError::mismatch("decimal", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::String(v) => Ok(v),
            other => Err(ValueError::mismatch("string", &other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::Date(v) => Ok(v),
            other => Err(ValueError::mismatch("date", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::DateTime(v) => Ok(v),
            other => Err(ValueError::mismatch("datetime", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: FilterValue) -> Result<Self, ValueError> {
        match value {
            FilterValue::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// One field/condition/operands filter fragment.
///
/// Operand count is not checked here; the builder checks it when the
/// predicate is rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    field: String,
    condition: Condition,
    values: Vec<FilterValue>,
}

impl Predicate {
    /// Create a predicate. The field is trimmed and must not be blank.
    pub fn new<I, V>(field: &str, condition: Condition, values: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Err(QueryError::invalid_field(field, "predicate field must not be blank"));
        }
        Ok(Self {
            field: trimmed.to_string(),
            condition,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Build from parts that were already validated.
    pub(crate) fn from_parts(field: String, condition: Condition, values: Vec<FilterValue>) -> Self {
        Self {
            field,
            condition,
            values,
        }
    }

    /// The field path.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The condition.
    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// The operands, in order.
    pub fn values(&self) -> &[FilterValue] {
        &self.values
    }
}

/// An insertion-ordered list of predicates, joined with AND when applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet {
    items: Vec<Predicate>,
}

impl PredicateSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a predicate built from its parts.
    ///
    /// ```rust
    /// use sift_query::{Condition, PredicateSet};
    ///
    /// let mut set = PredicateSet::new();
    /// set.add("unidade.id", Condition::Equal, [3i64])?
    ///     .add("ativo", Condition::Equal, [true])?;
    /// assert_eq!(set.len(), 2);
    /// # Ok::<(), sift_query::QueryError>(())
    /// ```
    pub fn add<I, V>(&mut self, field: &str, condition: Condition, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        self.items.push(Predicate::new(field, condition, values)?);
        Ok(self)
    }

    /// Append an already built predicate.
    pub fn push(&mut self, predicate: Predicate) -> &mut Self {
        self.items.push(predicate);
        self
    }

    /// Check if the set holds no predicates.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate the predicates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Predicate> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a PredicateSet {
    type Item = &'a Predicate;
    type IntoIter = std::slice::Iter<'a, Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
