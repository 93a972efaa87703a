//! Column values, comparators and value ranges
//!
//! The engine is generic over the cell type `C` supplied by the backing
//! store. This module provides the comparator abstraction the engine orders
//! cells with, the `Range` bounds used for fetch narrowing, and `Value`, the
//! concrete cell type of the bundled in-memory store.

mod comparator;
mod range;

pub use comparator::{Comparator, ComparatorRef, NaturalOrder, ValueComparator};
pub use range::Range;

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use std::fmt;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
}

impl ColumnType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    /// Whether values of the two types may be compared with each other
    pub fn is_comparable_with(&self, other: ColumnType) -> bool {
        *self == other || (self.is_numeric() && other.is_numeric())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "FLOAT",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Date => "DATE",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cell value of the in-memory store. SQL NULL is represented by `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Integer(i64),
    Float(OrderedFloat<f64>),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Integer(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Text(_) => ColumnType::Text,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Date(_) => ColumnType::Date,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(v.into_inner()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

/// Literal as written in statement text, before the store converts it to a cell value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Text(String),
    /// Numeric literal in its source spelling
    Number(String),
    Boolean(bool),
    /// `YYYY-MM-DD`
    Date(String),
}

impl Literal {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Literal::Text(_) => ColumnType::Text,
            Literal::Number(n) => {
                if n.contains(['.', 'e', 'E']) {
                    ColumnType::Float
                } else {
                    ColumnType::Integer
                }
            }
            Literal::Boolean(_) => ColumnType::Boolean,
            Literal::Date(_) => ColumnType::Date,
        }
    }

    /// Reinterpret a text literal for a column of the given type.
    ///
    /// Only text -> date is rewritten; everything else is returned unchanged.
    pub fn coerce_to(self, target: ColumnType) -> Literal {
        match (self, target) {
            (Literal::Text(s), ColumnType::Date) => Literal::Date(s),
            (lit, _) => lit,
        }
    }

    /// Negate a numeric literal (unary minus)
    pub fn negate(self) -> Option<Literal> {
        match self {
            Literal::Number(n) => match n.strip_prefix('-') {
                Some(rest) => Some(Literal::Number(rest.to_string())),
                None => Some(Literal::Number(format!("-{}", n))),
            },
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Text(s) => write!(f, "'{}'", s),
            Literal::Number(n) => f.write_str(n),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Date(d) => write!(f, "DATE '{}'", d),
        }
    }
}
