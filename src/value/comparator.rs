//! Total orders over column values

use super::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Total order over cell values, injected by the backing store
pub trait Comparator<C>: Send + Sync {
    fn compare(&self, a: &C, b: &C) -> Ordering;

    fn equal(&self, a: &C, b: &C) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

/// Shared, read-only comparator handle
pub type ComparatorRef<C> = Arc<dyn Comparator<C>>;

/// Comparator delegating to `Ord`
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<C: Ord> Comparator<C> for NaturalOrder {
    fn compare(&self, a: &C, b: &C) -> Ordering {
        a.cmp(b)
    }
}

/// Comparator for [`Value`]
///
/// Integers and floats compare numerically with each other. Values of
/// unrelated kinds are ordered by kind: booleans, numbers, text, dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueComparator;

impl ValueComparator {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
            Value::Date(_) => 3,
        }
    }
}

impl Comparator<Value> for ValueComparator {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
            (Value::Float(x), Value::Float(y)) => x.cmp(y),
            (Value::Integer(_), Value::Float(_)) | (Value::Float(_), Value::Integer(_)) => {
                // Both sides are numeric here
                let x = a.as_f64().unwrap_or_default();
                let y = b.as_f64().unwrap_or_default();
                x.total_cmp(&y)
            }
            (Value::Text(x), Value::Text(y)) => x.cmp(y),
            (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
            (Value::Date(x), Value::Date(y)) => x.cmp(y),
            _ => Self::rank(a).cmp(&Self::rank(b)),
        }
    }
}
