// Value Implementation
//
// This module defines the typed value carried by tuples and evaluated by
// expressions. Comparisons against NULL are three-valued.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::schema::DataType;

/// Three-valued boolean produced by value comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpBool {
    True,
    False,
    Null,
}

/// Errors raised by value arithmetic
#[derive(Error, Debug)]
pub enum ValueError {
    #[error("Numeric overflow")]
    NumericOverflow,
    #[error("Cannot add {0:?} and {1:?}")]
    IncompatibleTypes(DataType, DataType),
}

/// A typed SQL value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Type discriminant first so different variants never collide
        match self {
            Value::Null => {
                0.hash(state);
            }
            Value::Integer(i) => {
                1.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                2.hash(state);
                // NaN and -0.0 hash by bit pattern
                f.to_bits().hash(state);
            }
            Value::Text(s) => {
                3.hash(state);
                s.hash(state);
            }
            Value::Boolean(b) => {
                4.hash(state);
                b.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            // Null is incomparable with anything
            (Value::Null, _) | (_, Value::Null) => None,

            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),

            // Integer and float can be compared
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),

            (Value::Text(a), Value::Text(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),

            // Different types are incomparable (except int/float)
            _ => None,
        }
    }
}

impl Value {
    /// Three-valued equality: NULL compared with anything is NULL.
    pub fn compare_equals(&self, other: &Value) -> CmpBool {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => CmpBool::Null,
            (Value::Integer(a), Value::Float(b)) => from_bool(*a as f64 == *b),
            (Value::Float(a), Value::Integer(b)) => from_bool(*a == *b as f64),
            (a, b) => from_bool(a == b),
        }
    }

    /// Add two numeric values. NULL absorbs.
    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
            (Value::Integer(a), Value::Integer(b)) => a
                .checked_add(*b)
                .map(Value::Integer)
                .ok_or(ValueError::NumericOverflow),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Integer(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
            (Value::Float(a), Value::Integer(b)) => Ok(Value::Float(a + *b as f64)),
            (a, b) => Err(ValueError::IncompatibleTypes(a.data_type(), b.data_type())),
        }
    }

    /// Predicate truth: only `Boolean(true)` counts, NULL and false do not.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            // NULL has no type of its own; Text is the widest carrier
            Value::Null => DataType::Text,
            Value::Integer(_) => DataType::Integer,
            Value::Float(_) => DataType::Float,
            Value::Text(_) => DataType::Text,
            Value::Boolean(_) => DataType::Boolean,
        }
    }
}

fn from_bool(b: bool) -> CmpBool {
    if b {
        CmpBool::True
    } else {
        CmpBool::False
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_equals_three_valued() {
        assert_eq!(
            Value::Integer(1).compare_equals(&Value::Integer(1)),
            CmpBool::True
        );
        assert_eq!(
            Value::Integer(1).compare_equals(&Value::Integer(2)),
            CmpBool::False
        );
        assert_eq!(Value::Null.compare_equals(&Value::Integer(1)), CmpBool::Null);
        assert_eq!(Value::Null.compare_equals(&Value::Null), CmpBool::Null);
    }

    #[test]
    fn test_numeric_cross_type_equality() {
        assert_eq!(
            Value::Integer(2).compare_equals(&Value::Float(2.0)),
            CmpBool::True
        );
    }

    #[test]
    fn test_add() {
        assert_eq!(
            Value::Integer(1).add(&Value::Integer(2)).unwrap(),
            Value::Integer(3)
        );
        assert_eq!(
            Value::Integer(1).add(&Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(Value::Null.add(&Value::Integer(1)).unwrap(), Value::Null);
        assert!(Value::Integer(i64::MAX).add(&Value::Integer(1)).is_err());
        assert!(Value::Text("a".into()).add(&Value::Integer(1)).is_err());
    }

    #[test]
    fn test_is_true() {
        assert!(Value::Boolean(true).is_true());
        assert!(!Value::Boolean(false).is_true());
        assert!(!Value::Null.is_true());
        assert!(!Value::Integer(1).is_true());
    }

    #[test]
    fn test_partial_ord_across_numerics() {
        assert!(Value::Integer(1) < Value::Float(1.5));
        assert!(Value::Text("b".into()) > Value::Text("a".into()));
        assert_eq!(Value::Null.partial_cmp(&Value::Integer(1)), None);
    }
}
