//! Declared attribute types.

use super::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared type of a property attribute.
///
/// Query-plan construction checks constants against this type so that
/// mismatches fail up front instead of silently matching nothing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int64,
    /// 64-bit float
    Float64,
    /// UTF-8 string
    String,
    /// Binary data
    Bytes,
    /// List of values of the element type
    List(Box<LogicalType>),
    /// Any non-null value
    Any,
}

impl LogicalType {
    /// Returns `true` if `value` can be compared against an attribute of this type.
    ///
    /// Int64 and Float64 accept each other's values. Null is never accepted.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => false,
            (LogicalType::Any, _) => true,
            (LogicalType::Bool, Value::Bool(_)) => true,
            (LogicalType::Int64 | LogicalType::Float64, Value::Int64(_) | Value::Float64(_)) => {
                true
            }
            (LogicalType::String, Value::String(_)) => true,
            (LogicalType::Bytes, Value::Bytes(_)) => true,
            (LogicalType::List(elem), Value::List(items)) => {
                items.iter().all(|v| v.is_null() || elem.accepts(v))
            }
            _ => false,
        }
    }

    /// Returns `true` if ordered comparisons are defined for this type.
    #[must_use]
    pub const fn is_orderable(&self) -> bool {
        matches!(
            self,
            LogicalType::Bool | LogicalType::Int64 | LogicalType::Float64 | LogicalType::String
        )
    }

    /// Returns `true` for Int64 and Float64.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, LogicalType::Int64 | LogicalType::Float64)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Bool => write!(f, "BOOL"),
            LogicalType::Int64 => write!(f, "INT64"),
            LogicalType::Float64 => write!(f, "FLOAT64"),
            LogicalType::String => write!(f, "STRING"),
            LogicalType::Bytes => write!(f, "BYTES"),
            LogicalType::List(elem) => write!(f, "LIST<{elem}>"),
            LogicalType::Any => write!(f, "ANY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_types_accept_each_other() {
        assert!(LogicalType::Int64.accepts(&Value::Float64(1.5)));
        assert!(LogicalType::Float64.accepts(&Value::Int64(3)));
        assert!(!LogicalType::Int64.accepts(&Value::from("3")));
    }

    #[test]
    fn test_null_never_accepted() {
        assert!(!LogicalType::Any.accepts(&Value::Null));
        assert!(!LogicalType::String.accepts(&Value::Null));
    }

    #[test]
    fn test_orderable() {
        assert!(LogicalType::String.is_orderable());
        assert!(!LogicalType::Bytes.is_orderable());
        assert!(!LogicalType::List(Box::new(LogicalType::Int64)).is_orderable());
        assert_eq!(LogicalType::List(Box::new(LogicalType::Int64)).to_string(), "LIST<INT64>");
    }
}
