//! Bound parameter values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rule::RuleValue;

/// A value bound to a named SQL parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// JSON value, bound as its text encoding.
    Json(serde_json::Value),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Named parameters of a compiled statement, in insertion order.
///
/// Keys are bare names; the `:` prefix only appears in SQL text.
pub type Params = IndexMap<String, FilterValue>;

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
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

impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
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

impl From<RuleValue> for FilterValue {
    fn from(v: RuleValue) -> Self {
        match v {
            RuleValue::Bool(b) => Self::Bool(b),
            RuleValue::Int(i) => Self::Int(i),
            RuleValue::Float(f) => Self::Float(f),
            RuleValue::String(s) => Self::String(s),
        }
    }
}

impl From<&RuleValue> for FilterValue {
    fn from(v: &RuleValue) -> Self {
        v.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(FilterValue::from(42), FilterValue::Int(42));
        assert_eq!(FilterValue::from("x"), FilterValue::String("x".into()));
        assert_eq!(FilterValue::from(None::<i64>), FilterValue::Null);
        assert_eq!(FilterValue::from(RuleValue::Bool(true)), FilterValue::Bool(true));
        assert!(FilterValue::Null.is_null());
    }

    #[test]
    fn test_params_keep_insertion_order() {
        let mut params = Params::new();
        params.insert("b_0".into(), 1.into());
        params.insert("a_0".into(), 2.into());
        let keys: Vec<_> = params.keys().cloned().collect();
        assert_eq!(keys, vec!["b_0", "a_0"]);
    }
}
