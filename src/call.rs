//! Calls crossing the boundary and their outcomes

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single request issued by the embedded runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name, matched exactly
    pub method: String,
    /// Opaque argument payload, `null` when the caller passed none
    #[serde(rename = "args", default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Creates a call with the given arguments
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Creates a call without arguments
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }
}

/// The one result every dispatched call produces
#[derive(Debug, Clone, PartialEq)]
pub enum MethodOutcome {
    /// The method ran and returned a value
    Success(Value),
    /// No handler recognizes the method
    NotImplemented,
}

impl MethodOutcome {
    /// Shorthand for a successful outcome
    pub fn success(value: impl Into<Value>) -> Self {
        MethodOutcome::Success(value.into())
    }

    /// Whether this is the not-implemented marker
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, MethodOutcome::NotImplemented)
    }

    /// Returns the success value, if any
    pub fn value(&self) -> Option<&Value> {
        match self {
            MethodOutcome::Success(value) => Some(value),
            MethodOutcome::NotImplemented => None,
        }
    }
}
