// Copyright (c) 2025 - Cowboy AI, Inc.
//! Unit Executors
//!
//! An executor runs one single-field sub-document and returns a GraphQL-style
//! result. The batch driver never looks inside a unit; it only reads
//! `data[name]` and `errors` from what the executor returns.
//!
//! ```text
//! UnitOperation ──► UnitExecutor::execute ──► ExecutionResult { data?, errors? }
//!                        │
//!                        ├── LocalExecutor (default: registry + argument binding)
//!                        └── caller-supplied engine
//! ```
//!
//! Remote reads issued by resolvers go through a separate [`QueryExecutor`].

pub mod local;
pub mod query;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::context::UnitContext;
use crate::split::UnitOperation;
use crate::state::{CoreState, UnitState};

pub use local::LocalExecutor;
pub use query::{Query, QueryExecutor};

/// A located execution error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl GraphError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn with_path(mut self, segment: impl Into<String>) -> Self {
        self.path.push(segment.into());
        self
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{} (at {})", self.message, self.path.join("."))
        }
    }
}

/// Outcome of executing a unit or a batch
///
/// `data` is present only if something produced data, `errors` only if
/// something failed; both may be present after a partial failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<GraphError>>,
}

impl ExecutionResult {
    pub fn from_data(data: Map<String, Value>) -> Self {
        Self {
            data: Some(data),
            errors: None,
        }
    }

    pub fn from_error(error: GraphError) -> Self {
        Self {
            data: None,
            errors: Some(vec![error]),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|errors| !errors.is_empty())
    }

    /// Value under `key` in `data`, if any
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.as_ref()?.get(key)
    }
}

/// Executes one single-field sub-document
#[async_trait]
pub trait UnitExecutor<S: UnitState = CoreState>: Send + Sync {
    async fn execute(&self, unit: &UnitOperation, context: UnitContext<S>) -> ExecutionResult;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_json_omits_absent_parts() {
        let result = ExecutionResult::from_error(GraphError::new("boom").with_path("f_1"));
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({ "errors": [{ "message": "boom", "path": ["f_1"] }] })
        );
        assert!(result.has_errors());
        assert_eq!(result.get("f_1"), None);
    }

    #[test]
    fn test_graph_error_display() {
        assert_eq!(GraphError::new("boom").to_string(), "boom");
        assert_eq!(
            GraphError::new("boom").with_path("f").to_string(),
            "boom (at f)"
        );
    }
}
