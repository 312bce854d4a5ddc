// Copyright (c) 2025 - Cowboy AI, Inc.
//! Remote query delegation
//!
//! Resolvers sometimes need to read from the node they mutate. The transport
//! is the caller's choice; this module only fixes the request shape and the
//! seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ExecutionResult;

/// A read query with its variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub variables: Map<String, Value>,
}

impl Query {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
        }
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }
}

/// Executes read queries against a node
///
/// Transport failures are reported in the result's `errors`.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: Query, uri: &str) -> ExecutionResult;
}
