// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for mutation batch execution

use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::state::StateError;

/// Errors that can occur while executing or configuring mutations
#[derive(Debug, Error)]
pub enum MutationsError {
    /// The batch document could not be parsed or has an unsupported shape
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Configuration arguments did not match the declared generators
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A state dispatch was rejected
    #[error(transparent)]
    State(#[from] StateError),

    /// A unit did not complete within the configured bound
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// A resolver issued a remote query but no executor or endpoint is configured
    #[error("No query executor configured for remote queries")]
    NoQueryExecutor,
}

/// Result type for mutation operations
pub type MutationsResult<T> = Result<T, MutationsError>;

impl From<serde_json::Error> for MutationsError {
    fn from(err: serde_json::Error) -> Self {
        MutationsError::State(StateError::Serialization(err))
    }
}
