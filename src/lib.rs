// Copyright (c) 2025 - Cowboy AI, Inc.
//! Batch mutation execution for the Composable Information Machine
//!
//! A batch document holding several mutation calls is split into one unit per
//! call, each unit runs in declaration order, and the results are folded back
//! under collision-free result keys. While units run, each one publishes a
//! live [`state::MutationState`] derived from the events its resolver
//! dispatches; callers that pass a root subject receive the merged state of
//! every unit after each change.

pub mod aggregation;
pub mod config;
pub mod context;
pub mod document;
pub mod errors;
pub mod execute;
pub mod executor;
pub mod frp;
pub mod mutations;
pub mod resolver;
pub mod split;
pub mod state;

// Re-export commonly used types
pub use config::{ConfigError, ConfigGenerators, MutationsConfig};
pub use context::MutationContext;
pub use document::{Document, DocumentError};
pub use errors::{MutationsError, MutationsResult};
pub use executor::{ExecutionResult, GraphError, Query, QueryExecutor, UnitExecutor};
pub use frp::Subject;
pub use mutations::{MutationQuery, Mutations, MutationsModule};
pub use resolver::{ResolveInfo, Resolver, ResolverMap};
pub use state::{
    CoreState, Event, EventKind, MutationState, MutationStates, MutationStatesSubject,
    StateBuilder, StateError, StateUpdater,
};
