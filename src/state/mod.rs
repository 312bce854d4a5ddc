// Copyright (c) 2025 - Cowboy AI, Inc.
//! Mutation State
//!
//! Every executing unit owns a [`MutationState`] derived from an append-only
//! event log. Resolvers dispatch events through a [`StateUpdater`]; reducers
//! turn each event into a partial state that is deep-merged into the current
//! state, and the result is published to the unit's subject.
//!
//! ```text
//! dispatch(kind, payload)
//!     │
//!     ├─ append Event to log
//!     ├─ built-in reducer (PROGRESS_UPDATE, ...)        ─┐
//!     ├─ builder reducer for kind  OR  catch-all reducer ─┴─ deep merge
//!     └─ publish snapshot ──► Subject<MutationState<S>>
//! ```
//!
//! # Merge Semantics
//!
//! Partial states are deep-merged: scalars overwrite, objects merge
//! recursively, arrays replace wholesale. The `events` field is owned by the
//! updater and is never taken from a reducer's partial.

pub mod builder;
pub mod core;
pub mod merge;
pub mod updater;

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::frp::Subject;

pub use self::builder::StateBuilder;
pub use self::core::{
    EventPayload, ProgressUpdate, TransactionCompleted, TransactionCreated, TransactionError,
};
pub use self::updater::StateUpdater;

/// Errors raised by [`StateUpdater::dispatch`]
#[derive(Debug, Error)]
pub enum StateError {
    /// The builder declares a closed event set that does not include this kind
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    /// A `PROGRESS_UPDATE` value fell outside `[0, 1]`
    #[error("Progress value must be between 0 and 1, got {value}")]
    ProgressOutOfRange { value: f64 },

    /// A built-in event carried a payload of the wrong shape
    #[error("Invalid payload for {kind}: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// A reducer returned something other than an object
    #[error("Reducer for {kind} returned a non-object partial state")]
    InvalidPartial { kind: String },

    /// A caller-supplied reducer failed
    #[error("Reducer for {kind} failed: {source}")]
    Reducer {
        kind: String,
        #[source]
        source: anyhow::Error,
    },

    /// The merged state no longer fits the state type
    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Bounds every unit state type must satisfy
pub trait UnitState: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> UnitState for T where T: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{}

/// Event kind: one of the built-in kinds or a caller-declared custom kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    ProgressUpdate,
    TransactionCreated,
    TransactionCompleted,
    TransactionError,
    Custom(String),
}

impl EventKind {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::from(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::ProgressUpdate => "PROGRESS_UPDATE",
            EventKind::TransactionCreated => "TRANSACTION_CREATED",
            EventKind::TransactionCompleted => "TRANSACTION_COMPLETED",
            EventKind::TransactionError => "TRANSACTION_ERROR",
            EventKind::Custom(name) => name,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, EventKind::Custom(_))
    }
}

impl From<String> for EventKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "PROGRESS_UPDATE" => EventKind::ProgressUpdate,
            "TRANSACTION_CREATED" => EventKind::TransactionCreated,
            "TRANSACTION_COMPLETED" => EventKind::TransactionCompleted,
            "TRANSACTION_ERROR" => EventKind::TransactionError,
            _ => EventKind::Custom(name),
        }
    }
}

impl From<&str> for EventKind {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Custom(name) => name,
            builtin => builtin.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatched event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: EventKind,
    pub payload: Value,
}

impl Event {
    /// Deserialize the payload into a typed event
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Append-only event log for one unit execution
pub type EventLog = Vec<Event>;

/// Marker state for mutations that track nothing beyond the core fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreState {}

/// Live state of one unit execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationState<S = CoreState> {
    pub uuid: String,
    pub progress: f64,
    pub events: EventLog,
    #[serde(flatten)]
    pub ext: S,
}

impl<S: UnitState> MutationState<S> {
    /// State before any event: no progress, an empty log and the builder's
    /// initial extension
    pub fn initial(uuid: impl Into<String>, builder: &StateBuilder<S>) -> Self {
        let uuid = uuid.into();
        Self {
            ext: builder.initial_state(&uuid),
            uuid,
            progress: 0.0,
            events: Vec::new(),
        }
    }
}

/// Merged snapshot of every unit in a batch, keyed by result key
pub type MutationStates<S = CoreState> = BTreeMap<String, MutationState<S>>;

/// Publisher of one unit's state
pub type MutationStateSubject<S = CoreState> = Subject<MutationState<S>>;

/// Publisher of a batch's merged state snapshot
pub type MutationStatesSubject<S = CoreState> = Subject<MutationStates<S>>;
