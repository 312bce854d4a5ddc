// Copyright (c) 2025 - Cowboy AI, Inc.
//! State updater: the per-unit dispatch handle
//!
//! Dispatches against one updater are serialized, so the event log order is
//! the dispatch order and every published snapshot reflects a complete
//! dispatch.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::merge::deep_merge;
use super::{
    core, Event, EventKind, EventPayload, MutationState, MutationStateSubject, StateBuilder,
    StateError, UnitState,
};

struct Inner<S> {
    state: MutationState<S>,
    builder: Arc<StateBuilder<S>>,
    subject: Option<MutationStateSubject<S>>,
}

impl<S: UnitState> Inner<S> {
    fn apply(&mut self, kind: &EventKind, partial: Value) -> Result<(), StateError> {
        let mut partial = match partial {
            Value::Object(partial) => partial,
            Value::Null => return Ok(()),
            _ => {
                return Err(StateError::InvalidPartial {
                    kind: kind.to_string(),
                })
            }
        };
        partial.remove("events");
        if partial.is_empty() {
            return Ok(());
        }

        let mut merged = serde_json::to_value(&self.state)?;
        deep_merge(&mut merged, Value::Object(partial));
        self.state = serde_json::from_value(merged)?;
        Ok(())
    }

    fn publish(&self) {
        if let Some(subject) = &self.subject {
            subject.next(self.state.clone());
        }
    }
}

/// Dispatch handle for one unit execution
///
/// Cloning yields another handle to the same state.
pub struct StateUpdater<S = super::CoreState> {
    uuid: String,
    inner: Arc<Mutex<Inner<S>>>,
}

impl<S> Clone for StateUpdater<S> {
    fn clone(&self) -> Self {
        Self {
            uuid: self.uuid.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<S: UnitState> StateUpdater<S> {
    /// Create the initial state and publish it to `subject`
    pub fn new(
        uuid: impl Into<String>,
        builder: Arc<StateBuilder<S>>,
        subject: Option<MutationStateSubject<S>>,
    ) -> Self {
        let uuid = uuid.into();
        let state = MutationState::initial(uuid.clone(), &builder);
        let inner = Inner {
            state,
            builder,
            subject,
        };
        inner.publish();

        Self {
            uuid,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Snapshot of the current state
    pub async fn current(&self) -> MutationState<S> {
        self.inner.lock().await.state.clone()
    }

    /// Append an event, run its reducers and publish the new state
    ///
    /// The event stays in the log even if a reducer rejects it; in that case
    /// the rejected partial is not merged and nothing is published.
    pub async fn dispatch(
        &self,
        kind: impl Into<EventKind>,
        payload: Value,
    ) -> Result<(), StateError> {
        let kind = kind.into();
        let mut inner = self.inner.lock().await;

        if !inner.builder.accepts(&kind) {
            warn!(uuid = %self.uuid, event = %kind, "Rejected undeclared event kind");
            return Err(StateError::UnknownEventKind(kind.to_string()));
        }

        let event = Event {
            name: kind.clone(),
            payload,
        };
        inner.state.events.push(event.clone());
        trace!(uuid = %self.uuid, event = %kind, seq = inner.state.events.len(), "Event appended");

        if let Some(partial) = core::reduce(&kind, &event.payload) {
            inner.apply(&kind, partial?)?;
        }

        let builder = inner.builder.clone();
        let reduced = if let Some(reducer) = builder.event_reducer(&kind) {
            Some(reducer(inner.state.clone(), event.payload).await)
        } else if let Some(reducer) = builder.catch_all() {
            Some(reducer(inner.state.clone(), event).await)
        } else {
            None
        };

        if let Some(partial) = reduced {
            let partial = partial.map_err(|source| StateError::Reducer {
                kind: kind.to_string(),
                source,
            })?;
            inner.apply(&kind, partial)?;
        }

        debug!(uuid = %self.uuid, event = %kind, progress = inner.state.progress, "State updated");
        inner.publish();
        Ok(())
    }

    /// Dispatch a typed event
    pub async fn dispatch_event<E: EventPayload>(&self, event: E) -> Result<(), StateError> {
        let payload = serde_json::to_value(&event)?;
        self.dispatch(E::kind(), payload).await
    }
}
