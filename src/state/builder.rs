// Copyright (c) 2025 - Cowboy AI, Inc.
//! State builder: initial state plus reducers
//!
//! A builder is supplied once per module and shared by every unit execution.
//! For each dispatched event at most one caller reducer runs: the reducer
//! registered for that kind if there is one, otherwise the catch-all.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CoreState, Event, EventKind, EventPayload, MutationState, UnitState};

/// Future returned by a reducer: a partial state to merge
pub type ReducerFuture = BoxFuture<'static, anyhow::Result<Value>>;

pub(crate) type EventReducer<S> =
    Arc<dyn Fn(MutationState<S>, Value) -> ReducerFuture + Send + Sync>;

pub(crate) type CatchAllReducer<S> =
    Arc<dyn Fn(MutationState<S>, Event) -> ReducerFuture + Send + Sync>;

type InitialState<S> = Arc<dyn Fn(&str) -> S + Send + Sync>;

/// Initial state and reducers for one unit state type
///
/// # Example
///
/// ```rust
/// use cim_mutations::state::StateBuilder;
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Upload {
///     files: Vec<String>,
/// }
///
/// let builder = StateBuilder::<Upload>::default()
///     .on("FILE_ADDED", |state, payload| {
///         let mut files = state.ext.files.clone();
///         files.push(payload["name"].as_str().unwrap_or_default().to_string());
///         Ok(json!({ "files": files }))
///     })
///     .declare_events(["FILE_ADDED"]);
///
/// assert!(builder.accepts(&"FILE_ADDED".into()));
/// assert!(!builder.accepts(&"FILE_REMOVED".into()));
/// ```
pub struct StateBuilder<S = CoreState> {
    initial: InitialState<S>,
    reducers: HashMap<EventKind, EventReducer<S>>,
    catch_all: Option<CatchAllReducer<S>>,
    declared: Option<HashSet<EventKind>>,
}

impl<S: UnitState> StateBuilder<S> {
    /// Builder whose initial extension state comes from `initial(uuid)`
    pub fn new<F>(initial: F) -> Self
    where
        F: Fn(&str) -> S + Send + Sync + 'static,
    {
        Self {
            initial: Arc::new(initial),
            reducers: HashMap::new(),
            catch_all: None,
            declared: None,
        }
    }

    /// Register a synchronous reducer for one event kind
    pub fn on<F>(self, kind: impl Into<EventKind>, reducer: F) -> Self
    where
        F: Fn(&MutationState<S>, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.on_async(kind, move |state, payload| {
            futures::future::ready(reducer(&state, &payload))
        })
    }

    /// Register an asynchronous reducer for one event kind
    pub fn on_async<F, Fut>(mut self, kind: impl Into<EventKind>, reducer: F) -> Self
    where
        F: Fn(MutationState<S>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let reducer: EventReducer<S> =
            Arc::new(move |state: MutationState<S>, payload: Value| reducer(state, payload).boxed());
        self.reducers.insert(kind.into(), reducer);
        self
    }

    /// Register a reducer for a typed event, decoding its payload first
    pub fn on_event<E, F>(self, reducer: F) -> Self
    where
        E: EventPayload + DeserializeOwned,
        F: Fn(&MutationState<S>, E) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.on(E::kind(), move |state, payload| {
            let event = E::deserialize(payload)?;
            reducer(state, event)
        })
    }

    /// Register a synchronous catch-all reducer for kinds without their own
    pub fn reducer<F>(self, reducer: F) -> Self
    where
        F: Fn(&MutationState<S>, &Event) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.reducer_async(move |state, event| futures::future::ready(reducer(&state, &event)))
    }

    /// Register an asynchronous catch-all reducer
    pub fn reducer_async<F, Fut>(mut self, reducer: F) -> Self
    where
        F: Fn(MutationState<S>, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let reducer: CatchAllReducer<S> =
            Arc::new(move |state: MutationState<S>, event: Event| reducer(state, event).boxed());
        self.catch_all = Some(reducer);
        self
    }

    /// Close the event set: only built-in kinds and `kinds` may be dispatched
    pub fn declare_events<I, K>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<EventKind>,
    {
        self.declared
            .get_or_insert_with(HashSet::new)
            .extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Whether `kind` may be dispatched
    pub fn accepts(&self, kind: &EventKind) -> bool {
        kind.is_builtin()
            || self
                .declared
                .as_ref()
                .map_or(true, |declared| declared.contains(kind))
    }

    pub fn initial_state(&self, uuid: &str) -> S {
        (self.initial)(uuid)
    }

    pub(crate) fn event_reducer(&self, kind: &EventKind) -> Option<EventReducer<S>> {
        self.reducers.get(kind).cloned()
    }

    pub(crate) fn catch_all(&self) -> Option<CatchAllReducer<S>> {
        self.catch_all.clone()
    }
}

impl<S: UnitState + Default> Default for StateBuilder<S> {
    fn default() -> Self {
        Self::new(|_| S::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> MutationState {
        MutationState {
            uuid: "u".into(),
            progress: 0.0,
            events: vec![],
            ext: CoreState {},
        }
    }

    #[tokio::test]
    async fn test_registered_reducer_is_found() {
        let builder = StateBuilder::<CoreState>::default()
            .on("PING", |_, payload| Ok(json!({ "echo": payload.clone() })));

        let reducer = builder.event_reducer(&"PING".into()).unwrap();
        let partial = reducer(state(), json!(1)).await.unwrap();
        assert_eq!(partial, json!({ "echo": 1 }));
        assert!(builder.event_reducer(&"PONG".into()).is_none());
        assert!(builder.catch_all().is_none());
    }

    #[test]
    fn test_open_event_set_accepts_everything() {
        let builder = StateBuilder::<CoreState>::default();
        assert!(builder.accepts(&"ANYTHING".into()));
    }

    #[test]
    fn test_closed_event_set_keeps_builtins() {
        let builder = StateBuilder::<CoreState>::default().declare_events(["A"]);
        assert!(builder.accepts(&EventKind::ProgressUpdate));
        assert!(builder.accepts(&EventKind::TransactionError));
        assert!(builder.accepts(&"A".into()));
        assert!(!builder.accepts(&"B".into()));
    }

    #[test]
    fn test_initial_state_receives_uuid() {
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        struct Tagged {
            origin: String,
        }

        let builder = StateBuilder::new(|uuid: &str| Tagged {
            origin: uuid.to_string(),
        });
        assert_eq!(builder.initial_state("abc").origin, "abc");
    }
}
