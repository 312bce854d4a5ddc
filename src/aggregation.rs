// Copyright (c) 2025 - Cowboy AI, Inc.
//! Aggregation Tree
//!
//! Per-batch fan-in of unit state subjects into the caller's root subject:
//!
//! ```text
//! unit "save"    Subject<MutationState> ──┐
//! unit "save_1"  Subject<MutationState> ──┼─ combine_latest ─► root: Subject<MutationStates>
//! unit "ping"    Subject<MutationState> ──┘      { save, save_1, ping }
//! ```
//!
//! One subject is allocated per unit call whose name has a registered
//! resolver, eagerly and before any unit runs, so the root receives its
//! first snapshot as soon as every tracked unit has published its initial
//! state. A unit that ends without ever publishing (it failed before its
//! resolver ran) is [settled](AggregationTree::settle) with an initial state
//! so its slot cannot hold the join back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::frp::{combine_latest, CombineLatest, Subject};
use crate::split::UnitCall;
use crate::state::{
    MutationState, MutationStateSubject, MutationStates, MutationStatesSubject, StateBuilder,
    UnitState,
};

/// Unit subjects for one batch, joined into a root subject
pub struct AggregationTree<S> {
    subjects: HashMap<String, MutationStateSubject<S>>,
    keys: Vec<String>,
    root: MutationStatesSubject<S>,
    builder: Arc<StateBuilder<S>>,
    _join: CombineLatest,
}

impl<S> fmt::Debug for AggregationTree<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregationTree")
            .field("keys", &self.keys)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl<S: UnitState> AggregationTree<S> {
    /// Allocate a subject per call and join them into `root`
    ///
    /// `calls` must already be filtered to calls with a registered resolver;
    /// a call without one would never publish and the join would stall.
    pub fn build(
        calls: &[UnitCall],
        root: MutationStatesSubject<S>,
        builder: Arc<StateBuilder<S>>,
    ) -> Self {
        let keys: Vec<String> = calls.iter().map(|call| call.result_key.clone()).collect();
        let sources: Vec<MutationStateSubject<S>> = keys.iter().map(|_| Subject::empty()).collect();

        let join_keys = keys.clone();
        let join_root = root.clone();
        let join = combine_latest(&sources, move |states| {
            let snapshot: MutationStates<S> = join_keys.iter().cloned().zip(states).collect();
            join_root.next(snapshot);
        });

        debug!(units = keys.len(), keys = ?keys, "Allocated unit state subjects");

        Self {
            subjects: keys.iter().cloned().zip(sources).collect(),
            keys,
            root,
            builder,
            _join: join,
        }
    }

    /// Publish an initial state for `result_key` if its unit never did
    ///
    /// Returns `true` when a state was published.
    pub fn settle(&self, result_key: &str) -> bool {
        let Some(subject) = self.subjects.get(result_key) else {
            return false;
        };
        if subject.value().is_some() {
            return false;
        }

        let uuid = Uuid::new_v4().to_string();
        debug!(result_key = %result_key, uuid = %uuid, "Settling unit that never started");
        subject.next(MutationState::initial(uuid, &self.builder));
        true
    }

    /// Subject for the unit with `result_key`
    pub fn subject(&self, result_key: &str) -> Option<MutationStateSubject<S>> {
        self.subjects.get(result_key).cloned()
    }

    /// Result keys in declaration order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn root(&self) -> &MutationStatesSubject<S> {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
