// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subject Combinators
//!
//! ## combine_latest
//!
//! Joins N subjects into one emission of all N latest values. Nothing is
//! emitted until every source has produced a value; after that, every
//! source emission produces exactly one joined emission.
//!
//! ```text
//! a:     ──a1──────────a2────────
//! b:     ───────b1──────────b2───
//! join:  ───────[a1,b1]─[a2,b1]─[a2,b2]
//! ```
//!
//! # Examples
//!
//! ```rust
//! use cim_mutations::frp::{combine_latest, Subject};
//! use std::sync::{Arc, Mutex};
//!
//! let a = Subject::empty();
//! let b = Subject::empty();
//! let joined = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = joined.clone();
//! let _join = combine_latest(&[a.clone(), b.clone()], move |values: Vec<i32>| {
//!     sink.lock().unwrap().push(values)
//! });
//!
//! a.next(1);
//! b.next(2);
//! a.next(3);
//! assert_eq!(*joined.lock().unwrap(), vec![vec![1, 2], vec![3, 2]]);
//! ```

use std::sync::{Arc, Mutex};

use super::lock;
use super::subject::{Subject, Subscription};

/// Latest value per source, emitting once every slot is filled
#[derive(Debug, Clone)]
pub struct JoinSlots<T> {
    slots: Vec<Option<T>>,
    filled: usize,
}

impl<T: Clone> JoinSlots<T> {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            filled: 0,
        }
    }

    /// Store `value` at `index`, returning every slot once all are filled
    pub fn write(&mut self, index: usize, value: T) -> Option<Vec<T>> {
        let slot = self.slots.get_mut(index)?;
        if slot.is_none() {
            self.filled += 1;
        }
        *slot = Some(value);

        self.is_complete()
            .then(|| self.slots.iter().flatten().cloned().collect())
    }

    pub fn is_complete(&self) -> bool {
        !self.slots.is_empty() && self.filled == self.slots.len()
    }
}

/// A live join over several subjects
///
/// Dropping the join unsubscribes from every source.
#[must_use = "dropping a CombineLatest stops the join"]
#[derive(Debug)]
pub struct CombineLatest {
    _subscriptions: Vec<Subscription>,
}

/// Join `sources`, calling `on_emit` with the latest value of each
///
/// `on_emit` runs while the join is locked, so joined emissions are never
/// reordered relative to the source emissions that caused them. With no
/// sources, nothing is ever emitted.
pub fn combine_latest<T, F>(sources: &[Subject<T>], on_emit: F) -> CombineLatest
where
    T: Clone + Send + Sync + 'static,
    F: Fn(Vec<T>) + Send + Sync + 'static,
{
    let slots = Arc::new(Mutex::new(JoinSlots::new(sources.len())));
    let on_emit = Arc::new(on_emit);

    let subscriptions = sources
        .iter()
        .enumerate()
        .map(|(index, source)| {
            let slots = slots.clone();
            let on_emit = on_emit.clone();
            source.subscribe(move |value: &T| {
                let mut slots = lock(&slots);
                if let Some(values) = slots.write(index, value.clone()) {
                    on_emit(values);
                }
            })
        })
        .collect();

    CombineLatest {
        _subscriptions: subscriptions,
    }
}
