// Copyright (c) 2025 - Cowboy AI, Inc.
//! Functional Reactive Programming (FRP) Primitives
//!
//! Mutation state is a time-varying value: it exists from the moment a unit
//! starts and changes every time an event is dispatched. This module models
//! it with push-based subjects.
//!
//! # Core Concepts
//!
//! ## Subject<T>
//!
//! A current value plus subscribers. Sampling (`value`) gives the latest
//! value; subscribing gives the latest value and every value after it.
//!
//! ```text
//! Time:  ────────────────────────────→
//! Value:   ≈≈≈a≈≈≈≈≈≈≈b≈≈≈≈≈≈≈≈c≈≈≈≈≈
//! Push:       ●       ●        ●
//! ```
//!
//! ## combine_latest
//!
//! Joins many subjects into a single emission of all their latest values,
//! once each has produced one.
//!
//! # Usage with Mutation State
//!
//! - **Unit state** is a `Subject<MutationState<S>>`, pushed by the unit's
//!   state updater after every dispatch
//! - **Batch state** is the `combine_latest` join of all unit subjects,
//!   republished on the caller's root subject

pub mod combinators;
pub mod subject;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use combinators::{combine_latest, CombineLatest, JoinSlots};
pub use subject::{Subject, SubjectStream, Subscription};

/// Lock a mutex, recovering the data if a subscriber panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
