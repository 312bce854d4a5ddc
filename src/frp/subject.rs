// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subject - A Current Value With Subscribers
//!
//! A `Subject<T>` holds the most recent value of a time-varying signal and
//! pushes every new value to its subscribers. New subscribers receive the
//! current value immediately, so a late subscriber never misses the state
//! it joined into.
//!
//! ```text
//! Time:     ───────────────────────────────→
//! next:         a       b           c
//! sub #1:   ────●───────●───────────●──────
//! sub #2:               (b)─────────●──────   joins after b, sees b first
//! ```
//!
//! # Ordering
//!
//! Emissions are serialized: each subscriber observes values in the order
//! `next` was called, and never two emissions concurrently. Callbacks run
//! synchronously on the emitting thread and must not subscribe to the same
//! subject they are called from.
//!
//! # Examples
//!
//! ```rust
//! use cim_mutations::frp::Subject;
//! use std::sync::{Arc, Mutex};
//!
//! let subject = Subject::new(1);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = seen.clone();
//! let subscription = subject.subscribe(move |v: &i32| sink.lock().unwrap().push(*v));
//! subject.next(2);
//! subscription.unsubscribe();
//! subject.next(3);
//!
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
//! assert_eq!(subject.value(), Some(3));
//! ```

use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};

use futures::channel::mpsc;
use futures::{Stream, StreamExt};

use super::lock;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slot<T> {
    value: Option<T>,
    subscribers: Vec<(u64, Callback<T>)>,
    next_id: u64,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    /// Held for the duration of an emission or a replaying subscribe
    emit: Mutex<()>,
}

/// Current value plus subscribers
///
/// Cloning a subject yields another handle to the same value and
/// subscriber list.
pub struct Subject<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = lock(&self.shared.slot);
        f.debug_struct("Subject")
            .field("type", &std::any::type_name::<T>())
            .field("has_value", &slot.value.is_some())
            .field("subscribers", &slot.subscribers.len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Subject<T> {
    /// Create a subject seeded with `initial`
    pub fn new(initial: T) -> Self {
        Self::with_value(Some(initial))
    }

    /// Create a subject with no value yet
    ///
    /// Subscribers are not called until the first `next`.
    pub fn empty() -> Self {
        Self::with_value(None)
    }

    fn with_value(value: Option<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    value,
                    subscribers: Vec::new(),
                    next_id: 0,
                }),
                emit: Mutex::new(()),
            }),
        }
    }

    /// Snapshot of the current value
    pub fn value(&self) -> Option<T> {
        lock(&self.shared.slot).value.clone()
    }

    /// Publish a new value to every subscriber
    pub fn next(&self, value: T) {
        let _emitting = lock(&self.shared.emit);
        let subscribers: Vec<Callback<T>> = {
            let mut slot = lock(&self.shared.slot);
            slot.value = Some(value.clone());
            slot.subscribers.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in subscribers {
            callback(&value);
        }
    }

    /// Register a callback, replaying the current value if there is one
    ///
    /// The callback stays registered until the returned [`Subscription`]
    /// is dropped or unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _emitting = lock(&self.shared.emit);
        let callback: Callback<T> = Arc::new(callback);
        let (id, current) = {
            let mut slot = lock(&self.shared.slot);
            let id = slot.next_id;
            slot.next_id += 1;
            slot.subscribers.push((id, callback.clone()));
            (id, slot.value.clone())
        };
        if let Some(value) = current {
            callback(&value);
        }

        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = shared.upgrade() {
                lock(&shared.slot)
                    .subscribers
                    .retain(|(subscriber, _)| *subscriber != id);
            }
        })
    }

    /// Values as an async stream, starting with the current value
    ///
    /// The stream is unbounded; dropping it unsubscribes.
    pub fn stream(&self) -> SubjectStream<T> {
        let (sender, receiver) = mpsc::unbounded();
        let subscription = self.subscribe(move |value: &T| {
            // A closed receiver means the stream was dropped mid-emission.
            let _ = sender.unbounded_send(value.clone());
        });
        SubjectStream {
            receiver,
            _subscription: subscription,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.slot).subscribers.len()
    }
}

/// Handle to a registered callback; unsubscribes on drop
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the callback now
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Stream of a subject's values
pub struct SubjectStream<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    _subscription: Subscription,
}

impl<T> Stream for SubjectStream<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.receiver.poll_next_unpin(cx)
    }
}
