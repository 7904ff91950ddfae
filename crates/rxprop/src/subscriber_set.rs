#![forbid(unsafe_code)]

//! Weakly held, ordered registry of subscriber sinks.
//!
//! # Design
//!
//! Each registration stores a `Weak<dyn Sink<T>>` under a fresh
//! [`SubscriberId`], together with the address of the sink allocation for
//! identity tests. The set never keeps a subscriber alive.
//!
//! Broadcasting is snapshot-then-deliver: live sinks are upgraded to strong
//! references while the registry is borrowed, the borrow is released, and
//! only then are the sinks called. A sink may therefore subscribe to (or
//! write to) the same property from inside a callback.
//!
//! # Invariants
//!
//! 1. Sinks are delivered to in registration order.
//! 2. A handle whose sink was dropped or reports `is_terminated()` never
//!    receives an event and is removed on the next `register` or broadcast.
//! 3. Pruning never runs while a broadcast is delivering.
//! 4. `register` and `contains_live` never fail.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::PropertyError;
use crate::sink::Sink;

/// Stable identifier of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Raw numeric id, increasing in registration order.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

struct Entry<T> {
    id: SubscriberId,
    /// Address of the sink allocation, compared for identity.
    key: *const (),
    sink: Weak<dyn Sink<T>>,
}

impl<T> Entry<T> {
    fn live(&self) -> Option<Rc<dyn Sink<T>>> {
        self.sink.upgrade().filter(|sink| !sink.is_terminated())
    }
}

/// Ordered collection of weakly held sinks.
pub struct SubscriberSet<T> {
    entries: RefCell<Vec<Entry<T>>>,
    next_id: Cell<u64>,
}

impl<T> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<T> fmt::Debug for SubscriberSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberSet")
            .field("len", &self.len())
            .field("next_id", &self.next_id.get())
            .finish()
    }
}

fn key_of<S: ?Sized>(sink: &Rc<S>) -> *const () {
    Rc::as_ptr(sink).cast::<()>()
}

impl<T> SubscriberSet<T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every handle.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of handles, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether no handles are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<T: 'static> SubscriberSet<T> {
    /// Prune dead handles, then append a weak handle to `sink`.
    pub fn register<S: Sink<T> + 'static>(&self, sink: &Rc<S>) -> SubscriberId {
        self.prune();
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let weak: Weak<dyn Sink<T>> = Rc::downgrade(sink) as Weak<dyn Sink<T>>;
        self.entries.borrow_mut().push(Entry {
            id,
            key: key_of(sink),
            sink: weak,
        });
        tracing::trace!(subscriber = id.0, "registered sink");
        id
    }

    /// Whether a live handle refers to the same allocation as `sink`.
    #[must_use]
    pub fn contains_live<S: ?Sized>(&self, sink: &Rc<S>) -> bool {
        let key = key_of(sink);
        self.entries
            .borrow()
            .iter()
            .any(|entry| entry.key == key && entry.live().is_some())
    }

    /// Deliver `value` to every live sink in registration order.
    pub fn broadcast_next(&self, value: &T) {
        let sinks = self.snapshot();
        tracing::trace!(subscribers = sinks.len(), "broadcast next");
        for sink in &sinks {
            if !sink.is_terminated() {
                sink.on_next(value);
            }
        }
    }

    /// Deliver `error` to every live sink in registration order.
    pub fn broadcast_error(&self, error: &PropertyError) {
        let sinks = self.snapshot();
        tracing::debug!(subscribers = sinks.len(), %error, "broadcast error");
        for sink in &sinks {
            if !sink.is_terminated() {
                sink.on_error(error);
            }
        }
    }

    /// Deliver completion to every live sink in registration order. Callers
    /// drain the set with [`clear`](Self::clear) afterwards.
    pub fn broadcast_complete(&self) {
        let sinks = self.snapshot();
        tracing::trace!(subscribers = sinks.len(), "broadcast complete");
        for sink in &sinks {
            if !sink.is_terminated() {
                sink.on_complete();
            }
        }
    }

    /// Number of handles whose sink is alive and not terminated.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.live().is_some())
            .count()
    }

    /// Ids of the live handles, in registration order.
    #[must_use]
    pub fn live_ids(&self) -> Vec<SubscriberId> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.live().is_some())
            .map(|entry| entry.id)
            .collect()
    }

    /// Remove dropped and terminated handles. Returns how many were removed.
    ///
    /// Runs in two phases: dead ids are collected under a shared borrow, then
    /// removed under a short exclusive one. If the registry is already
    /// borrowed the prune is skipped and left to the next opportunity.
    pub fn prune(&self) -> usize {
        let dead: Vec<SubscriberId> = match self.entries.try_borrow() {
            Ok(entries) => entries
                .iter()
                .filter(|entry| entry.live().is_none())
                .map(|entry| entry.id)
                .collect(),
            Err(_) => {
                tracing::debug!("subscriber registry busy, prune deferred");
                return 0;
            }
        };
        if dead.is_empty() {
            return 0;
        }
        match self.entries.try_borrow_mut() {
            Ok(mut entries) => {
                entries.retain(|entry| !dead.contains(&entry.id));
                tracing::trace!(pruned = dead.len(), "pruned dead sinks");
                dead.len()
            }
            Err(_) => {
                tracing::debug!("subscriber registry busy, prune deferred");
                0
            }
        }
    }

    /// Prune, then upgrade every live handle.
    fn snapshot(&self) -> Vec<Rc<dyn Sink<T>>> {
        self.prune();
        self.entries.borrow().iter().filter_map(Entry::live).collect()
    }
}
