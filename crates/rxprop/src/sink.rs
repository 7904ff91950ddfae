#![forbid(unsafe_code)]

//! Receivers for property events.
//!
//! A [`Sink`] is the three-method receiver a subscriber exposes, plus a
//! liveness query. Sinks are registered by `Rc` and held weakly, so the
//! subscriber decides how long it lives.
//!
//! [`CallbackSink`] follows the usual stream contract: after `dispose()`, an
//! error, or a completion it reports itself as terminated and receives
//! nothing further.

use std::cell::Cell;
use std::fmt;

use crate::error::PropertyError;

/// The receiving side of a push source.
pub trait Sink<T> {
    /// A new value was written.
    fn on_next(&self, value: &T);

    /// The source signalled a failure.
    fn on_error(&self, error: &PropertyError);

    /// The source was torn down.
    fn on_complete(&self);

    /// Whether this sink has disposed itself. Terminated sinks are skipped and
    /// pruned.
    fn is_terminated(&self) -> bool {
        false
    }
}

type NextFn<T> = Box<dyn Fn(&T)>;
type ErrorFn = Box<dyn Fn(&PropertyError)>;
type CompleteFn = Box<dyn Fn()>;

/// A sink backed by closures.
///
/// ```
/// use std::rc::Rc;
/// use rxprop::{CallbackSink, Property};
///
/// let property = Property::new(1);
/// let sink = Rc::new(CallbackSink::new(|v: &i32| println!("got {v}")));
/// property.as_observable().subscribe(&sink);
/// sink.dispose();
/// ```
pub struct CallbackSink<T> {
    next: NextFn<T>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
    terminated: Cell<bool>,
}

impl<T> CallbackSink<T> {
    /// Create a sink that only handles next events.
    pub fn new(on_next: impl Fn(&T) + 'static) -> Self {
        Self {
            next: Box::new(on_next),
            error: None,
            complete: None,
            terminated: Cell::new(false),
        }
    }

    /// Handle error events.
    #[must_use]
    pub fn with_error(mut self, on_error: impl Fn(&PropertyError) + 'static) -> Self {
        self.error = Some(Box::new(on_error));
        self
    }

    /// Handle completion.
    #[must_use]
    pub fn with_complete(mut self, on_complete: impl Fn() + 'static) -> Self {
        self.complete = Some(Box::new(on_complete));
        self
    }

    /// Stop receiving events. The owning set prunes this sink on its next
    /// registration or broadcast.
    pub fn dispose(&self) {
        self.terminated.set(true);
    }

    /// Whether [`dispose`](Self::dispose) was called or a terminal event was
    /// received.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.terminated.get()
    }
}

impl<T> fmt::Debug for CallbackSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackSink")
            .field("terminated", &self.terminated.get())
            .finish_non_exhaustive()
    }
}

impl<T> Sink<T> for CallbackSink<T> {
    fn on_next(&self, value: &T) {
        if !self.terminated.get() {
            (self.next)(value);
        }
    }

    fn on_error(&self, error: &PropertyError) {
        if self.terminated.replace(true) {
            return;
        }
        match &self.error {
            Some(handler) => handler(error),
            None => tracing::debug!(%error, "unhandled error event dropped by callback sink"),
        }
    }

    fn on_complete(&self) {
        if self.terminated.replace(true) {
            return;
        }
        if let Some(handler) = &self.complete {
            handler();
        }
    }

    fn is_terminated(&self) -> bool {
        self.terminated.get()
    }
}
