#![forbid(unsafe_code)]

//! Test helpers: a sink that records what it receives.

use std::cell::{Cell, RefCell};

use crate::error::PropertyError;
use crate::sink::Sink;

/// One event observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<T> {
    Next(T),
    /// Rendered error message.
    Error(String),
    Complete,
}

/// Sink that stores every event in arrival order.
///
/// Unlike [`CallbackSink`](crate::CallbackSink) it does not terminate on
/// error or completion, so tests can see anything delivered afterwards.
#[derive(Debug)]
pub struct RecordingSink<T> {
    events: RefCell<Vec<Event<T>>>,
    terminated: Cell<bool>,
}

impl<T> Default for RecordingSink<T> {
    fn default() -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            terminated: Cell::new(false),
        }
    }
}

impl<T: Clone> RecordingSink<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    #[must_use]
    pub fn events(&self) -> Vec<Event<T>> {
        self.events.borrow().clone()
    }

    /// Only the values of next events.
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Next(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Rendered messages of error events.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of completion events.
    #[must_use]
    pub fn completions(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Complete))
            .count()
    }

    /// Forget recorded events.
    pub fn reset(&self) {
        self.events.borrow_mut().clear();
    }

    /// Report as terminated from now on.
    pub fn terminate(&self) {
        self.terminated.set(true);
    }
}

impl<T: Clone> Sink<T> for RecordingSink<T> {
    fn on_next(&self, value: &T) {
        self.events.borrow_mut().push(Event::Next(value.clone()));
    }

    fn on_error(&self, error: &PropertyError) {
        self.events.borrow_mut().push(Event::Error(error.to_string()));
    }

    fn on_complete(&self) {
        self.events.borrow_mut().push(Event::Complete);
    }

    fn is_terminated(&self) -> bool {
        self.terminated.get()
    }
}
