#![forbid(unsafe_code)]

//! Push sources derived from a [`Property`].
//!
//! - [`PropertySource`]: hot, cached source. New subscribers get the current
//!   value immediately, then every later write.
//! - [`ItemStream`]: single-pass stream over the elements of a stored
//!   sequence.
//! - [`MappedSink`]: a sink that converts foreign values and writes them into
//!   a property.

use std::fmt;
use std::rc::Rc;

use crate::error::{HookError, Operation, PropertyError};
use crate::property::{Property, PropertyInner};
use crate::sink::{CallbackSink, Sink};
use crate::subscriber_set::SubscriberId;

/// Hot push source over a property.
pub struct PropertySource<T> {
    inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for PropertySource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for PropertySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySource")
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + fmt::Debug + 'static> PropertySource<T> {
    pub(crate) fn new(inner: Rc<PropertyInner<T>>) -> Self {
        Self { inner }
    }

    /// Register `sink` and replay the current value to it.
    ///
    /// Subscribing a sink that is already registered and live does nothing
    /// and returns `None`. Only a weak handle is kept.
    pub fn subscribe<S: Sink<T> + 'static>(&self, sink: &Rc<S>) -> Option<SubscriberId> {
        if self.inner.subscribers.contains_live(sink) {
            return None;
        }
        let id = self.inner.subscribers.register(sink);
        if !self.inner.is_empty() {
            self.inner
                .deliver_current(|value| sink.on_next(value), |error| sink.on_error(error));
        }
        Some(id)
    }

    /// Attach `target` so it receives every value through its
    /// [`accept`](Property::accept) path.
    ///
    /// The subscription lives as long as `target` and ends at the first error
    /// or completion from this source; subscribing again starts a new one.
    /// Returns `None` if `target` is already actively attached here.
    pub fn subscribe_property(&self, target: &Property<T>) -> Option<SubscriberId> {
        let source_key = Rc::as_ptr(&self.inner).cast::<()>();
        let link = PropertyInner::link_upstream(&target.inner, source_key)?;
        self.subscribe(&link)
    }

    /// Subscribe a closure. The returned sink must be kept alive; dispose it
    /// to stop receiving values.
    pub fn subscribe_fn(&self, on_next: impl Fn(&T) + 'static) -> Rc<CallbackSink<T>> {
        let sink = Rc::new(CallbackSink::new(on_next));
        self.subscribe(&sink);
        sink
    }

    /// Handle to the property behind this source.
    #[must_use]
    pub fn property(&self) -> Property<T> {
        Property {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Lazy, finite, single-pass stream over the elements of a stored sequence.
#[derive(Debug)]
pub struct ItemStream<I> {
    items: I,
}

impl<I> ItemStream<I> {
    pub(crate) fn new(items: I) -> Self {
        Self { items }
    }
}

impl<I: Iterator> Iterator for ItemStream<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl<I: Iterator> ItemStream<I> {
    /// Push every remaining element to `sink`, then complete it. Stops early
    /// if the sink terminates.
    pub fn drain_into<S: Sink<I::Item> + ?Sized>(self, sink: &S) {
        for item in self.items {
            if sink.is_terminated() {
                return;
            }
            sink.on_next(&item);
        }
        sink.on_complete();
    }

    /// Feed every remaining element into `target` through
    /// [`accept`](Property::accept).
    ///
    /// # Errors
    ///
    /// Stops at the first element `target` fails to accept.
    pub fn drain_into_property(self, target: &Property<I::Item>) -> Result<(), PropertyError>
    where
        I::Item: Clone + fmt::Debug + 'static,
    {
        for item in self.items {
            target.accept(item)?;
        }
        Ok(())
    }
}

type MapperFn<V, T> = Box<dyn Fn(&V) -> Result<T, HookError>>;

/// Sink converting values of type `V` before writing them into a property.
pub struct MappedSink<V, T> {
    target: Property<T>,
    mapper: MapperFn<V, T>,
}

impl<V, T: fmt::Debug> fmt::Debug for MappedSink<V, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedSink")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

impl<V, T: Clone + fmt::Debug + 'static> MappedSink<V, T> {
    pub(crate) fn new(
        target: Property<T>,
        mapper: impl Fn(&V) -> Result<T, HookError> + 'static,
    ) -> Self {
        Self {
            target,
            mapper: Box::new(mapper),
        }
    }

    /// Convert `value` and write it into the target property.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Runtime`] with [`Operation::Accept`] if the mapper
    /// fails, or any error of [`Property::set`].
    pub fn accept(&self, value: &V) -> Result<(), PropertyError> {
        let mapped =
            (self.mapper)(value).map_err(|cause| PropertyError::runtime(Operation::Accept, cause))?;
        self.target.set(mapped).map(|_| ())
    }

    /// The property this sink writes to.
    #[must_use]
    pub fn target(&self) -> &Property<T> {
        &self.target
    }
}

impl<V, T: Clone + fmt::Debug + 'static> Sink<V> for MappedSink<V, T> {
    fn on_next(&self, value: &V) {
        if let Err(error) = self.accept(value) {
            tracing::warn!(
                property = self.target.name().unwrap_or("<unnamed>"),
                %error,
                "failed to accept mapped value"
            );
        }
    }

    fn on_error(&self, error: &PropertyError) {
        tracing::debug!(%error, "upstream error ignored by mapped sink");
    }

    fn on_complete(&self) {}
}
