#![forbid(unsafe_code)]

//! Observable single-value container with a hook pipeline.
//!
//! # Design
//!
//! [`Property<T>`] is a shared handle (`Rc`) to a value slot, a set of
//! optional hooks, and a [`SubscriberSet`]. Cloning the handle shares all
//! three. Every successful write is multicast to the live subscribers; a
//! subscriber is often another property attached through
//! [`PropertySource::subscribe_property`].
//!
//! # Write pipeline
//!
//! 1. `filter` decides whether the write happens at all.
//! 2. `combine` resolves the stored value from the previous and the written
//!    one; the result is committed and the type tag refreshed.
//! 3. `on_written` observes the committed value.
//! 4. Subscribers receive the value through the read path, or an error event
//!    when the *argument* was empty.
//!
//! A hook failure aborts the write at that stage and is returned to the
//! writer. A failure in step 4 goes to the subscribers instead.
//!
//! # Failure Modes
//!
//! - **Self-subscription**: subscribing a property to its own source recurses
//!   on the first write and overflows the stack.
//! - **Reference cycles**: a hook that captures its own property keeps it
//!   alive until [`Property::clear`] drops the hooks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{HookError, Operation, PropertyError, UnsupportedReason};
use crate::hooks::{Hooks, PropertyBuilder};
use crate::sink::Sink;
use crate::source::{ItemStream, MappedSink, PropertySource};
use crate::subscriber_set::SubscriberSet;
use crate::type_tag::TypeTag;

pub(crate) struct PropertyState<T> {
    pub(crate) value: Option<T>,
    pub(crate) value_type: Option<TypeTag>,
    pub(crate) hooks: Hooks<T>,
}

pub(crate) struct PropertyInner<T> {
    name: Option<String>,
    pub(crate) state: RefCell<PropertyState<T>>,
    pub(crate) subscribers: SubscriberSet<T>,
    /// Subscriptions feeding this property from upstream sources.
    upstream: RefCell<Vec<Rc<PropertyLink<T>>>>,
}

/// One upstream subscription of a property.
///
/// Owned by the target and held only weakly by the source, so it lives as
/// long as the target does. It ends at the first error or completion from
/// the source.
pub(crate) struct PropertyLink<T> {
    source: *const (),
    target: Weak<PropertyInner<T>>,
    terminated: Cell<bool>,
}

impl<T> PropertyLink<T> {
    fn is_active(&self) -> bool {
        !self.terminated.get() && self.target.strong_count() > 0
    }
}

impl<T: Clone + fmt::Debug + 'static> Sink<T> for PropertyLink<T> {
    fn on_next(&self, value: &T) {
        if self.terminated.get() {
            return;
        }
        if let Some(target) = self.target.upgrade() {
            target.receive(value);
        }
    }

    fn on_error(&self, error: &PropertyError) {
        if self.terminated.replace(true) {
            return;
        }
        if let Some(target) = self.target.upgrade() {
            tracing::debug!(
                property = target.label(),
                %error,
                "upstream error ended subscription"
            );
        }
    }

    fn on_complete(&self) {
        if self.terminated.replace(true) {
            return;
        }
        if let Some(target) = self.target.upgrade() {
            tracing::trace!(property = target.label(), "upstream completed");
        }
    }

    fn is_terminated(&self) -> bool {
        !self.is_active()
    }
}

/// A named, observable single-value container.
///
/// ```
/// use rxprop::Property;
///
/// let source = Property::new(0);
/// let mirror = Property::empty();
/// source.as_observable().subscribe_property(&mirror);
/// assert_eq!(mirror.get().unwrap(), Some(0));
///
/// source.set(7).unwrap();
/// assert_eq!(mirror.get().unwrap(), Some(7));
/// ```
pub struct Property<T> {
    pub(crate) inner: Rc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Property")
            .field("name", &self.inner.name)
            .field("value", &state.value)
            .field("value_type", &state.value_type.map(|tag| tag.name()))
            .field("hooks", &state.hooks.installed())
            .field("subscriber_count", &self.inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + fmt::Debug + 'static> Default for Property<T> {
    fn default() -> Self {
        Self::empty()
    }
}

fn tag_for<T: 'static>(tagger: Option<&crate::hooks::TaggerFn<T>>, value: &T) -> TypeTag {
    match tagger {
        Some(tagger) => tagger(value),
        None => TypeTag::of::<T>(),
    }
}

impl<T: Clone + fmt::Debug + 'static> PropertyInner<T> {
    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    pub(crate) fn stored(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state.borrow().value.is_none()
    }

    pub(crate) fn take_value(&self) -> Option<T> {
        self.state.borrow_mut().value.take()
    }

    pub(crate) fn read(&self) -> Result<Option<T>, PropertyError> {
        let (on_read, value) = {
            let state = self.state.borrow();
            (state.hooks.on_read.clone(), state.value.clone())
        };
        match on_read {
            Some(on_read) => on_read(value.as_ref())
                .map_err(|cause| PropertyError::invocation(Operation::Read, value.as_ref(), cause)),
            None => Ok(value),
        }
    }

    pub(crate) fn write(&self, new_value: Option<T>) -> Result<Option<T>, PropertyError> {
        let (filter, combine, tagger) = {
            let state = self.state.borrow();
            (
                state.hooks.filter.clone(),
                state.hooks.combine.clone(),
                state.hooks.tagger.clone(),
            )
        };

        if let Some(filter) = filter {
            match filter(new_value.as_ref()) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::trace!(property = self.label(), "write rejected by filter");
                    return Ok(new_value);
                }
                Err(cause) => {
                    return Err(PropertyError::invocation(
                        Operation::Set,
                        new_value.as_ref(),
                        cause,
                    ));
                }
            }
        }

        let adopted = match combine {
            Some(combine) => {
                let previous = self.stored();
                combine(previous.as_ref(), new_value.as_ref()).map_err(|cause| {
                    PropertyError::invocation(Operation::Set, new_value.as_ref(), cause)
                })?
            }
            None => new_value.clone(),
        };
        let tag = adopted.as_ref().map(|v| tag_for(tagger.as_ref(), v));

        let on_written = {
            let mut state = self.state.borrow_mut();
            state.value = adopted;
            if tag.is_some() {
                state.value_type = tag;
            }
            state.hooks.on_written.clone()
        };

        if let Some(on_written) = on_written {
            let stored = self.stored();
            on_written(stored.as_ref()).map_err(|cause| {
                PropertyError::invocation(Operation::Written, stored.as_ref(), cause)
            })?;
        }

        self.notify(new_value.is_some());
        Ok(new_value)
    }

    /// Broadcast after a committed write. Keyed off the argument of `set`.
    fn notify(&self, argument_present: bool) {
        if self.subscribers.is_empty() {
            return;
        }
        if argument_present {
            self.deliver_current(
                |value| self.subscribers.broadcast_next(value),
                |error| self.subscribers.broadcast_error(error),
            );
        } else {
            self.subscribers
                .broadcast_error(&PropertyError::ValueSetToEmpty);
        }
    }

    /// Read through the pipeline and route the outcome to `next` or `error`.
    pub(crate) fn deliver_current(
        &self,
        next: impl FnOnce(&T),
        error: impl FnOnce(&PropertyError),
    ) {
        match self.read() {
            Ok(Some(value)) => next(&value),
            Ok(None) => error(&PropertyError::ValueSetToEmpty),
            Err(err) => error(&err),
        }
    }

    pub(crate) fn accept(&self, value: T) -> Result<(), PropertyError> {
        let on_incoming = self.state.borrow().hooks.on_incoming.clone();
        let value = match on_incoming {
            Some(on_incoming) => on_incoming(value.clone()).map_err(|cause| {
                PropertyError::invocation(Operation::Accept, Some(&value), cause)
            })?,
            None => value,
        };
        self.write(Some(value)).map(|_| ())
    }

    /// Accept a value pushed by an upstream link. Failures stay here.
    fn receive(&self, value: &T) {
        if let Err(error) = self.accept(value.clone()) {
            tracing::warn!(property = self.label(), %error, "failed to accept incoming value");
        }
    }

    /// Link this property to the source owning `source_key`, unless an active
    /// link to that source exists. Returns the new link.
    pub(crate) fn link_upstream(
        this: &Rc<Self>,
        source_key: *const (),
    ) -> Option<Rc<PropertyLink<T>>> {
        let mut upstream = this.upstream.borrow_mut();
        upstream.retain(|link| link.is_active());
        if upstream.iter().any(|link| link.source == source_key) {
            return None;
        }
        let link = Rc::new(PropertyLink {
            source: source_key,
            target: Rc::downgrade(this),
            terminated: Cell::new(false),
        });
        upstream.push(Rc::clone(&link));
        Some(link)
    }

    pub(crate) fn clear(&self) -> Result<(), PropertyError> {
        let (on_teardown, value) = {
            let mut state = self.state.borrow_mut();
            (state.hooks.on_teardown.take(), state.value.clone())
        };
        if let Some(on_teardown) = on_teardown {
            on_teardown(value.as_ref())
                .map_err(|cause| PropertyError::runtime(Operation::Teardown, cause))?;
        }

        let released = {
            let mut state = self.state.borrow_mut();
            state.value = None;
            state.value_type = None;
            std::mem::take(&mut state.hooks)
        };
        drop(released);

        tracing::debug!(
            property = self.label(),
            subscribers = self.subscribers.len(),
            "property cleared"
        );
        self.subscribers.broadcast_complete();
        self.subscribers.clear();
        Ok(())
    }
}


impl<T: Clone + fmt::Debug + 'static> Property<T> {
    /// Create a property holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        PropertyBuilder::new().with_value(value).build()
    }

    /// Create a property with no value.
    #[must_use]
    pub fn empty() -> Self {
        PropertyBuilder::new().build()
    }

    /// Start a [`PropertyBuilder`].
    #[must_use]
    pub fn builder() -> PropertyBuilder<T> {
        PropertyBuilder::new()
    }

    pub(crate) fn from_builder(builder: PropertyBuilder<T>) -> Self {
        let PropertyBuilder { name, value, hooks } = builder;
        let value_type = value.as_ref().map(|v| tag_for(hooks.tagger.as_ref(), v));
        Self {
            inner: Rc::new(PropertyInner {
                name,
                state: RefCell::new(PropertyState {
                    value,
                    value_type,
                    hooks,
                }),
                subscribers: SubscriberSet::new(),
                upstream: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Diagnostic label, if one was configured.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Write a value through the pipeline.
    ///
    /// Returns the argument, not the stored value: a filter may have rejected
    /// the write, or `combine` may have stored something else. Use
    /// [`get`](Self::get) for the adopted value.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Invocation`] if `filter`, `combine` or `on_written`
    /// fails. An `on_written` failure is reported after the value has been
    /// committed, and suppresses the broadcast.
    pub fn set(&self, value: impl Into<Option<T>>) -> Result<Option<T>, PropertyError> {
        self.inner.write(value.into())
    }

    /// Read the value through `on_read`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Invocation`] if `on_read` fails.
    pub fn get(&self) -> Result<Option<T>, PropertyError> {
        self.inner.read()
    }

    /// Same as [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub fn call(&self) -> Result<Option<T>, PropertyError> {
        self.get()
    }

    /// Whether no value is stored. Ignores `on_read`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Feed a value received from a push source, applying `on_incoming`.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Invocation`] with [`Operation::Accept`] if
    /// `on_incoming` fails, or any error of [`set`](Self::set).
    pub fn accept(&self, value: T) -> Result<(), PropertyError> {
        self.inner.accept(value)
    }

    /// Tear the property down.
    ///
    /// Fires `on_teardown` once, empties the value, drops every hook and the
    /// type tag, completes every live subscriber, then forgets them all.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Runtime`] if `on_teardown` fails; the rest of the
    /// teardown is skipped but the hook will not fire again.
    pub fn clear(&self) -> Result<(), PropertyError> {
        self.inner.clear()
    }

    /// Only accept writes for which `filter` returns `true`.
    pub fn filter(
        &self,
        filter: impl Fn(Option<&T>) -> Result<bool, HookError> + 'static,
    ) -> &Self {
        self.inner.state.borrow_mut().hooks.filter = Some(Rc::new(filter));
        self
    }

    /// Resolve the stored value from `(previous, written)`.
    pub fn combine(
        &self,
        combine: impl Fn(Option<&T>, Option<&T>) -> Result<Option<T>, HookError> + 'static,
    ) -> &Self {
        self.inner.state.borrow_mut().hooks.combine = Some(Rc::new(combine));
        self
    }

    /// Transform every read. The hook also sees an empty value.
    pub fn on_read(
        &self,
        on_read: impl Fn(Option<&T>) -> Result<Option<T>, HookError> + 'static,
    ) -> &Self {
        self.inner.state.borrow_mut().hooks.on_read = Some(Rc::new(on_read));
        self
    }

    /// Observe every committed write.
    pub fn on_written(
        &self,
        on_written: impl Fn(Option<&T>) -> Result<(), HookError> + 'static,
    ) -> &Self {
        self.inner.state.borrow_mut().hooks.on_written = Some(Rc::new(on_written));
        self
    }

    /// Run once on [`clear`](Self::clear).
    pub fn on_teardown(
        &self,
        on_teardown: impl Fn(Option<&T>) -> Result<(), HookError> + 'static,
    ) -> &Self {
        self.inner.state.borrow_mut().hooks.on_teardown = Some(Rc::new(on_teardown));
        self
    }

    /// Transform values arriving through [`accept`](Self::accept).
    pub fn on_incoming(&self, on_incoming: impl Fn(T) -> Result<T, HookError> + 'static) -> &Self {
        self.inner.state.borrow_mut().hooks.on_incoming = Some(Rc::new(on_incoming));
        self
    }

    /// Derive the recorded [`TypeTag`] from each stored value.
    pub fn tag_with(&self, tagger: impl Fn(&T) -> TypeTag + 'static) -> &Self {
        self.inner.state.borrow_mut().hooks.tagger = Some(Rc::new(tagger));
        self
    }

    /// A hot push source that replays the current value to new subscribers.
    #[must_use]
    pub fn as_observable(&self) -> PropertySource<T> {
        PropertySource::new(Rc::clone(&self.inner))
    }

    /// Iterate the elements of the stored sequence.
    ///
    /// The stream walks a clone of the value taken now; later writes do not
    /// affect it.
    ///
    /// # Errors
    ///
    /// [`PropertyError::Unsupported`] if nothing is stored.
    pub fn as_observable_from_iterable(&self) -> Result<ItemStream<T::IntoIter>, PropertyError>
    where
        T: IntoIterator,
    {
        self.inner
            .stored()
            .map(|value| ItemStream::new(value.into_iter()))
            .ok_or(PropertyError::Unsupported(UnsupportedReason::Empty))
    }

    /// Apply `mapper` to the stored value.
    ///
    /// # Errors
    ///
    /// [`PropertyError::MissingValue`] if nothing is stored;
    /// [`PropertyError::Runtime`] if `mapper` fails.
    pub fn map<R>(
        &self,
        mapper: impl FnOnce(&T) -> Result<R, HookError>,
    ) -> Result<R, PropertyError> {
        let value = self.inner.stored().ok_or(PropertyError::MissingValue)?;
        mapper(&value).map_err(|cause| PropertyError::runtime(Operation::Map, cause))
    }

    /// Derive a new property from the stored value.
    ///
    /// # Errors
    ///
    /// As [`map`](Self::map), with [`Operation::FlatMap`].
    pub fn flat_map<R>(
        &self,
        mapper: impl FnOnce(&T) -> Result<Property<R>, HookError>,
    ) -> Result<Property<R>, PropertyError> {
        let value = self.inner.stored().ok_or(PropertyError::MissingValue)?;
        mapper(&value).map_err(|cause| PropertyError::runtime(Operation::FlatMap, cause))
    }

    /// The read-path value, if any.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get).
    pub fn as_maybe(&self) -> Result<Option<T>, PropertyError> {
        if self.is_empty() {
            return Ok(None);
        }
        self.get()
    }

    /// This property, if a value is stored. Does not run `on_read`.
    #[must_use]
    pub fn as_maybe_property(&self) -> Option<Property<T>> {
        (!self.is_empty()).then(|| self.clone())
    }

    /// Type of the last non-empty value stored, `None` if there never was one
    /// since construction or the last [`clear`](Self::clear).
    #[must_use]
    pub fn value_type(&self) -> Option<TypeTag> {
        self.inner.state.borrow().value_type
    }

    /// A sink that converts values of type `V` and writes them here.
    ///
    /// The returned `Rc` must be kept alive for as long as the subscription
    /// should last; sources only hold it weakly.
    pub fn as_consumer<V: 'static>(
        &self,
        mapper: impl Fn(&V) -> Result<T, HookError> + 'static,
    ) -> Rc<MappedSink<V, T>> {
        Rc::new(MappedSink::new(self.clone(), mapper))
    }

    /// Number of subscriber handles, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Whether both handles share the same state.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Property<bool> {
    /// Whether a value is stored and it is `true`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.inner.state.borrow().value == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CallbackSink;
    use std::cell::Cell;

    #[derive(Debug)]
    struct Rejected(&'static str);

    impl fmt::Display for Rejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "rejected: {}", self.0)
        }
    }

    impl std::error::Error for Rejected {}

    fn recording(log: &Rc<RefCell<Vec<String>>>) -> Rc<CallbackSink<i32>> {
        let next = Rc::clone(log);
        let error = Rc::clone(log);
        let complete = Rc::clone(log);
        Rc::new(
            CallbackSink::new(move |v: &i32| next.borrow_mut().push(format!("next:{v}")))
                .with_error(move |e| error.borrow_mut().push(format!("error:{e}")))
                .with_complete(move || complete.borrow_mut().push("complete".to_owned())),
        )
    }

    #[test]
    fn get_set_basic() {
        let p = Property::new(42);
        assert_eq!(p.get().unwrap(), Some(42));
        assert_eq!(p.set(99).unwrap(), Some(99));
        assert_eq!(p.get().unwrap(), Some(99));
    }

    #[test]
    fn empty_property() {
        let p: Property<String> = Property::empty();
        assert!(p.is_empty());
        assert_eq!(p.get().unwrap(), None);
        assert!(p.value_type().is_none());
    }

    #[test]
    fn clone_shares_state() {
        let a = Property::new(1);
        let b = a.clone();
        b.set(2).unwrap();
        assert_eq!(a.get().unwrap(), Some(2));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Property::new(2)));
    }

    #[test]
    fn filter_false_is_noop() {
        let p = Property::new(0);
        let written = Rc::new(Cell::new(0u32));
        let written_clone = Rc::clone(&written);
        p.filter(|v| Ok(v.is_some_and(|n| n % 2 == 0)))
            .on_written(move |_| {
                written_clone.set(written_clone.get() + 1);
                Ok(())
            });
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = recording(&log);
        p.as_observable().subscribe(&sink);
        log.borrow_mut().clear();

        assert_eq!(p.set(3).unwrap(), Some(3));
        assert_eq!(p.get().unwrap(), Some(0));
        assert_eq!(written.get(), 0);
        assert!(log.borrow().is_empty());

        p.set(4).unwrap();
        assert_eq!(p.get().unwrap(), Some(4));
        assert_eq!(written.get(), 1);
        assert_eq!(*log.borrow(), vec!["next:4"]);
    }

    #[test]
    fn filter_error_abandons_write() {
        let p = Property::new(1);
        p.filter(|_| Err(Box::new(Rejected("filter"))));

        let err = p.set(2).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::Set));
        assert!(matches!(
            &err,
            PropertyError::Invocation { value: Some(v), .. } if v == "2"
        ));
        assert_eq!(p.get().unwrap(), Some(1));
    }

    #[test]
    fn combine_resolves_stored_value() {
        let p = Property::new(10);
        p.combine(|old, new| Ok(Some(old.copied().unwrap_or(0) + new.copied().unwrap_or(0))));

        assert_eq!(p.set(5).unwrap(), Some(5));
        assert_eq!(p.get().unwrap(), Some(15));
    }

    #[test]
    fn combine_error_leaves_value() {
        let p = Property::new(10);
        p.combine(|_, _| Err(Box::new(Rejected("combine"))));
        assert!(p.set(5).is_err());
        assert_eq!(p.get().unwrap(), Some(10));
    }

    #[test]
    fn on_written_error_after_commit() {
        let p = Property::new(1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = recording(&log);
        p.as_observable().subscribe(&sink);
        log.borrow_mut().clear();
        p.on_written(|_| Err(Box::new(Rejected("written"))));

        let err = p.set(2).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::Written));
        assert_eq!(p.get().unwrap(), Some(2));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn empty_write_broadcasts_error() {
        let p = Property::new(1);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = recording(&log);
        p.as_observable().subscribe(&sink);

        assert_eq!(p.set(None).unwrap(), None);
        assert!(p.is_empty());
        assert_eq!(*log.borrow(), vec!["next:1", "error:value set to empty"]);
    }

    #[test]
    fn broadcast_keyed_off_argument_not_stored_value() {
        let p = Property::new(1);
        p.combine(|old, new| Ok(new.or(old).copied()));
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = recording(&log);
        p.as_observable().subscribe(&sink);

        p.set(None).unwrap();
        assert_eq!(p.get().unwrap(), Some(1));
        assert_eq!(log.borrow().last().map(String::as_str), Some("error:value set to empty"));
    }

    #[test]
    fn broadcast_uses_read_path() {
        let p = Property::new(1);
        p.on_read(|v| Ok(v.map(|n| n * 100)));
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = recording(&log);
        p.as_observable().subscribe(&sink);

        p.set(2).unwrap();
        assert_eq!(*log.borrow(), vec!["next:100", "next:200"]);
    }

    #[test]
    fn on_read_sees_empty_value() {
        let p: Property<i32> = Property::empty();
        p.on_read(|v| Ok(Some(v.copied().unwrap_or(-1))));
        assert_eq!(p.get().unwrap(), Some(-1));
        assert!(p.is_empty());
    }

    #[test]
    fn accept_applies_on_incoming() {
        let p = Property::new(0);
        p.on_incoming(|v| Ok(v * 2));
        p.accept(21).unwrap();
        assert_eq!(p.get().unwrap(), Some(42));
    }

    #[test]
    fn accept_error_names_operation() {
        let p = Property::new(0);
        p.on_incoming(|_| Err(Box::new(Rejected("incoming"))));
        let err = p.accept(3).unwrap_err();
        assert_eq!(err.operation(), Some(Operation::Accept));
        assert_eq!(err.to_string(), "failed to execute accept(3): rejected: incoming");
    }

    #[test]
    fn hook_may_write_back_reentrantly() {
        let total = Property::new(0);
        let total_clone = total.clone();
        total.on_incoming(move |v| {
            let current = total_clone.get()?.unwrap_or(0);
            total_clone.set(current + v)?;
            Ok(v)
        });
        let source = Property::new(0);
        source.as_observable().subscribe_property(&total);

        source.set(20).unwrap();
        assert_eq!(total.get().unwrap(), Some(20));
        total.clear().unwrap();
    }

    #[test]
    fn clear_fires_teardown_once_then_completes() {
        let p = Property::new("A".to_owned());
        let fired = Rc::new(Cell::new(0u32));
        let fired_clone = Rc::clone(&fired);
        p.on_teardown(move |v| {
            assert_eq!(v.map(String::as_str), Some("A"));
            fired_clone.set(fired_clone.get() + 1);
            Ok(())
        });
        let done = Rc::new(Cell::new(false));
        let done_clone = Rc::clone(&done);
        let fired_at_complete = Rc::new(Cell::new(0u32));
        let fired_probe = Rc::clone(&fired);
        let fired_at_complete_clone = Rc::clone(&fired_at_complete);
        let sink = Rc::new(CallbackSink::new(|_: &String| {}).with_complete(move || {
            fired_at_complete_clone.set(fired_probe.get());
            done_clone.set(true);
        }));
        p.as_observable().subscribe(&sink);

        p.clear().unwrap();
        assert_eq!(fired.get(), 1);
        assert_eq!(fired_at_complete.get(), 1);
        assert!(done.get());
        assert!(p.is_empty());
        assert_eq!(p.subscriber_count(), 0);

        p.set("B".to_owned()).unwrap();
        p.clear().unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn clear_resets_hooks_and_type() {
        let p = Property::new(1);
        p.filter(|_| Ok(false)).on_read(|_| Ok(Some(0)));
        assert!(p.value_type().is_some());

        p.clear().unwrap();
        assert!(p.value_type().is_none());
        p.set(5).unwrap();
        assert_eq!(p.get().unwrap(), Some(5));
    }

    #[test]
    fn teardown_error_is_runtime_failure() {
        let p = Property::new(1);
        p.on_teardown(|_| Err(Box::new(Rejected("teardown"))));
        let err = p.clear().unwrap_err();
        assert!(matches!(
            err,
            PropertyError::Runtime {
                operation: Operation::Teardown,
                ..
            }
        ));
        // The hook is spent; a second clear completes.
        p.clear().unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn value_type_is_sticky_across_empty_writes() {
        let p: Property<u32> = Property::empty();
        assert!(p.value_type().is_none());
        p.set(3).unwrap();
        assert!(p.value_type().is_some_and(|tag| tag.is::<u32>()));
        p.set(None).unwrap();
        assert!(p.value_type().is_some_and(|tag| tag.is::<u32>()));
    }

    #[test]
    fn tagger_labels_values() {
        #[derive(Debug, Clone)]
        enum Shape {
            Circle,
            Square,
        }

        let p = Property::new(Shape::Circle);
        p.tag_with(|shape| match shape {
            Shape::Circle => TypeTag::named::<Shape>("Circle"),
            Shape::Square => TypeTag::named::<Shape>("Square"),
        });
        p.set(Shape::Square).unwrap();
        assert_eq!(p.value_type().map(|tag| tag.name()), Some("Square"));
    }

    #[test]
    fn map_and_flat_map() {
        let p = Property::new(10);
        assert_eq!(p.map(|v| Ok(v.to_string())).unwrap(), "10");

        let q = p.flat_map(|v| Ok(Property::new(v.to_string()))).unwrap();
        assert_eq!(q.get().unwrap().as_deref(), Some("10"));

        let empty: Property<i32> = Property::empty();
        assert!(matches!(
            empty.map(|v| Ok(*v)),
            Err(PropertyError::MissingValue)
        ));
        assert!(matches!(
            empty.flat_map(|v| Ok(Property::new(*v))),
            Err(PropertyError::MissingValue)
        ));
    }

    #[test]
    fn map_error_is_runtime_failure() {
        let p = Property::new(1);
        let err = p.map(|_| -> Result<(), HookError> { Err(Box::new(Rejected("map"))) });
        assert!(matches!(
            err,
            Err(PropertyError::Runtime {
                operation: Operation::Map,
                ..
            })
        ));
    }

    #[test]
    fn maybe_accessors() {
        let p = Property::new(5);
        p.on_read(|v| Ok(v.map(|n| n + 1)));
        assert_eq!(p.as_maybe().unwrap(), Some(6));
        assert!(p.as_maybe_property().is_some_and(|same| same.ptr_eq(&p)));

        let empty: Property<i32> = Property::empty();
        assert_eq!(empty.as_maybe().unwrap(), None);
        assert!(empty.as_maybe_property().is_none());
    }

    #[test]
    fn bool_is_true() {
        let flag = Property::new(false);
        assert!(!flag.is_true());
        flag.set(true).unwrap();
        assert!(flag.is_true());
        flag.set(None).unwrap();
        assert!(!flag.is_true());
    }

    #[test]
    fn debug_format() {
        let p = Property::builder().with_name("count").with_value(3).build();
        p.filter(|_| Ok(true));
        let dbg = format!("{p:?}");
        assert!(dbg.contains("count"));
        assert!(dbg.contains("filter"));
        assert!(dbg.contains('3'));
    }
}
