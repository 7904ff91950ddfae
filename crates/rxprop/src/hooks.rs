#![forbid(unsafe_code)]

//! Hook pipeline and builder configuration for [`Property`].
//!
//! Hooks are stored as `Rc<dyn Fn ..>` so the property can clone one out and
//! call it with no internal borrow held. A hook may then read or write the
//! property it is attached to.
//!
//! [`Property`]: crate::Property

use std::fmt;
use std::rc::Rc;

use crate::consumable::Consumable;
use crate::error::HookError;
use crate::property::Property;
use crate::type_tag::TypeTag;

pub(crate) type FilterFn<T> = Rc<dyn Fn(Option<&T>) -> Result<bool, HookError>>;
pub(crate) type CombineFn<T> = Rc<dyn Fn(Option<&T>, Option<&T>) -> Result<Option<T>, HookError>>;
pub(crate) type ReadFn<T> = Rc<dyn Fn(Option<&T>) -> Result<Option<T>, HookError>>;
pub(crate) type InspectFn<T> = Rc<dyn Fn(Option<&T>) -> Result<(), HookError>>;
pub(crate) type IncomingFn<T> = Rc<dyn Fn(T) -> Result<T, HookError>>;
pub(crate) type TaggerFn<T> = Rc<dyn Fn(&T) -> TypeTag>;

/// The set of optional hooks a property runs.
pub(crate) struct Hooks<T> {
    pub(crate) filter: Option<FilterFn<T>>,
    pub(crate) combine: Option<CombineFn<T>>,
    pub(crate) on_read: Option<ReadFn<T>>,
    pub(crate) on_written: Option<InspectFn<T>>,
    pub(crate) on_teardown: Option<InspectFn<T>>,
    pub(crate) on_incoming: Option<IncomingFn<T>>,
    pub(crate) tagger: Option<TaggerFn<T>>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            filter: None,
            combine: None,
            on_read: None,
            on_written: None,
            on_teardown: None,
            on_incoming: None,
            tagger: None,
        }
    }
}

impl<T> Hooks<T> {
    /// Names of the hooks that are set, for `Debug` output.
    pub(crate) fn installed(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.filter.is_some() {
            names.push("filter");
        }
        if self.combine.is_some() {
            names.push("combine");
        }
        if self.on_read.is_some() {
            names.push("on_read");
        }
        if self.on_written.is_some() {
            names.push("on_written");
        }
        if self.on_teardown.is_some() {
            names.push("on_teardown");
        }
        if self.on_incoming.is_some() {
            names.push("on_incoming");
        }
        if self.tagger.is_some() {
            names.push("tagger");
        }
        names
    }
}

/// Configuration for a new [`Property`] or [`Consumable`].
///
/// ```
/// use rxprop::PropertyBuilder;
///
/// let evens = PropertyBuilder::new()
///     .with_name("evens")
///     .with_value(0)
///     .with_filter(|v: Option<&i32>| Ok(v.is_some_and(|n| n % 2 == 0)))
///     .build();
///
/// evens.set(3).unwrap();
/// assert_eq!(evens.get().unwrap(), Some(0));
/// ```
pub struct PropertyBuilder<T> {
    pub(crate) name: Option<String>,
    pub(crate) value: Option<T>,
    pub(crate) hooks: Hooks<T>,
}

impl<T> Default for PropertyBuilder<T> {
    fn default() -> Self {
        Self {
            name: None,
            value: None,
            hooks: Hooks::default(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertyBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBuilder")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("hooks", &self.hooks.installed())
            .finish()
    }
}

impl<T: Clone + fmt::Debug + 'static> PropertyBuilder<T> {
    /// Start from an empty, unnamed, hook-less configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Label used in log events and `Debug` output.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Initial value.
    #[must_use]
    pub fn with_value(mut self, value: T) -> Self {
        self.value = Some(value);
        self
    }

    /// Reject writes for which `filter` returns `false`.
    #[must_use]
    pub fn with_filter(
        mut self,
        filter: impl Fn(Option<&T>) -> Result<bool, HookError> + 'static,
    ) -> Self {
        self.hooks.filter = Some(Rc::new(filter));
        self
    }

    /// Resolve the stored value from the previous and the written one.
    #[must_use]
    pub fn with_combine(
        mut self,
        combine: impl Fn(Option<&T>, Option<&T>) -> Result<Option<T>, HookError> + 'static,
    ) -> Self {
        self.hooks.combine = Some(Rc::new(combine));
        self
    }

    /// Transform every read.
    #[must_use]
    pub fn with_on_read(
        mut self,
        on_read: impl Fn(Option<&T>) -> Result<Option<T>, HookError> + 'static,
    ) -> Self {
        self.hooks.on_read = Some(Rc::new(on_read));
        self
    }

    /// Run after every committed write.
    #[must_use]
    pub fn with_on_written(
        mut self,
        on_written: impl Fn(Option<&T>) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.hooks.on_written = Some(Rc::new(on_written));
        self
    }

    /// Run once when the property is cleared.
    #[must_use]
    pub fn with_on_teardown(
        mut self,
        on_teardown: impl Fn(Option<&T>) -> Result<(), HookError> + 'static,
    ) -> Self {
        self.hooks.on_teardown = Some(Rc::new(on_teardown));
        self
    }

    /// Transform values received while acting as a sink.
    #[must_use]
    pub fn with_on_incoming(
        mut self,
        on_incoming: impl Fn(T) -> Result<T, HookError> + 'static,
    ) -> Self {
        self.hooks.on_incoming = Some(Rc::new(on_incoming));
        self
    }

    /// Derive the recorded [`TypeTag`] from each stored value.
    #[must_use]
    pub fn with_tagger(mut self, tagger: impl Fn(&T) -> TypeTag + 'static) -> Self {
        self.hooks.tagger = Some(Rc::new(tagger));
        self
    }

    /// Build a [`Property`].
    #[must_use]
    pub fn build(self) -> Property<T> {
        Property::from_builder(self)
    }

    /// Build a [`Consumable`].
    #[must_use]
    pub fn build_consumable(self) -> Consumable<T> {
        Consumable::from_property(self.build())
    }
}
