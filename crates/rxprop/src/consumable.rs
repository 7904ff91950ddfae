#![forbid(unsafe_code)]

//! Consume-once property.
//!
//! [`Consumable<T>`] wraps a [`Property<T>`] and changes only the read side:
//! [`get`](Consumable::get) hands the value out and clears it, so the next
//! read sees nothing until another [`set`](Consumable::set).
//!
//! Writes, subscriptions, and broadcasts behave exactly as on the wrapped
//! property. Subscribers see every written value; replay on subscribe and
//! broadcasts read through the plain pipeline and do not consume.

use std::fmt;

use crate::error::PropertyError;
use crate::hooks::PropertyBuilder;
use crate::property::Property;
use crate::source::PropertySource;

/// A property whose value can be read once.
///
/// ```
/// use rxprop::{Consumable, PropertyError};
///
/// let message = Consumable::new("hello");
/// assert_eq!(message.get().unwrap(), Some("hello"));
/// assert_eq!(message.get().unwrap(), None);
/// assert!(matches!(message.consume(), Err(PropertyError::AlreadyConsumed)));
/// ```
pub struct Consumable<T> {
    property: Property<T>,
}

impl<T> Clone for Consumable<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Consumable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Consumable").field(&self.property).finish()
    }
}

impl<T: Clone + fmt::Debug + 'static> Default for Consumable<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Clone + fmt::Debug + 'static> Consumable<T> {
    /// Create a consumable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::from_property(Property::new(value))
    }

    /// Create an empty consumable.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_property(Property::empty())
    }

    /// Start a [`PropertyBuilder`]; finish with
    /// [`build_consumable`](PropertyBuilder::build_consumable).
    #[must_use]
    pub fn builder() -> PropertyBuilder<T> {
        PropertyBuilder::new()
    }

    /// Treat an existing property as consume-once. Other handles to the same
    /// property observe the clearing.
    #[must_use]
    pub fn from_property(property: Property<T>) -> Self {
        Self { property }
    }

    /// Store a value to be consumed later.
    ///
    /// # Errors
    ///
    /// As [`Property::set`].
    pub fn set(&self, value: impl Into<Option<T>>) -> Result<Option<T>, PropertyError> {
        self.property.set(value)
    }

    /// Read the value and clear it. Returns `None` once consumed.
    ///
    /// # Errors
    ///
    /// As [`Property::get`]; the value is kept when the read fails.
    pub fn get(&self) -> Result<Option<T>, PropertyError> {
        let value = self.property.get()?;
        self.property.inner.take_value();
        Ok(value)
    }

    /// Read the value and clear it.
    ///
    /// # Errors
    ///
    /// [`PropertyError::AlreadyConsumed`] if no value is stored, or the read
    /// produced none.
    pub fn consume(&self) -> Result<T, PropertyError> {
        if self.property.is_empty() {
            return Err(PropertyError::AlreadyConsumed);
        }
        self.get()?.ok_or(PropertyError::AlreadyConsumed)
    }

    /// Same as [`get`](Self::get): a present value is consumed.
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get).
    pub fn as_maybe(&self) -> Result<Option<T>, PropertyError> {
        if self.property.is_empty() {
            return Ok(None);
        }
        self.get()
    }

    /// Whether nothing is waiting to be consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.property.is_empty()
    }

    /// Feed a value from a push source.
    ///
    /// # Errors
    ///
    /// As [`Property::accept`].
    pub fn accept(&self, value: T) -> Result<(), PropertyError> {
        self.property.accept(value)
    }

    /// Tear down the wrapped property.
    ///
    /// # Errors
    ///
    /// As [`Property::clear`].
    pub fn clear(&self) -> Result<(), PropertyError> {
        self.property.clear()
    }

    /// Push source over the wrapped property.
    #[must_use]
    pub fn as_observable(&self) -> PropertySource<T> {
        self.property.as_observable()
    }

    /// The wrapped property, for installing hooks or subscribing it as a
    /// sink. Reads through it do not consume.
    #[must_use]
    pub fn as_property(&self) -> &Property<T> {
        &self.property
    }
}
