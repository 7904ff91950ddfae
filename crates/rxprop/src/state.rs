#![forbid(unsafe_code)]

//! Property holding one state of a state machine.
//!
//! The stored value decides its own neighbours through [`SwitchableState`].
//! [`State::next`] and [`State::back`] ask the current value for the
//! neighbouring state and write it through the normal pipeline, so hooks run
//! and subscribers see every transition.

use std::fmt;

use crate::error::{Direction, PropertyError};
use crate::property::Property;
use crate::source::PropertySource;

/// Outcome of asking a state for its neighbour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<S> {
    /// Move to this state.
    To(S),
    /// The current state does not allow the move right now.
    NotValid,
    /// There is no state in this direction.
    End,
}

/// A value that knows the states before and after it.
pub trait SwitchableState: Sized {
    fn next(&self) -> Transition<Self>;
    fn back(&self) -> Transition<Self>;
}

/// A property whose value moves between [`SwitchableState`]s.
pub struct State<S> {
    property: Property<S>,
}

impl<S> Clone for State<S> {
    fn clone(&self) -> Self {
        Self {
            property: self.property.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for State<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("State").field(&self.property).finish()
    }
}

impl<S: SwitchableState + Clone + fmt::Debug + 'static> State<S> {
    /// Start in `initial`.
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self::from_property(Property::new(initial))
    }

    /// Drive an existing property. Hooks already installed on it stay.
    #[must_use]
    pub fn from_property(property: Property<S>) -> Self {
        Self { property }
    }

    /// The current state, read through `on_read`.
    ///
    /// # Errors
    ///
    /// As [`Property::get`].
    pub fn get(&self) -> Result<Option<S>, PropertyError> {
        self.property.get()
    }

    /// Replace the current state without a transition.
    ///
    /// # Errors
    ///
    /// As [`Property::set`].
    pub fn set(&self, state: impl Into<Option<S>>) -> Result<Option<S>, PropertyError> {
        self.property.set(state)
    }

    /// Move to the state after the current one and return it.
    ///
    /// The returned state is the one the transition produced; a `filter` on
    /// the property may still have rejected the write.
    ///
    /// # Errors
    ///
    /// [`PropertyError::StateNotValidToMove`] or
    /// [`PropertyError::StateMovingToEmpty`] as the current state decides,
    /// [`PropertyError::MissingValue`] if there is no current state, or any
    /// error of [`Property::set`].
    pub fn next(&self) -> Result<S, PropertyError> {
        self.step(Direction::Next)
    }

    /// Move to the state before the current one and return it.
    ///
    /// # Errors
    ///
    /// As [`next`](Self::next).
    pub fn back(&self) -> Result<S, PropertyError> {
        self.step(Direction::Back)
    }

    fn step(&self, direction: Direction) -> Result<S, PropertyError> {
        let current = self.property.get()?.ok_or(PropertyError::MissingValue)?;
        let transition = match direction {
            Direction::Next => current.next(),
            Direction::Back => current.back(),
        };
        match transition {
            Transition::To(state) => {
                tracing::trace!(
                    property = self.property.name().unwrap_or("<unnamed>"),
                    %direction,
                    "state moved"
                );
                self.property.set(state.clone())?;
                Ok(state)
            }
            Transition::NotValid => Err(PropertyError::StateNotValidToMove(direction)),
            Transition::End => Err(PropertyError::StateMovingToEmpty(direction)),
        }
    }

    /// Push source emitting every state the machine enters.
    #[must_use]
    pub fn as_observable(&self) -> PropertySource<S> {
        self.property.as_observable()
    }

    /// The underlying property.
    #[must_use]
    pub fn as_property(&self) -> &Property<S> {
        &self.property
    }
}
