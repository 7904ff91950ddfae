#![forbid(unsafe_code)]

//! Error types for property operations.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Surfaces as |
//! |---------|-------|-------------|
//! | Hook failed on write/read/accept | `filter`, `combine`, `on_written`, `on_read`, `on_incoming` returned `Err` | [`PropertyError::Invocation`] to the caller |
//! | Transform failed | `map`, `flat_map`, teardown hook, consumer mapper returned `Err` | [`PropertyError::Runtime`] to the caller |
//! | Fan-out on empty value | `as_observable_from_iterable` with nothing stored | [`PropertyError::Unsupported`] |
//! | Mapping an empty value | `map` / `flat_map` with nothing stored | [`PropertyError::MissingValue`] |
//! | Consuming twice | `Consumable::consume` after the value was taken | [`PropertyError::AlreadyConsumed`] |
//! | Empty write | `set(None)` | [`PropertyError::ValueSetToEmpty`] on the error channel of every subscriber |
//! | Refused transition | `SwitchableState` returned `Transition::NotValid` | [`PropertyError::StateNotValidToMove`] |
//! | Transition past the last state | `SwitchableState` returned `Transition::End` | [`PropertyError::StateMovingToEmpty`] |

use std::fmt;
use std::rc::Rc;

/// Error type returned by user-supplied hooks.
pub type HookError = Box<dyn std::error::Error + 'static>;

/// Shared cause, so one failure can be handed to the writer and to every
/// subscriber.
pub type Cause = Rc<dyn std::error::Error + 'static>;

/// The operation that was running when a hook failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// The `filter` or `combine` stage of a write.
    Set,
    /// The `on_written` notification after a committed write.
    Written,
    /// The `on_read` transform.
    Read,
    /// A value arriving through the consumer capability.
    Accept,
    /// `Property::map`.
    Map,
    /// `Property::flat_map`.
    FlatMap,
    /// The teardown hook fired by `clear`.
    Teardown,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Set => "set",
            Self::Written => "on_written",
            Self::Read => "get",
            Self::Accept => "accept",
            Self::Map => "map",
            Self::FlatMap => "flat_map",
            Self::Teardown => "clear",
        };
        f.write_str(name)
    }
}

/// Which way a [`State`](crate::State) transition was heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Next,
    Back,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Next => "next",
            Self::Back => "back",
        })
    }
}

/// Why iterable fan-out was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedReason {
    /// Nothing is stored.
    Empty,
    /// The stored value is not a sequence.
    NotIterable,
    /// The elements are not of the requested type.
    ElementTypeMismatch,
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no iterable to use as a source"),
            Self::NotIterable => write!(f, "stored value is not iterable"),
            Self::ElementTypeMismatch => {
                write!(f, "stored value is not a collection of the requested type")
            }
        }
    }
}

/// Errors from property operations.
#[derive(Debug, Clone)]
pub enum PropertyError {
    /// A caller-supplied hook failed.
    Invocation {
        operation: Operation,
        /// Debug rendering of the value the hook was given.
        value: Option<String>,
        cause: Cause,
    },
    /// A transform or teardown hook failed.
    Runtime { operation: Operation, cause: Cause },
    /// Iterable fan-out is not possible for the stored value.
    Unsupported(UnsupportedReason),
    /// The operation needs a stored value and there is none.
    MissingValue,
    /// The consume-once value was already taken.
    AlreadyConsumed,
    /// `set(None)` was called; delivered to subscribers, never to the writer.
    ValueSetToEmpty,
    /// The current state refused to move in this direction.
    StateNotValidToMove(Direction),
    /// There is no state in this direction.
    StateMovingToEmpty(Direction),
}

impl PropertyError {
    pub(crate) fn invocation<T: fmt::Debug>(
        operation: Operation,
        value: Option<&T>,
        cause: HookError,
    ) -> Self {
        Self::Invocation {
            operation,
            value: value.map(|v| format!("{v:?}")),
            cause: Rc::from(cause),
        }
    }

    pub(crate) fn runtime(operation: Operation, cause: HookError) -> Self {
        Self::Runtime {
            operation,
            cause: Rc::from(cause),
        }
    }

    /// The operation whose hook failed, if this error came from a hook.
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Invocation { operation, .. } | Self::Runtime { operation, .. } => {
                Some(*operation)
            }
            _ => None,
        }
    }

    /// The hook's own error, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Self::Invocation { cause, .. } | Self::Runtime { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invocation {
                operation,
                value: Some(value),
                cause,
            } => write!(f, "failed to execute {operation}({value}): {cause}"),
            Self::Invocation {
                operation,
                value: None,
                cause,
            } => write!(f, "failed to execute {operation}(empty): {cause}"),
            Self::Runtime { operation, cause } => write!(f, "{operation} failed: {cause}"),
            Self::Unsupported(reason) => write!(f, "unsupported operation: {reason}"),
            Self::MissingValue => write!(f, "no value stored"),
            Self::AlreadyConsumed => write!(f, "value already consumed"),
            Self::ValueSetToEmpty => write!(f, "value set to empty"),
            Self::StateNotValidToMove(direction) => {
                write!(f, "state is not valid to move {direction}")
            }
            Self::StateMovingToEmpty(direction) => {
                write!(f, "state is moving {direction} to empty")
            }
        }
    }
}

impl std::error::Error for PropertyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause().map(|cause| &**cause as &(dyn std::error::Error + 'static))
    }
}
