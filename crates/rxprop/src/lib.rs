#![forbid(unsafe_code)]

//! Reactive properties: observable single-value containers.
//!
//! # Role
//! `rxprop` provides a [`Property<T>`] that stores a value, runs a pipeline
//! of optional hooks on every read and write, and multicasts each successful
//! write to a changing set of weakly held subscribers.
//!
//! # Primary types
//! - **[`Property`]**: value slot, hook pipeline, subscriber set.
//! - **[`Consumable`]**: a property whose value is handed out once.
//! - **[`State`]**: a property stepping through [`SwitchableState`]s.
//! - **[`SubscriberSet`]**: ordered weak registry with lazy pruning.
//! - **[`Sink`]** / **[`CallbackSink`]**: the receiving side of a subscription.
//! - **[`PropertySource`]**: hot push source that replays the latest value.
//! - **[`PropertyError`]**: every failure the crate reports.
//!
//! # Architecture
//!
//! Handles are `Rc`-based and single-threaded. All hooks and broadcasts run
//! synchronously on the caller's stack, with no internal borrow held, so a
//! hook or a subscriber may touch the property that called it.
//!
//! # Invariants
//!
//! 1. Subscribers observe writes in the order `set` was called.
//! 2. A rejected write (filter returned `false`) changes nothing and
//!    notifies nobody.
//! 3. Subscribing the same sink twice registers it once.
//! 4. A dropped or terminated sink never receives another event and is pruned
//!    at the next registration or broadcast.
//! 5. Writing an empty value sends subscribers an error event, never a value.
//!
//! # Example
//!
//! ```
//! use rxprop::Property;
//!
//! let all = Property::new(0);
//! let evens = Property::new(0);
//! evens.filter(|v| Ok(v.is_some_and(|n| n % 2 == 0)));
//! all.as_observable().subscribe_property(&evens);
//!
//! for n in 1..=4 {
//!     all.set(n).unwrap();
//! }
//! assert_eq!(evens.get().unwrap(), Some(4));
//! ```

pub mod consumable;
pub mod error;
pub mod hooks;
pub mod property;
pub mod sink;
pub mod source;
pub mod state;
pub mod subscriber_set;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
pub mod type_tag;

pub use consumable::Consumable;
pub use error::{Cause, Direction, HookError, Operation, PropertyError, UnsupportedReason};
pub use hooks::PropertyBuilder;
pub use property::Property;
pub use sink::{CallbackSink, Sink};
pub use source::{ItemStream, MappedSink, PropertySource};
pub use state::{State, SwitchableState, Transition};
pub use subscriber_set::{SubscriberId, SubscriberSet};
pub use type_tag::TypeTag;
