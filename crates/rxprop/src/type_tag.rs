#![forbid(unsafe_code)]

//! Last-known value type of a property.
//!
//! The contained type of a `Property<T>` is fixed at compile time, so the
//! default tag is simply `T`'s [`TypeId`] and name, recorded on the first
//! non-empty write. A tagger can be installed to derive a finer tag from each
//! value, for example the variant of an enum.

use std::any::TypeId;
use std::fmt;

/// Identifies the type of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for the static type `V`.
    #[must_use]
    pub fn of<V: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<V>(),
            name: std::any::type_name::<V>(),
        }
    }

    /// Tag with a custom label; the id is that of `V`.
    #[must_use]
    pub fn named<V: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<V>(),
            name,
        }
    }

    /// The underlying type id.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this tag was produced for type `V`.
    #[must_use]
    pub fn is<V: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<V>()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
