//! Object identity: writing a shared instance once and referring to it by id
//! afterwards.

use core::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
};
use std::{collections::hash_map::DefaultHasher, rc::Rc, sync::Arc};

use crate::{
    error::{Error, Result},
    reader::JsonReader,
    token::JsonToken,
};

/// Where object ids come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenerator {
    /// The id is the value of a regular bean property, named by
    /// [`IdentityInfo::property_name`].
    Property,
    /// Ids are integers handed out in order, starting at 1 for every scope and
    /// every call, and written as an extra first property.
    IntSequence,
}

/// How a bean type takes part in object identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    /// The property holding the id.
    pub property_name: String,
    /// Where ids come from.
    pub generator: IdGenerator,
    /// The id namespace. `None` uses the name of the declared type.
    pub scope: Option<String>,
    /// Whether the bean is always written as its bare id, even the first time.
    pub always_as_id: bool,
}

impl IdentityInfo {
    /// Ids taken from the property `property_name`.
    #[must_use]
    pub fn property(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            generator: IdGenerator::Property,
            scope: None,
            always_as_id: false,
        }
    }

    /// Generated integer ids written under `@id`.
    #[must_use]
    pub fn int_sequence() -> Self {
        Self {
            property_name: "@id".to_owned(),
            generator: IdGenerator::IntSequence,
            scope: None,
            always_as_id: false,
        }
    }

    /// Uses `scope` as the id namespace.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Writes the bare id every time.
    #[must_use]
    pub fn always_as_id(mut self) -> Self {
        self.always_as_id = true;
        self
    }

    pub(crate) fn scope_or<'a>(&'a self, declared: &'a str) -> &'a str {
        self.scope.as_deref().unwrap_or(declared)
    }
}

/// An object id as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ObjectId {
    /// A numeric id.
    Int(i64),
    /// A string id.
    String(String),
}

impl ObjectId {
    /// Reads an id, returning `None` for `null`.
    pub(crate) fn read(reader: &mut dyn JsonReader) -> Result<Option<Self>> {
        match reader.peek()? {
            JsonToken::Number => reader.next_i64().map(|id| Some(Self::Int(id))),
            JsonToken::String => reader.next_string().map(|id| Some(Self::String(id))),
            JsonToken::Null => reader.next_null().map(|()| None),
            token => Err(Error::structural(format!(
                "Expected an object id but was {token}"
            ))),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => id.fmt(f),
            Self::String(id) => id.fmt(f),
        }
    }
}

/// Registry key of an instance read so far.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct IdKey {
    pub(crate) scope: String,
    pub(crate) id: ObjectId,
}

/// A handle whose clones all point at the same instance.
///
/// The serializer uses the address to recognize an instance it has already
/// written. Implement it for bean types that wrap an `Rc` or `Arc` by
/// delegating to the wrapped handle.
pub trait SharedInstance {
    /// The address of the shared instance.
    fn instance_address(&self) -> usize;
}

impl<T: ?Sized> SharedInstance for Rc<T> {
    fn instance_address(&self) -> usize {
        Rc::as_ptr(self).cast::<()>() as usize
    }
}

impl<T: ?Sized> SharedInstance for Arc<T> {
    fn instance_address(&self) -> usize {
        Arc::as_ptr(self).cast::<()>() as usize
    }
}

/// Registry key of an instance already written.
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) enum InstanceKey {
    Address { type_id: TypeId, address: usize },
    Equality(EqualityKey),
}

/// Compares instances by value, for
/// [`SerializationConfig::use_equality_for_object_id`](crate::SerializationConfig::use_equality_for_object_id).
pub(crate) struct EqualityKey {
    hash: u64,
    value: Box<dyn Any>,
    eq: fn(&dyn Any, &dyn Any) -> bool,
}

impl EqualityKey {
    pub(crate) fn new<T: Hash + PartialEq + Clone + 'static>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        TypeId::of::<T>().hash(&mut hasher);
        value.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            value: Box::new(value.clone()),
            eq: eq_any::<T>,
        }
    }
}

fn eq_any<T: PartialEq + 'static>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl PartialEq for EqualityKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && (self.eq)(&*self.value, &*other.value)
    }
}

impl Eq for EqualityKey {}

impl Hash for EqualityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl fmt::Debug for EqualityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EqualityKey").field("hash", &self.hash).finish_non_exhaustive()
    }
}
