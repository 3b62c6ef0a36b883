//! Value codecs and the registry that resolves them.
//!
//! A codec is a pair of objects, a [`JsonSerializer`] and a
//! [`JsonDeserializer`], that move one Rust type across a [`JsonWriter`] or a
//! [`JsonReader`]. Codecs for scalars, containers, enums and shared handles
//! live in this module; bean codecs are built from property tables by
//! [`BeanSerializer`](crate::BeanSerializer) and
//! [`BeanDeserializer`](crate::BeanDeserializer).
//!
//! Types opt into binding by implementing [`Mappable`], which names their
//! default codecs. The [`CodecRegistry`] resolves a type's codecs once, when an
//! [`ObjectMapper`](crate::ObjectMapper) is built, honoring user overrides.

mod enums;
mod map;
mod pointer;
mod registry;
mod scalar;
mod sequence;

use std::{any::Any, collections::HashSet, sync::Arc};

pub use enums::{EnumDeserializer, EnumMap, EnumSerializer, EnumSet, JsonEnum, enum_from_key};
pub use map::{MapDeserializer, MapKey, MapLike, MapSerializer};
pub use pointer::{
    BoxDeserializer, BoxSerializer, OptionDeserializer, OptionSerializer, SharedDeserializer,
    SharedSerializer,
};
pub use registry::CodecRegistry;
pub use scalar::ByteBuf;
pub use sequence::{Sequence, SequenceDeserializer, SequenceSerializer};

use registry::missing_codec;

use crate::{
    bean::TypeInfo,
    context::{DeserializationContext, SerializationContext},
    error::Result,
    identity::IdentityInfo,
    reader::JsonReader,
    writer::JsonWriter,
};

/// Writes values of `T`.
pub trait JsonSerializer<T>: Send + Sync {
    /// Writes `value` as the next JSON value.
    ///
    /// A property name may be pending on the writer; the serializer either
    /// writes a value for it or withdraws it with
    /// [`JsonWriter::cancel_name`].
    ///
    /// # Errors
    ///
    /// Propagates writer misuse and failures of nested codecs.
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()>;

    /// Whether `value` counts as empty for [`Include::NonEmpty`].
    fn is_empty(&self, value: &T) -> bool {
        let _ = value;
        false
    }

    /// Whether `value` is written as `null`.
    fn is_null(&self, value: &T) -> bool {
        let _ = value;
        false
    }
}

/// Reads values of `T`.
pub trait JsonDeserializer<T>: Send + Sync {
    /// Reads the next JSON value as a `T`.
    ///
    /// # Errors
    ///
    /// Fails when the input does not match the shape of `T`.
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<T>;

    /// Reads a value that sits in a nullable slot.
    ///
    /// The reader is never positioned on `null` here. Codecs that can map a
    /// bad value to "absent" (unknown enum constants) return `None`.
    ///
    /// # Errors
    ///
    /// Same as [`deserialize`](JsonDeserializer::deserialize).
    fn deserialize_nullable(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<Option<T>> {
        self.deserialize(reader, ctx, params).map(Some)
    }

    /// Hands `reference`, the object that owns `value`, to the back reference
    /// property `name` of `value`.
    ///
    /// Called by the owner's engine once `value` is fully read. Containers
    /// forward the call to their elements; the default does nothing.
    ///
    /// # Errors
    ///
    /// Fails when `value` declares no back reference called `name`.
    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut T,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        let _ = (name, reference, value, ctx);
        Ok(())
    }
}

/// A type with default codecs.
///
/// Implementations build codecs from the registry so nested types pick up
/// overrides. Both methods default to an error: a type that implements
/// `Mappable` without overriding them must have its codecs registered with
/// [`CodecRegistry::with_serializer`] and
/// [`CodecRegistry::with_deserializer`].
pub trait Mappable: Sized + 'static {
    /// Builds the serializer used when none is registered for `Self`.
    ///
    /// # Errors
    ///
    /// Fails when a nested codec cannot be resolved.
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        let _ = registry;
        Err(missing_codec::<Self>("serializer"))
    }

    /// Builds the deserializer used when none is registered for `Self`.
    ///
    /// # Errors
    ///
    /// Fails when a nested codec cannot be resolved.
    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        let _ = registry;
        Err(missing_codec::<Self>("deserializer"))
    }
}

/// When a bean property is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Include {
    /// Always, `null` included, regardless of
    /// [`SerializationConfig::serialize_nulls`](crate::SerializationConfig::serialize_nulls).
    Always,
    /// Unless the value is `null`.
    NonNull,
    /// Unless the value is `null` or empty.
    NonEmpty,
}

/// Per-property or per-call settings handed to a deserializer.
///
/// Bean engines merge these with their own defaults: identity and type info
/// replace the engine's, `ignore_unknown` is OR-ed and the ignored names are
/// added to the engine's.
#[derive(Debug, Clone, Default)]
pub struct DeserializerParameters {
    /// Property names skipped without being read.
    pub ignored_properties: HashSet<String>,
    /// Whether unknown property names are skipped.
    pub ignore_unknown: bool,
    /// Object identity settings.
    pub identity_info: Option<IdentityInfo>,
    /// Polymorphic type settings.
    pub type_info: Option<TypeInfo>,
}

/// Per-property or per-call settings handed to a serializer.
#[derive(Debug, Clone, Default)]
pub struct SerializerParameters {
    /// Inclusion policy of the property being written.
    pub include: Option<Include>,
    /// Property names never written.
    pub ignored_properties: HashSet<String>,
    /// Object identity settings.
    pub identity_info: Option<IdentityInfo>,
    /// Polymorphic type settings.
    pub type_info: Option<TypeInfo>,
}
