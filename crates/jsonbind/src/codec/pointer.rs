use std::{any::Any, ops::Deref, rc::Rc, sync::Arc};

use super::{
    CodecRegistry, DeserializerParameters, JsonDeserializer, JsonSerializer, Mappable,
    SerializerParameters,
};
use crate::{
    context::{DeserializationContext, SerializationContext},
    error::Result,
    reader::JsonReader,
    token::JsonToken,
    writer::JsonWriter,
};

// ---- Option ----

/// Writes `None` as `null`.
pub struct OptionSerializer<T> {
    inner: Arc<dyn JsonSerializer<T>>,
}

impl<T> OptionSerializer<T> {
    /// Wraps the serializer of the present value.
    #[must_use]
    pub fn new(inner: Arc<dyn JsonSerializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T> JsonSerializer<Option<T>> for OptionSerializer<T> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &Option<T>,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        match value {
            Some(value) => self.inner.serialize(writer, value, ctx, params),
            None => writer.null_value(),
        }
    }

    fn is_empty(&self, value: &Option<T>) -> bool {
        value.as_ref().is_none_or(|value| self.inner.is_empty(value))
    }

    fn is_null(&self, value: &Option<T>) -> bool {
        value.as_ref().is_none_or(|value| self.inner.is_null(value))
    }
}

/// Reads `null` as `None`.
pub struct OptionDeserializer<T> {
    inner: Arc<dyn JsonDeserializer<T>>,
}

impl<T> OptionDeserializer<T> {
    /// Wraps the deserializer of the present value.
    #[must_use]
    pub fn new(inner: Arc<dyn JsonDeserializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T> JsonDeserializer<Option<T>> for OptionDeserializer<T> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<Option<T>> {
        if reader.peek()? == JsonToken::Null {
            reader.next_null()?;
            return Ok(None);
        }
        self.inner.deserialize_nullable(reader, ctx, params)
    }

    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut Option<T>,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        match value {
            Some(value) => self.inner.set_back_reference(name, reference, value, ctx),
            None => Ok(()),
        }
    }
}

impl<T: Mappable> Mappable for Option<T> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(OptionSerializer::new(registry.serializer::<T>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(OptionDeserializer::new(registry.deserializer::<T>()?)))
    }
}

// ---- Box ----

/// Writes the boxed value.
pub struct BoxSerializer<T> {
    inner: Arc<dyn JsonSerializer<T>>,
}

impl<T> BoxSerializer<T> {
    /// Wraps the serializer of the boxed value.
    #[must_use]
    pub fn new(inner: Arc<dyn JsonSerializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T> JsonSerializer<Box<T>> for BoxSerializer<T> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &Box<T>,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        self.inner.serialize(writer, value, ctx, params)
    }

    fn is_empty(&self, value: &Box<T>) -> bool {
        self.inner.is_empty(value)
    }

    fn is_null(&self, value: &Box<T>) -> bool {
        self.inner.is_null(value)
    }
}

/// Reads a value into a box.
pub struct BoxDeserializer<T> {
    inner: Arc<dyn JsonDeserializer<T>>,
}

impl<T> BoxDeserializer<T> {
    /// Wraps the deserializer of the boxed value.
    #[must_use]
    pub fn new(inner: Arc<dyn JsonDeserializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T> JsonDeserializer<Box<T>> for BoxDeserializer<T> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<Box<T>> {
        self.inner.deserialize(reader, ctx, params).map(Box::new)
    }

    fn deserialize_nullable(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<Option<Box<T>>> {
        Ok(self.inner.deserialize_nullable(reader, ctx, params)?.map(Box::new))
    }

    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut Box<T>,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        self.inner.set_back_reference(name, reference, value, ctx)
    }
}

impl<T: Mappable> Mappable for Box<T> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(BoxSerializer::new(registry.serializer::<T>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(BoxDeserializer::new(registry.deserializer::<T>()?)))
    }
}

// ---- Rc and Arc ----

/// Writes the value behind a shared handle.
///
/// Every handle is written in full. Sharing is only preserved across a round
/// trip for beans with object identity.
pub struct SharedSerializer<T> {
    inner: Arc<dyn JsonSerializer<T>>,
}

impl<T> SharedSerializer<T> {
    /// Wraps the serializer of the shared value.
    #[must_use]
    pub fn new(inner: Arc<dyn JsonSerializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T, P: Deref<Target = T>> JsonSerializer<P> for SharedSerializer<T> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &P,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        self.inner.serialize(writer, value, ctx, params)
    }

    fn is_empty(&self, value: &P) -> bool {
        self.inner.is_empty(value)
    }

    fn is_null(&self, value: &P) -> bool {
        self.inner.is_null(value)
    }
}

/// Reads a value into a new shared handle.
pub struct SharedDeserializer<T> {
    inner: Arc<dyn JsonDeserializer<T>>,
}

impl<T> SharedDeserializer<T> {
    /// Wraps the deserializer of the shared value.
    #[must_use]
    pub fn new(inner: Arc<dyn JsonDeserializer<T>>) -> Self {
        Self { inner }
    }
}

impl<T, P: From<T>> JsonDeserializer<P> for SharedDeserializer<T> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<P> {
        self.inner.deserialize(reader, ctx, params).map(P::from)
    }

    fn deserialize_nullable(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<Option<P>> {
        Ok(self.inner.deserialize_nullable(reader, ctx, params)?.map(P::from))
    }
}

impl<T: Mappable> Mappable for Rc<T> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(SharedSerializer::new(registry.serializer::<T>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(SharedDeserializer::new(registry.deserializer::<T>()?)))
    }
}

impl<T: Mappable> Mappable for Arc<T> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(SharedSerializer::new(registry.serializer::<T>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(SharedDeserializer::new(registry.deserializer::<T>()?)))
    }
}
