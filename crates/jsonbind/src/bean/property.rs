use std::{any::Any, sync::Arc};

use crate::{
    codec::{DeserializerParameters, Include, JsonDeserializer, JsonSerializer, SerializerParameters},
    context::{DeserializationContext, SerializationContext},
    error::Result,
    reader::JsonReader,
    writer::JsonWriter,
};

type ReadFn<T> = dyn Fn(
        &mut dyn JsonReader,
        &mut T,
        &mut DeserializationContext,
        &DeserializerParameters,
    ) -> Result<()>
    + Send
    + Sync;

/// Reads one property of a bean and stores it.
pub struct BeanPropertyDeserializer<T> {
    read: Box<ReadFn<T>>,
    params: DeserializerParameters,
}

impl<T: 'static> BeanPropertyDeserializer<T> {
    /// Reads the value with `deserializer` and hands it to `setter`.
    #[must_use]
    pub fn new<V: 'static>(
        deserializer: Arc<dyn JsonDeserializer<V>>,
        setter: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        Self {
            read: Box::new(
                move |reader: &mut dyn JsonReader,
                      bean: &mut T,
                      ctx: &mut DeserializationContext,
                      params: &DeserializerParameters| {
                    let value = deserializer.deserialize(reader, ctx, params)?;
                    setter(bean, value);
                    Ok(())
                },
            ),
            params: DeserializerParameters::default(),
        }
    }

    /// Reads a managed reference: once the value is read, the bean is handed
    /// to the value's back reference property `back_reference` before the
    /// value is stored.
    #[must_use]
    pub fn managed_reference<V: 'static>(
        deserializer: Arc<dyn JsonDeserializer<V>>,
        back_reference: impl Into<String>,
        setter: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        let back_reference = back_reference.into();
        Self {
            read: Box::new(
                move |reader: &mut dyn JsonReader,
                      bean: &mut T,
                      ctx: &mut DeserializationContext,
                      params: &DeserializerParameters| {
                    let mut value = deserializer.deserialize(reader, ctx, params)?;
                    let owner: &dyn Any = &*bean;
                    deserializer.set_back_reference(&back_reference, owner, &mut value, ctx)?;
                    setter(bean, value);
                    Ok(())
                },
            ),
            params: DeserializerParameters::default(),
        }
    }

    /// Hands `params` to the value deserializer.
    #[must_use]
    pub fn with_parameters(mut self, params: DeserializerParameters) -> Self {
        self.params = params;
        self
    }

    pub(super) fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        bean: &mut T,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        (self.read)(reader, bean, ctx, &self.params)
    }
}

type WriteFn<T> =
    dyn Fn(&mut JsonWriter, &T, &mut SerializationContext, &PropertyWrite<'_>) -> Result<()>
        + Send
        + Sync;

/// How a property value is written.
pub(super) struct PropertyWrite<'p> {
    /// The property name, or `None` to write the bare value.
    name: Option<&'p str>,
    include: Option<Include>,
    params: &'p SerializerParameters,
}

/// Takes one property from a bean and writes it.
pub struct BeanPropertySerializer<T> {
    name: String,
    write: Box<WriteFn<T>>,
    params: SerializerParameters,
}

impl<T: 'static> BeanPropertySerializer<T> {
    /// Writes the field `getter` returns with `serializer`.
    #[must_use]
    pub fn new<V: 'static>(
        name: impl Into<String>,
        serializer: Arc<dyn JsonSerializer<V>>,
        getter: fn(&T) -> &V,
    ) -> Self {
        Self::with_accessor(name, serializer, move |bean, visit| visit(getter(bean)))
    }

    /// Writes the value `accessor` hands to its callback with `serializer`.
    ///
    /// Use this when the value sits behind a guard, such as a `RefCell`
    /// borrow, and cannot be returned by reference.
    #[must_use]
    pub fn with_accessor<V: 'static>(
        name: impl Into<String>,
        serializer: Arc<dyn JsonSerializer<V>>,
        accessor: impl Fn(&T, &mut dyn FnMut(&V) -> Result<()>) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            write: Box::new(
                move |writer: &mut JsonWriter,
                      bean: &T,
                      ctx: &mut SerializationContext,
                      how: &PropertyWrite<'_>| {
                    accessor(bean, &mut |value: &V| {
                        write_value(serializer.as_ref(), writer, value, ctx, how)
                    })
                },
            ),
            params: SerializerParameters::default(),
        }
    }

    /// Writes the text `getter` returns verbatim, as raw JSON.
    #[must_use]
    pub fn raw(name: impl Into<String>, getter: fn(&T) -> &str) -> Self {
        Self {
            name: name.into(),
            write: Box::new(
                move |writer: &mut JsonWriter,
                      bean: &T,
                      _ctx: &mut SerializationContext,
                      how: &PropertyWrite<'_>| {
                    if let Some(name) = how.name {
                        writer.name(name)?;
                    }
                    writer.raw_value(getter(bean))
                },
            ),
            params: SerializerParameters::default(),
        }
    }

    /// Sets when the property is written.
    #[must_use]
    pub fn include(mut self, include: Include) -> Self {
        self.params.include = Some(include);
        self
    }

    /// Hands `params` to the value serializer.
    #[must_use]
    pub fn with_parameters(mut self, params: SerializerParameters) -> Self {
        self.params = params;
        self
    }
}

impl<T> BeanPropertySerializer<T> {
    /// The property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes the name and value, unless the inclusion policy leaves the
    /// property out.
    pub(super) fn serialize(
        &self,
        writer: &mut JsonWriter,
        bean: &T,
        ctx: &mut SerializationContext,
    ) -> Result<()> {
        let how = PropertyWrite {
            name: Some(&self.name),
            include: self.params.include,
            params: &self.params,
        };
        (self.write)(writer, bean, ctx, &how)
    }

    /// Writes the bare value, whatever the inclusion policy.
    pub(super) fn serialize_value(
        &self,
        writer: &mut JsonWriter,
        bean: &T,
        ctx: &mut SerializationContext,
    ) -> Result<()> {
        let how = PropertyWrite {
            name: None,
            include: Some(Include::Always),
            params: &self.params,
        };
        (self.write)(writer, bean, ctx, &how)
    }
}

fn write_value<V>(
    serializer: &dyn JsonSerializer<V>,
    writer: &mut JsonWriter,
    value: &V,
    ctx: &mut SerializationContext,
    how: &PropertyWrite<'_>,
) -> Result<()> {
    if let Some(name) = how.name {
        let omit = match how.include {
            Some(Include::Always) => false,
            Some(Include::NonNull) => serializer.is_null(value),
            Some(Include::NonEmpty) => serializer.is_null(value) || serializer.is_empty(value),
            None => serializer.is_null(value) && !ctx.config().serialize_nulls,
        };
        if omit {
            return Ok(());
        }
        writer.name(name)?;
    }
    serializer.serialize(writer, value, ctx, how.params)
}
