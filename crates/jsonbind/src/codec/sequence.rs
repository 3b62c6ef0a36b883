use std::{
    any::Any,
    collections::{BTreeSet, HashSet, VecDeque},
    hash::Hash,
    sync::Arc,
};

use super::{
    CodecRegistry, DeserializerParameters, JsonDeserializer, JsonSerializer, Mappable,
    SerializerParameters,
};
use crate::{
    context::{DeserializationContext, SerializationContext},
    error::Result,
    reader::{JsonReader, unexpected},
    token::JsonToken,
    writer::JsonWriter,
};

/// A collection written as a JSON array.
pub trait Sequence: Default + 'static {
    /// Element type.
    type Item;

    /// Number of elements.
    fn len(&self) -> usize;

    /// Whether there are no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements in writing order.
    fn items(&self) -> impl Iterator<Item = &Self::Item>;

    /// Adds an element read from the input.
    fn push_item(&mut self, item: Self::Item);

    /// Moves every element out, leaving the collection empty.
    fn take_items(&mut self) -> Vec<Self::Item>;
}

impl<T: 'static> Sequence for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn push_item(&mut self, item: T) {
        self.push(item);
    }

    fn take_items(&mut self) -> Vec<T> {
        std::mem::take(self).into_iter().collect()
    }
}

impl<T: 'static> Sequence for VecDeque<T> {
    type Item = T;

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn push_item(&mut self, item: T) {
        self.push_back(item);
    }

    fn take_items(&mut self) -> Vec<T> {
        std::mem::take(self).into_iter().collect()
    }
}

impl<T: Ord + 'static> Sequence for BTreeSet<T> {
    type Item = T;

    fn len(&self) -> usize {
        BTreeSet::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn push_item(&mut self, item: T) {
        self.insert(item);
    }

    fn take_items(&mut self) -> Vec<T> {
        std::mem::take(self).into_iter().collect()
    }
}

impl<T: Hash + Eq + 'static> Sequence for HashSet<T> {
    type Item = T;

    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn items(&self) -> impl Iterator<Item = &T> {
        self.iter()
    }

    fn push_item(&mut self, item: T) {
        self.insert(item);
    }

    fn take_items(&mut self) -> Vec<T> {
        std::mem::take(self).into_iter().collect()
    }
}

/// Writes a [`Sequence`] element by element.
pub struct SequenceSerializer<S: Sequence> {
    element: Arc<dyn JsonSerializer<S::Item>>,
}

impl<S: Sequence> SequenceSerializer<S> {
    /// Wraps the element serializer.
    #[must_use]
    pub fn new(element: Arc<dyn JsonSerializer<S::Item>>) -> Self {
        Self { element }
    }
}

impl<S: Sequence> JsonSerializer<S> for SequenceSerializer<S> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &S,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        if value.is_empty() && !ctx.config().write_empty_json_arrays && writer.has_pending_name() {
            writer.cancel_name();
            return Ok(());
        }
        if value.len() == 1 && ctx.config().write_single_elem_arrays_unwrapped {
            if let Some(item) = value.items().next() {
                return self.element.serialize(writer, item, ctx, params);
            }
        }
        writer.begin_array()?;
        for item in value.items() {
            self.element.serialize(writer, item, ctx, params)?;
        }
        writer.end_array()
    }

    fn is_empty(&self, value: &S) -> bool {
        value.is_empty()
    }
}

/// Reads a [`Sequence`] element by element.
pub struct SequenceDeserializer<S: Sequence> {
    element: Arc<dyn JsonDeserializer<S::Item>>,
}

impl<S: Sequence> SequenceDeserializer<S> {
    /// Wraps the element deserializer.
    #[must_use]
    pub fn new(element: Arc<dyn JsonDeserializer<S::Item>>) -> Self {
        Self { element }
    }
}

impl<S: Sequence> JsonDeserializer<S> for SequenceDeserializer<S> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<S> {
        let mut sequence = S::default();
        match reader.peek()? {
            JsonToken::BeginArray => {
                reader.begin_array()?;
                while reader.has_next()? {
                    sequence.push_item(self.element.deserialize(reader, ctx, params)?);
                }
                reader.end_array()?;
            }
            token if token.is_value_start() && ctx.config().accept_single_value_as_array => {
                sequence.push_item(self.element.deserialize(reader, ctx, params)?);
            }
            token => {
                return Err(ctx.trace_error(unexpected(JsonToken::BeginArray, token), reader));
            }
        }
        Ok(sequence)
    }

    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut S,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        for mut item in value.take_items() {
            self.element.set_back_reference(name, reference, &mut item, ctx)?;
            value.push_item(item);
        }
        Ok(())
    }
}

macro_rules! sequence_mappable {
    ($($ty:ident<T $(: $($bound:path),+)?>),* $(,)?) => {$(
        impl<T: Mappable $($(+ $bound)+)?> Mappable for $ty<T> {
            fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
                Ok(Arc::new(SequenceSerializer::new(registry.serializer::<T>()?)))
            }

            fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
                Ok(Arc::new(SequenceDeserializer::new(registry.deserializer::<T>()?)))
            }
        }
    )*};
}

sequence_mappable!(Vec<T>, VecDeque<T>, BTreeSet<T: Ord>, HashSet<T: Hash, Eq>);
