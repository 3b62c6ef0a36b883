use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    hash::Hash,
    sync::Arc,
};

use indexmap::IndexMap;

use super::{
    CodecRegistry, DeserializerParameters, JsonDeserializer, JsonSerializer, Mappable,
    SerializerParameters,
};
use crate::{
    context::{DeserializationContext, SerializationContext},
    error::{Error, Result},
    reader::JsonReader,
    writer::JsonWriter,
};

/// A type usable as the key of a map written as a JSON object.
///
/// `Ord` orders entries when
/// [`order_map_entries_by_keys`](crate::SerializationConfig::order_map_entries_by_keys)
/// is on.
pub trait MapKey: Ord + 'static {
    /// The property name for this key.
    fn to_key(&self) -> String;

    /// Parses a property name back into a key.
    ///
    /// # Errors
    ///
    /// Fails when `key` does not name a valid key.
    fn from_key(key: &str) -> Result<Self>
    where
        Self: Sized;
}

impl MapKey for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Result<Self> {
        Ok(key.to_owned())
    }
}

macro_rules! parsed_map_key {
    ($($ty:ty),* $(,)?) => {$(
        impl MapKey for $ty {
            fn to_key(&self) -> String {
                self.to_string()
            }

            fn from_key(key: &str) -> Result<Self> {
                key.parse().map_err(|_| {
                    Error::number_format(format!(
                        "Cannot read the key \"{key}\" as {}",
                        stringify!($ty)
                    ))
                })
            }
        }
    )*};
}

parsed_map_key!(i8, i16, i32, i64, u8, u16, u32, u64, bool, char);

/// A map written as a JSON object.
pub trait MapLike: Default + 'static {
    /// Key type.
    type Key: MapKey;
    /// Value type.
    type Value;

    /// Whether iteration already follows key order.
    const SORTED: bool;

    /// Number of entries.
    fn len(&self) -> usize;

    /// Whether there are no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The entries in iteration order.
    fn entries(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)>;

    /// The entries with mutable values.
    fn entries_mut(&mut self) -> impl Iterator<Item = &mut Self::Value>;

    /// Adds an entry read from the input. A repeated key replaces the earlier
    /// value.
    fn insert_entry(&mut self, key: Self::Key, value: Self::Value);
}

impl<K: MapKey, V: 'static> MapLike for BTreeMap<K, V> {
    type Key = K;
    type Value = V;

    const SORTED: bool = true;

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.values_mut()
    }

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

impl<K: MapKey + Hash, V: 'static> MapLike for HashMap<K, V> {
    type Key = K;
    type Value = V;

    const SORTED: bool = false;

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.values_mut()
    }

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

impl<K: MapKey + Hash, V: 'static> MapLike for IndexMap<K, V> {
    type Key = K;
    type Value = V;

    const SORTED: bool = false;

    fn len(&self) -> usize {
        IndexMap::len(self)
    }

    fn entries(&self) -> impl Iterator<Item = (&K, &V)> {
        self.iter()
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.values_mut()
    }

    fn insert_entry(&mut self, key: K, value: V) {
        self.insert(key, value);
    }
}

/// Writes a [`MapLike`] as an object.
pub struct MapSerializer<M: MapLike> {
    value: Arc<dyn JsonSerializer<M::Value>>,
}

impl<M: MapLike> MapSerializer<M> {
    /// Wraps the value serializer.
    #[must_use]
    pub fn new(value: Arc<dyn JsonSerializer<M::Value>>) -> Self {
        Self { value }
    }

    fn entry(
        &self,
        writer: &mut JsonWriter,
        key: &M::Key,
        value: &M::Value,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        if !ctx.config().write_null_map_values && self.value.is_null(value) {
            return Ok(());
        }
        writer.name(&key.to_key())?;
        self.value.serialize(writer, value, ctx, params)
    }
}

impl<M: MapLike> JsonSerializer<M> for MapSerializer<M> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &M,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        writer.begin_object()?;
        if ctx.config().order_map_entries_by_keys && !M::SORTED {
            let mut entries: Vec<_> = value.entries().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            for (key, entry) in entries {
                self.entry(writer, key, entry, ctx, params)?;
            }
        } else {
            for (key, entry) in value.entries() {
                self.entry(writer, key, entry, ctx, params)?;
            }
        }
        writer.end_object()
    }

    fn is_empty(&self, value: &M) -> bool {
        value.is_empty()
    }
}

/// Reads a [`MapLike`] from an object.
pub struct MapDeserializer<M: MapLike> {
    value: Arc<dyn JsonDeserializer<M::Value>>,
}

impl<M: MapLike> MapDeserializer<M> {
    /// Wraps the value deserializer.
    #[must_use]
    pub fn new(value: Arc<dyn JsonDeserializer<M::Value>>) -> Self {
        Self { value }
    }
}

impl<M: MapLike> JsonDeserializer<M> for MapDeserializer<M> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<M> {
        let mut map = M::default();
        reader.begin_object()?;
        while reader.has_next()? {
            let name = reader.next_name()?;
            let key = M::Key::from_key(&name).map_err(|err| ctx.trace_error(err, reader))?;
            let value = self.value.deserialize(reader, ctx, params)?;
            map.insert_entry(key, value);
        }
        reader.end_object()?;
        Ok(map)
    }

    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut M,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        for entry in value.entries_mut() {
            self.value.set_back_reference(name, reference, entry, ctx)?;
        }
        Ok(())
    }
}

impl<K: MapKey, V: Mappable> Mappable for BTreeMap<K, V> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(MapSerializer::new(registry.serializer::<V>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(MapDeserializer::new(registry.deserializer::<V>()?)))
    }
}

impl<K: MapKey + Hash, V: Mappable> Mappable for HashMap<K, V> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(MapSerializer::new(registry.serializer::<V>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(MapDeserializer::new(registry.deserializer::<V>()?)))
    }
}

impl<K: MapKey + Hash, V: Mappable> Mappable for IndexMap<K, V> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(MapSerializer::new(registry.serializer::<V>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(MapDeserializer::new(registry.deserializer::<V>()?)))
    }
}
