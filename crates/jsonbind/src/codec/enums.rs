use std::{
    any::type_name,
    collections::{BTreeMap, BTreeSet},
    marker::PhantomData,
    sync::Arc,
};

use super::{
    CodecRegistry, DeserializerParameters, JsonDeserializer, JsonSerializer, MapDeserializer,
    MapKey, MapLike, MapSerializer, Mappable, Sequence, SequenceDeserializer, SequenceSerializer,
    SerializerParameters,
};
use crate::{
    context::{DeserializationContext, SerializationContext},
    error::{Error, Result},
    reader::JsonReader,
    writer::JsonWriter,
};

/// A fieldless enum written as the name of its constant.
///
/// `Ord` must follow declaration order, which `#[derive(PartialOrd, Ord)]`
/// does; [`EnumSet`] and [`EnumMap`] iterate in that order. Use
/// [`json_enum!`](crate::json_enum) to implement this trait together with
/// [`MapKey`] and [`Mappable`].
pub trait JsonEnum: MapKey + Copy + Send + Sync {
    /// Every constant, in declaration order.
    const VALUES: &'static [Self];

    /// The name written for this constant.
    fn name(self) -> &'static str;

    /// The constant written as `name`.
    #[must_use]
    fn from_name(name: &str) -> Option<Self> {
        Self::VALUES.iter().copied().find(|value| value.name() == name)
    }
}

pub(crate) fn unknown_constant<E>(name: &str) -> Error {
    Error::structural(format!(
        "Unknown constant \"{name}\" of enum {}",
        type_name::<E>()
    ))
}

/// Implements [`JsonEnum`], [`MapKey`] and [`Mappable`] for a fieldless enum.
///
/// ```
/// use jsonbind::{JsonEnum, ObjectMapper};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
/// enum Size {
///     Small,
///     Large,
/// }
///
/// jsonbind::json_enum!(Size {
///     Small => "SMALL",
///     Large => "LARGE",
/// });
///
/// assert_eq!(Size::from_name("LARGE"), Some(Size::Large));
/// let mapper = ObjectMapper::<Vec<Size>>::new("sizes")?;
/// assert_eq!(mapper.write(&vec![Size::Small, Size::Large])?, r#"["SMALL","LARGE"]"#);
/// # Ok::<(), jsonbind::Error>(())
/// ```
#[macro_export]
macro_rules! json_enum {
    ($ty:ident { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $crate::JsonEnum for $ty {
            const VALUES: &'static [Self] = &[$($ty::$variant),+];

            fn name(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl $crate::MapKey for $ty {
            fn to_key(&self) -> ::std::string::String {
                ::std::string::String::from($crate::JsonEnum::name(*self))
            }

            fn from_key(key: &str) -> $crate::Result<Self> {
                $crate::enum_from_key(key)
            }
        }

        impl $crate::Mappable for $ty {
            fn default_serializer(
                _: &$crate::CodecRegistry,
            ) -> $crate::Result<::std::sync::Arc<dyn $crate::JsonSerializer<Self>>> {
                ::std::result::Result::Ok(::std::sync::Arc::new($crate::EnumSerializer::new()))
            }

            fn default_deserializer(
                _: &$crate::CodecRegistry,
            ) -> $crate::Result<::std::sync::Arc<dyn $crate::JsonDeserializer<Self>>> {
                ::std::result::Result::Ok(::std::sync::Arc::new($crate::EnumDeserializer::new()))
            }
        }
    };
}

/// Parses a map key naming a constant of `E`.
///
/// # Errors
///
/// Fails with a structural error when `key` names no constant.
#[doc(hidden)]
pub fn enum_from_key<E: JsonEnum>(key: &str) -> Result<E> {
    E::from_name(key).ok_or_else(|| unknown_constant::<E>(key))
}

/// Writes the name of an enum constant.
pub struct EnumSerializer<E> {
    _enum: PhantomData<fn(E)>,
}

impl<E: JsonEnum> EnumSerializer<E> {
    /// Creates the serializer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _enum: PhantomData,
        }
    }
}

impl<E: JsonEnum> Default for EnumSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: JsonEnum> JsonSerializer<E> for EnumSerializer<E> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &E,
        _ctx: &mut SerializationContext,
        _params: &SerializerParameters,
    ) -> Result<()> {
        writer.value_str(value.name())
    }
}

/// Reads an enum constant from its name.
pub struct EnumDeserializer<E> {
    _enum: PhantomData<fn() -> E>,
}

impl<E: JsonEnum> EnumDeserializer<E> {
    /// Creates the deserializer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _enum: PhantomData,
        }
    }
}

impl<E: JsonEnum> Default for EnumDeserializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: JsonEnum> JsonDeserializer<E> for EnumDeserializer<E> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        _params: &DeserializerParameters,
    ) -> Result<E> {
        let name = reader.next_string()?;
        E::from_name(&name).ok_or_else(|| ctx.trace_error(unknown_constant::<E>(&name), reader))
    }

    fn deserialize_nullable(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        _params: &DeserializerParameters,
    ) -> Result<Option<E>> {
        let name = reader.next_string()?;
        match E::from_name(&name) {
            Some(value) => Ok(Some(value)),
            None if ctx.config().read_unknown_enum_values_as_null => Ok(None),
            None => Err(ctx.trace_error(unknown_constant::<E>(&name), reader)),
        }
    }
}

/// A set of enum constants, written as an array of names in declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSet<E: JsonEnum>(BTreeSet<E>);

impl<E: JsonEnum> EnumSet<E> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds `value`, returning whether it was absent.
    pub fn insert(&mut self, value: E) -> bool {
        self.0.insert(value)
    }

    /// Removes `value`, returning whether it was present.
    pub fn remove(&mut self, value: E) -> bool {
        self.0.remove(&value)
    }

    /// Whether `value` is in the set.
    #[must_use]
    pub fn contains(&self, value: E) -> bool {
        self.0.contains(&value)
    }

    /// Number of constants in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The constants in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        self.0.iter().copied()
    }
}

impl<E: JsonEnum> Default for EnumSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: JsonEnum> FromIterator<E> for EnumSet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<E: JsonEnum> Sequence for EnumSet<E> {
    type Item = E;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn items(&self) -> impl Iterator<Item = &E> {
        self.0.iter()
    }

    fn push_item(&mut self, item: E) {
        self.0.insert(item);
    }

    fn take_items(&mut self) -> Vec<E> {
        std::mem::take(&mut self.0).into_iter().collect()
    }
}

impl<E: JsonEnum> Mappable for EnumSet<E> {
    fn default_serializer(_: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(SequenceSerializer::new(Arc::new(
            EnumSerializer::<E>::new(),
        ))))
    }

    fn default_deserializer(_: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(SequenceDeserializer::new(Arc::new(
            EnumDeserializer::<E>::new(),
        ))))
    }
}

/// A map keyed by enum constants, written as an object whose property names
/// are the constant names, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMap<E: JsonEnum, V>(BTreeMap<E, V>);

impl<E: JsonEnum, V> EnumMap<E, V> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Sets the value of `key`, returning the previous one.
    pub fn insert(&mut self, key: E, value: V) -> Option<V> {
        self.0.insert(key, value)
    }

    /// The value of `key`.
    #[must_use]
    pub fn get(&self, key: E) -> Option<&V> {
        self.0.get(&key)
    }

    /// Removes the value of `key`.
    pub fn remove(&mut self, key: E) -> Option<V> {
        self.0.remove(&key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entries in declaration order of the keys.
    pub fn iter(&self) -> impl Iterator<Item = (E, &V)> {
        self.0.iter().map(|(key, value)| (*key, value))
    }
}

impl<E: JsonEnum, V> Default for EnumMap<E, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: JsonEnum, V> FromIterator<(E, V)> for EnumMap<E, V> {
    fn from_iter<I: IntoIterator<Item = (E, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<E: JsonEnum, V: 'static> MapLike for EnumMap<E, V> {
    type Key = E;
    type Value = V;

    const SORTED: bool = true;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn entries(&self) -> impl Iterator<Item = (&E, &V)> {
        self.0.iter()
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.0.values_mut()
    }

    fn insert_entry(&mut self, key: E, value: V) {
        self.0.insert(key, value);
    }
}

impl<E: JsonEnum, V: Mappable> Mappable for EnumMap<E, V> {
    fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
        Ok(Arc::new(MapSerializer::new(registry.serializer::<V>()?)))
    }

    fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
        Ok(Arc::new(MapDeserializer::new(registry.deserializer::<V>()?)))
    }
}
