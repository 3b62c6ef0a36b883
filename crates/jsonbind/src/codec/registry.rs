use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use log::trace;

use super::{DeserializerParameters, JsonDeserializer, JsonSerializer, Mappable, SerializerParameters};
use crate::{
    context::{DeserializationContext, SerializationContext},
    error::{Error, Result},
    reader::JsonReader,
    writer::JsonWriter,
};

type Codecs = Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>;
type Slot<C> = OnceLock<Arc<C>>;

/// Resolves the codecs of a type and caches them.
///
/// Registered overrides win over the defaults of [`Mappable`]. Every codec is
/// built once per registry. A type whose codec is still being built when it is
/// requested again, as happens with recursive types, gets a handle that
/// forwards to the codec once it is complete.
///
/// ```
/// use std::sync::Arc;
///
/// use jsonbind::CodecRegistry;
///
/// let registry = CodecRegistry::new();
/// let strings = registry.serializer::<Vec<String>>()?;
/// let again = registry.serializer::<Vec<String>>()?;
/// assert!(Arc::ptr_eq(&strings, &again));
/// # Ok::<(), jsonbind::Error>(())
/// ```
#[derive(Default)]
pub struct CodecRegistry {
    serializer_overrides: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    deserializer_overrides: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    serializers: Codecs,
    deserializers: Codecs,
}

impl CodecRegistry {
    /// Creates a registry without overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `serializer` for every `T` resolved through this registry.
    #[must_use]
    pub fn with_serializer<T: 'static>(mut self, serializer: Arc<dyn JsonSerializer<T>>) -> Self {
        self.serializer_overrides
            .insert(TypeId::of::<T>(), Arc::new(serializer));
        self
    }

    /// Uses `deserializer` for every `T` resolved through this registry.
    #[must_use]
    pub fn with_deserializer<T: 'static>(
        mut self,
        deserializer: Arc<dyn JsonDeserializer<T>>,
    ) -> Self {
        self.deserializer_overrides
            .insert(TypeId::of::<T>(), Arc::new(deserializer));
        self
    }

    /// The serializer of `T`.
    ///
    /// # Errors
    ///
    /// Fails with a codec error when `T`, or a type it is built from, has no
    /// serializer.
    pub fn serializer<T: Mappable>(&self) -> Result<Arc<dyn JsonSerializer<T>>> {
        if let Some(codec) = self.serializer_overrides.get(&TypeId::of::<T>()) {
            return downcast_override::<T, dyn JsonSerializer<T>>(codec);
        }
        let (slot, fresh) = slot::<dyn JsonSerializer<T>>(&self.serializers, TypeId::of::<T>())?;
        if let Some(codec) = slot.get() {
            return Ok(Arc::clone(codec));
        }
        if !fresh {
            trace!("deferring serializer of {}", type_name::<T>());
            return Ok(Arc::new(Deferred { slot }));
        }
        trace!("building serializer of {}", type_name::<T>());
        match T::default_serializer(self) {
            Ok(codec) => Ok(Arc::clone(slot.get_or_init(|| codec))),
            Err(err) => {
                forget(&self.serializers, TypeId::of::<T>());
                Err(err)
            }
        }
    }

    /// The deserializer of `T`.
    ///
    /// # Errors
    ///
    /// Fails with a codec error when `T`, or a type it is built from, has no
    /// deserializer.
    pub fn deserializer<T: Mappable>(&self) -> Result<Arc<dyn JsonDeserializer<T>>> {
        if let Some(codec) = self.deserializer_overrides.get(&TypeId::of::<T>()) {
            return downcast_override::<T, dyn JsonDeserializer<T>>(codec);
        }
        let (slot, fresh) =
            slot::<dyn JsonDeserializer<T>>(&self.deserializers, TypeId::of::<T>())?;
        if let Some(codec) = slot.get() {
            return Ok(Arc::clone(codec));
        }
        if !fresh {
            trace!("deferring deserializer of {}", type_name::<T>());
            return Ok(Arc::new(Deferred { slot }));
        }
        trace!("building deserializer of {}", type_name::<T>());
        match T::default_deserializer(self) {
            Ok(codec) => Ok(Arc::clone(slot.get_or_init(|| codec))),
            Err(err) => {
                forget(&self.deserializers, TypeId::of::<T>());
                Err(err)
            }
        }
    }
}

pub(super) fn missing_codec<T>(what: &str) -> Error {
    Error::codec(format!(
        "No {what} for {}: the type has no default codec and none was registered",
        type_name::<T>()
    ))
}

fn downcast_override<T: 'static, C: ?Sized + 'static>(
    codec: &Arc<dyn Any + Send + Sync>,
) -> Result<Arc<C>> {
    codec
        .downcast_ref::<Arc<C>>()
        .cloned()
        .ok_or_else(|| Error::codec(format!("Mismatched override for {}", type_name::<T>())))
}

/// Returns the slot of `id`, and whether it was created by this call.
fn slot<C: ?Sized + Send + Sync + 'static>(
    codecs: &Codecs,
    id: TypeId,
) -> Result<(Arc<Slot<C>>, bool)> {
    let (slot, fresh) = {
        let mut codecs = codecs.lock().unwrap_or_else(PoisonError::into_inner);
        match codecs.get(&id) {
            Some(slot) => (Arc::clone(slot), false),
            None => {
                let slot: Arc<Slot<C>> = Arc::new(OnceLock::new());
                codecs.insert(id, slot.clone());
                (slot as Arc<dyn Any + Send + Sync>, true)
            }
        }
    };
    slot.downcast::<Slot<C>>()
        .map(|slot| (slot, fresh))
        .map_err(|_| Error::codec("Codec cache holds a slot of the wrong type"))
}

fn forget(codecs: &Codecs, id: TypeId) {
    codecs
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&id);
}

/// Stands in for a codec that is still being built.
struct Deferred<C: ?Sized> {
    slot: Arc<Slot<C>>,
}

impl<C: ?Sized> Deferred<C> {
    fn codec(&self) -> Result<&C> {
        self.slot
            .get()
            .map(|codec| &**codec)
            .ok_or_else(|| Error::codec("Codec used before it was completely built"))
    }
}

impl<T> JsonSerializer<T> for Deferred<dyn JsonSerializer<T>> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        self.codec()?.serialize(writer, value, ctx, params)
    }

    fn is_empty(&self, value: &T) -> bool {
        self.codec().is_ok_and(|codec| codec.is_empty(value))
    }

    fn is_null(&self, value: &T) -> bool {
        self.codec().is_ok_and(|codec| codec.is_null(value))
    }
}

impl<T> JsonDeserializer<T> for Deferred<dyn JsonDeserializer<T>> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<T> {
        self.codec()?.deserialize(reader, ctx, params)
    }

    fn deserialize_nullable(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<Option<T>> {
        self.codec()?.deserialize_nullable(reader, ctx, params)
    }

    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut T,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        self.codec()?.set_back_reference(name, reference, value, ctx)
    }
}
