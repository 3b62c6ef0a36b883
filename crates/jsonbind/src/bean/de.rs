use std::{
    any::{Any, type_name},
    collections::HashSet,
    sync::Arc,
};

use indexmap::{IndexMap, IndexSet};
use log::trace;

use super::{
    As, TypeInfo,
    instance::{Buffered, Instance, InstanceBuilder},
    property::BeanPropertyDeserializer,
};
use crate::{
    codec::{DeserializerParameters, JsonDeserializer},
    context::DeserializationContext,
    error::{Error, ErrorKind, Result},
    identity::{IdGenerator, IdKey, IdentityInfo, ObjectId},
    reader::JsonReader,
    token::JsonToken,
};

type BackReferenceFn<T> = dyn Fn(&mut T, &dyn Any) -> Result<()> + Send + Sync;

/// Reads a bean from its property table.
///
/// The engine reads, in order: an object id reference, the type
/// discriminator, the creator properties, the object id, and then the
/// remaining properties. Properties read before the instance exists are
/// buffered and replayed once it does.
pub struct BeanDeserializer<T> {
    type_name: &'static str,
    instance_builder: Option<InstanceBuilder<T>>,
    properties: IndexMap<String, BeanPropertyDeserializer<T>>,
    required: IndexSet<String>,
    back_references: IndexMap<String, Box<BackReferenceFn<T>>>,
    subtypes: IndexMap<&'static str, Box<dyn SubtypeDeserializer<T>>>,
    ignored: HashSet<String>,
    ignore_unknown: bool,
    identity: Option<IdentityInfo>,
    type_info: Option<TypeInfo>,
    runtime_type: Option<fn(&T) -> &'static str>,
    sharing: Option<Sharing<T>>,
}

/// Settings of one read, resolved by the engine the read entered.
struct ReadState<'p> {
    identity: Option<&'p IdentityInfo>,
    /// Identity namespace; the declared type of the outermost engine unless
    /// the identity info names one.
    scope: &'p str,
    ignored: &'p HashSet<String>,
    ignore_unknown: bool,
}

impl<T: 'static> BeanDeserializer<T> {
    /// Creates an engine for the concrete type `type_name`.
    #[must_use]
    pub fn new(type_name: &'static str, instance_builder: InstanceBuilder<T>) -> Self {
        Self::with_builder(type_name, Some(instance_builder))
    }

    /// Creates an engine for a type that cannot be instantiated itself and is
    /// only ever read through one of its subtypes.
    #[must_use]
    pub fn abstract_type(type_name: &'static str) -> Self {
        Self::with_builder(type_name, None)
    }

    fn with_builder(type_name: &'static str, instance_builder: Option<InstanceBuilder<T>>) -> Self {
        Self {
            type_name,
            instance_builder,
            properties: IndexMap::new(),
            required: IndexSet::new(),
            back_references: IndexMap::new(),
            subtypes: IndexMap::new(),
            ignored: HashSet::new(),
            ignore_unknown: false,
            identity: None,
            type_info: None,
            runtime_type: None,
            sharing: None,
        }
    }

    /// Declares the property `name`. Missing required properties fail the
    /// read once the object ends.
    #[must_use]
    pub fn property(
        mut self,
        name: impl Into<String>,
        required: bool,
        property: BeanPropertyDeserializer<T>,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        }
        self.properties.insert(name, property);
        self
    }

    /// Declares the back reference property `name`, set by the deserializer
    /// of the object that holds this bean in a managed reference.
    ///
    /// `setter` receives the holder; a holder of another type than `P` fails
    /// the read.
    #[must_use]
    pub fn back_reference<P: 'static>(
        mut self,
        name: impl Into<String>,
        setter: impl Fn(&mut T, &P) + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        let property = name.clone();
        self.back_references.insert(
            name,
            Box::new(move |bean: &mut T, reference: &dyn Any| {
                let reference = reference.downcast_ref::<P>().ok_or_else(|| {
                    Error::codec(format!(
                        "The back reference '{property}' expects a {}",
                        type_name::<P>()
                    ))
                })?;
                setter(bean, reference);
                Ok(())
            }),
        );
        self
    }

    /// Declares the subtype `S`, read by `engine` when the discriminator
    /// names it.
    ///
    /// `upcast` wraps a read `S` into `T`; `downcast` finds the `S` inside a
    /// `T` and must succeed for values whose runtime type is the subtype's.
    #[must_use]
    pub fn subtype<S: 'static>(
        mut self,
        engine: Arc<BeanDeserializer<S>>,
        upcast: fn(S) -> T,
        downcast: fn(&mut T) -> Option<&mut S>,
    ) -> Self {
        self.subtypes.insert(
            engine.type_name,
            Box::new(Subtype {
                engine,
                upcast,
                downcast,
            }),
        );
        self
    }

    /// Skips the property `name` without reading it.
    #[must_use]
    pub fn ignored(mut self, name: impl Into<String>) -> Self {
        self.ignored.insert(name.into());
        self
    }

    /// Whether properties the bean does not declare are skipped.
    #[must_use]
    pub fn ignore_unknown(mut self, ignore_unknown: bool) -> Self {
        self.ignore_unknown = ignore_unknown;
        self
    }

    /// Sets the polymorphic type settings.
    #[must_use]
    pub fn type_info(mut self, type_info: TypeInfo) -> Self {
        self.type_info = Some(type_info);
        self
    }

    /// Names the concrete type of a value, for back references on
    /// polymorphic beans.
    #[must_use]
    pub fn runtime_type(mut self, runtime_type: fn(&T) -> &'static str) -> Self {
        self.runtime_type = Some(runtime_type);
        self
    }

    /// The declared type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    // ---- reading ----

    fn read_object(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
        inline: bool,
    ) -> Result<T> {
        if inline {
            return self.read_properties(reader, ctx, state);
        }
        reader.begin_object()?;
        let value = self.read_properties(reader, ctx, state)?;
        reader.end_object()?;
        Ok(value)
    }

    fn read_polymorphic(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
        type_info: &TypeInfo,
    ) -> Result<T> {
        match type_info.include {
            As::Property => {
                reader.begin_object()?;
                if reader.peek()? != JsonToken::Name
                    || reader.next_name()? != type_info.property_name
                {
                    return Err(ctx.trace_error(
                        Error::structural(format!(
                            "Cannot find the type info property '{}' as the first property",
                            type_info.property_name
                        )),
                        reader,
                    ));
                }
                let tag = reader.next_string()?;
                let value = self.dispatch(reader, ctx, state, type_info, &tag, true)?;
                reader.end_object()?;
                Ok(value)
            }
            As::WrapperObject => {
                reader.begin_object()?;
                let tag = reader.next_name()?;
                let value = self.dispatch(reader, ctx, state, type_info, &tag, false)?;
                reader.end_object()?;
                Ok(value)
            }
            As::WrapperArray => {
                reader.begin_array()?;
                let tag = reader.next_string()?;
                let value = self.dispatch(reader, ctx, state, type_info, &tag, false)?;
                reader.end_array()?;
                Ok(value)
            }
        }
    }

    fn dispatch(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
        type_info: &TypeInfo,
        tag: &str,
        inline: bool,
    ) -> Result<T> {
        let Some(type_name) = type_info.type_for_tag(tag) else {
            return Err(ctx.trace_error(
                Error::subtype(format!("Could not find the type associated to {tag}")),
                reader,
            ));
        };
        trace!("reading {} as {type_name}", self.type_name);
        if type_name == self.type_name {
            return self.read_object(reader, ctx, state, inline);
        }
        match self.subtypes.get(type_name) {
            Some(subtype) => subtype.read_object(reader, ctx, state, inline),
            None => Err(ctx.trace_error(
                Error::subtype(format!("No deserializer found for the type {type_name}")),
                reader,
            )),
        }
    }

    fn read_properties(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
    ) -> Result<T> {
        let Some(builder) = &self.instance_builder else {
            return Err(ctx.trace_error(
                Error::subtype(format!("Cannot instantiate the type {}", self.type_name)),
                reader,
            ));
        };
        let mut required: IndexSet<&str> = self.required.iter().map(String::as_str).collect();
        let Instance {
            mut value,
            mut buffered,
            consumed,
        } = builder.new_instance(reader, ctx)?;
        for name in &consumed {
            required.shift_remove(name.as_str());
        }

        if let Some(identity) = state.identity {
            self.read_identity(reader, ctx, state, identity, &value, &mut buffered)?;
        }

        for (name, raw) in buffered {
            raw.replay(ctx, |replay, ctx| {
                self.read_property(replay, ctx, state, &name, &mut value, &mut required)
            })?;
        }
        while reader.has_next()? {
            let name = reader.next_name()?;
            self.read_property(reader, ctx, state, &name, &mut value, &mut required)?;
        }

        if !required.is_empty() {
            let missing = required.into_iter().map(str::to_owned).collect();
            return Err(ctx.trace_error(
                Error::new(ErrorKind::MissingRequiredProperties(missing)),
                reader,
            ));
        }
        Ok(value)
    }

    /// Finds the object id, buffering the properties before it, and registers
    /// the instance under it.
    fn read_identity(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
        identity: &IdentityInfo,
        value: &T,
        buffered: &mut IndexMap<String, Buffered>,
    ) -> Result<()> {
        let property = identity.property_name.as_str();
        let mut raw = buffered.shift_remove(property);
        while raw.is_none() && reader.has_next()? {
            let name = reader.next_name()?;
            let text = Buffered::read(reader)?;
            if name == property {
                raw = Some(text);
            } else {
                trace!("buffering property '{name}' until the object id is read");
                buffered.insert(name, text);
            }
        }
        let Some(raw) = raw else {
            return Ok(());
        };

        let id = raw
            .replay(ctx, |replay, _| ObjectId::read(replay))
            .map_err(|err| ctx.trace_error(err, reader))?;
        if identity.generator == IdGenerator::Property {
            buffered.shift_insert(0, property.to_owned(), raw);
        }
        let Some(id) = id else {
            return Ok(());
        };
        let Some(sharing) = &self.sharing else {
            return Err(Error::codec(format!(
                "The type {} has an object id but cannot share its instances",
                self.type_name
            )));
        };
        trace!("registering {} with id {id} in scope {}", self.type_name, state.scope);
        ctx.add_instance(
            IdKey {
                scope: state.scope.to_owned(),
                id,
            },
            (sharing.share)(value),
        );
        Ok(())
    }

    fn read_property(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
        name: &str,
        value: &mut T,
        required: &mut IndexSet<&str>,
    ) -> Result<()> {
        if self.ignored.contains(name) || state.ignored.contains(name) {
            trace!("skipping ignored property '{name}'");
            return reader.skip_value();
        }
        if let Some(property) = self.properties.get(name) {
            required.shift_remove(name);
            return property.deserialize(reader, value, ctx);
        }
        if self.ignore_unknown || state.ignore_unknown || !ctx.config().fail_on_unknown_properties {
            trace!("skipping unknown property '{name}' of {}", self.type_name);
            return reader.skip_value();
        }
        Err(ctx.trace_error(
            Error::new(ErrorKind::UnknownProperty(name.to_owned())),
            reader,
        ))
    }

    fn read_reference(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        scope: &str,
    ) -> Result<T> {
        let id = match ObjectId::read(reader) {
            Ok(Some(id)) => id,
            Ok(None) => {
                return Err(ctx.trace_error(
                    Error::structural("Expected an object id but was NULL"),
                    reader,
                ));
            }
            Err(err) => return Err(ctx.trace_error(err, reader)),
        };
        let key = IdKey {
            scope: scope.to_owned(),
            id,
        };
        match ctx.instance(&key).and_then(|instance| self.resolve(instance)) {
            Some(value) => Ok(value),
            None => Err(ctx.trace_error(
                Error::new(ErrorKind::ReferenceResolution(key.id.to_string())),
                reader,
            )),
        }
    }

    fn resolve(&self, instance: &dyn Any) -> Option<T> {
        self.sharing
            .as_ref()
            .and_then(|sharing| (sharing.resolve)(instance))
            .or_else(|| self.subtypes.values().find_map(|subtype| subtype.resolve(instance)))
    }

    fn apply_back_reference(&self, name: &str, reference: &dyn Any, value: &mut T) -> Result<()> {
        match self.back_references.get(name) {
            Some(setter) => setter(value, reference),
            None => Err(Error::codec(format!(
                "The back reference '{name}' does not exist"
            ))),
        }
    }
}

impl<T: Clone + 'static> BeanDeserializer<T> {
    /// Sets the object identity settings.
    ///
    /// References resolve to a clone of the instance read first, so `T` is
    /// expected to be a shared handle such as a newtype around
    /// `Rc<RefCell<_>>`.
    #[must_use]
    pub fn identity(self, identity: IdentityInfo) -> Self {
        Self {
            identity: Some(identity),
            ..self.shared()
        }
    }

    /// Lets instances be registered and resolved by object id without
    /// declaring identity here, for subtypes of a base that declares it.
    #[must_use]
    pub fn shared(mut self) -> Self {
        self.sharing = Some(Sharing {
            share: share::<T>,
            resolve: resolve::<T>,
        });
        self
    }
}

impl<T: 'static> JsonDeserializer<T> for BeanDeserializer<T> {
    fn deserialize(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        params: &DeserializerParameters,
    ) -> Result<T> {
        let identity = params.identity_info.as_ref().or(self.identity.as_ref());
        let type_info = params.type_info.as_ref().or(self.type_info.as_ref());
        let state = ReadState {
            identity,
            scope: identity.map_or(self.type_name, |identity| identity.scope_or(self.type_name)),
            ignored: &params.ignored_properties,
            ignore_unknown: params.ignore_unknown,
        };

        if identity.is_some() {
            let token = reader.peek()?;
            let wrapper_array = type_info.is_some_and(|info| info.include == As::WrapperArray);
            if token != JsonToken::BeginObject && !(wrapper_array && token == JsonToken::BeginArray)
            {
                return self.read_reference(reader, ctx, state.scope);
            }
        }

        match type_info {
            Some(type_info) => self.read_polymorphic(reader, ctx, &state, type_info),
            None => self.read_object(reader, ctx, &state, false),
        }
    }

    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut T,
        ctx: &mut DeserializationContext,
    ) -> Result<()> {
        if let Some(runtime_type) = self.runtime_type {
            let type_name = runtime_type(value);
            if type_name != self.type_name {
                if let Some(subtype) = self.subtypes.get(type_name) {
                    return subtype.set_back_reference(name, reference, value, ctx);
                }
            }
        }
        self.apply_back_reference(name, reference, value)
    }
}

// ---- sharing ----

struct Sharing<T> {
    share: fn(&T) -> Box<dyn Any>,
    resolve: fn(&dyn Any) -> Option<T>,
}

fn share<T: Clone + 'static>(value: &T) -> Box<dyn Any> {
    Box::new(value.clone())
}

fn resolve<T: Clone + 'static>(instance: &dyn Any) -> Option<T> {
    instance.downcast_ref::<T>().cloned()
}

// ---- subtypes ----

trait SubtypeDeserializer<T>: Send + Sync {
    fn read_object(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
        inline: bool,
    ) -> Result<T>;

    /// Sets a back reference on the subtype's engine directly, without
    /// dispatching on the runtime type again.
    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut T,
        ctx: &mut DeserializationContext,
    ) -> Result<()>;

    fn resolve(&self, instance: &dyn Any) -> Option<T>;
}

struct Subtype<S, T> {
    engine: Arc<BeanDeserializer<S>>,
    upcast: fn(S) -> T,
    downcast: fn(&mut T) -> Option<&mut S>,
}

impl<S: 'static, T: 'static> SubtypeDeserializer<T> for Subtype<S, T> {
    fn read_object(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
        state: &ReadState<'_>,
        inline: bool,
    ) -> Result<T> {
        self.engine
            .read_object(reader, ctx, state, inline)
            .map(self.upcast)
    }

    fn set_back_reference(
        &self,
        name: &str,
        reference: &dyn Any,
        value: &mut T,
        _ctx: &mut DeserializationContext,
    ) -> Result<()> {
        match (self.downcast)(value) {
            Some(value) => self.engine.apply_back_reference(name, reference, value),
            None => Err(Error::codec(format!(
                "The value is not a {}",
                self.engine.type_name
            ))),
        }
    }

    fn resolve(&self, instance: &dyn Any) -> Option<T> {
        self.engine.resolve(instance).map(self.upcast)
    }
}
