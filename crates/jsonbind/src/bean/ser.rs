use std::{
    any::TypeId,
    collections::HashSet,
    hash::Hash,
    sync::Arc,
};

use indexmap::IndexMap;
use log::{trace, warn};

use super::{As, TypeInfo, property::BeanPropertySerializer};
use crate::{
    codec::{JsonSerializer, SerializerParameters},
    context::SerializationContext,
    error::{Error, Result},
    identity::{EqualityKey, IdGenerator, IdentityInfo, InstanceKey, SharedInstance},
    writer::{JsonWriter, WriterOptions},
};

/// Writes a bean from its property table.
///
/// Properties are written in declaration order. A bean with object identity
/// is written in full the first time and as its bare id afterwards.
pub struct BeanSerializer<T> {
    type_name: &'static str,
    properties: Vec<BeanPropertySerializer<T>>,
    ignored: HashSet<String>,
    identity: Option<IdentityInfo>,
    type_info: Option<TypeInfo>,
    runtime_type: Option<fn(&T) -> &'static str>,
    subtypes: IndexMap<&'static str, Box<dyn SubtypeSerializer<T>>>,
    address_key: Option<fn(&T) -> InstanceKey>,
    equality_key: Option<fn(&T) -> InstanceKey>,
}

/// Settings of one write, resolved by the engine the write entered.
struct WriteState<'p> {
    identity: Option<&'p IdentityInfo>,
    scope: &'p str,
    type_info: Option<&'p TypeInfo>,
    ignored: &'p HashSet<String>,
}

impl<T: 'static> BeanSerializer<T> {
    /// Creates an engine for the type `type_name`.
    #[must_use]
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            properties: Vec::new(),
            ignored: HashSet::new(),
            identity: None,
            type_info: None,
            runtime_type: None,
            subtypes: IndexMap::new(),
            address_key: None,
            equality_key: None,
        }
    }

    /// Appends a property.
    #[must_use]
    pub fn property(mut self, property: BeanPropertySerializer<T>) -> Self {
        self.properties.push(property);
        self
    }

    /// Never writes the property `name`.
    #[must_use]
    pub fn ignored(mut self, name: impl Into<String>) -> Self {
        self.ignored.insert(name.into());
        self
    }

    /// Sets the polymorphic type settings.
    #[must_use]
    pub fn type_info(mut self, type_info: TypeInfo) -> Self {
        self.type_info = Some(type_info);
        self
    }

    /// Names the concrete type of a value. Values of another type than this
    /// engine's are written by the matching subtype engine.
    #[must_use]
    pub fn runtime_type(mut self, runtime_type: fn(&T) -> &'static str) -> Self {
        self.runtime_type = Some(runtime_type);
        self
    }

    /// Declares the subtype `S`, written by `engine`.
    ///
    /// `downcast` must succeed for values whose runtime type is the
    /// subtype's.
    #[must_use]
    pub fn subtype<S: 'static>(
        mut self,
        engine: Arc<BeanSerializer<S>>,
        downcast: fn(&T) -> Option<&S>,
    ) -> Self {
        self.subtypes
            .insert(engine.type_name, Box::new(Subtype { engine, downcast }));
        self
    }

    /// The declared type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    // ---- writing ----

    fn write(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        state: &WriteState<'_>,
    ) -> Result<()> {
        let mut sequence_id = None;
        if let Some(identity) = state.identity {
            let key = self.instance_key(value, ctx)?;
            if let Some(id) = ctx.written_id(&key) {
                trace!("{} already written, writing its id {id}", self.type_name);
                return writer.raw_value(id);
            }
            let id = match identity.generator {
                IdGenerator::IntSequence => itoa::Buffer::new()
                    .format(ctx.next_sequence_id(state.scope))
                    .to_owned(),
                IdGenerator::Property => self.property_id(value, ctx, identity)?,
            };
            ctx.add_written_id(key, id.clone());
            if identity.always_as_id {
                return writer.raw_value(&id);
            }
            if identity.generator == IdGenerator::IntSequence {
                sequence_id = Some((identity.property_name.as_str(), id));
            }
        }
        let sequence_id = sequence_id
            .as_ref()
            .map(|(name, id)| (*name, id.as_str()));

        let Some(type_info) = state.type_info else {
            return self.write_object(writer, value, ctx, state, sequence_id);
        };
        let Some(tag) = type_info.tag_for_type(self.type_name) else {
            warn!(
                "no type tag declared for {}, writing it without type info",
                self.type_name
            );
            return self.write_object(writer, value, ctx, state, sequence_id);
        };
        match type_info.include {
            As::Property => {
                writer.begin_object()?;
                writer.name(&type_info.property_name)?;
                writer.value_str(tag)?;
                self.write_properties(writer, value, ctx, state, sequence_id)?;
                writer.end_object()
            }
            As::WrapperObject => {
                writer.begin_object()?;
                writer.name(tag)?;
                self.write_object(writer, value, ctx, state, sequence_id)?;
                writer.end_object()
            }
            As::WrapperArray => {
                writer.begin_array()?;
                writer.value_str(tag)?;
                self.write_object(writer, value, ctx, state, sequence_id)?;
                writer.end_array()
            }
        }
    }

    fn write_object(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        state: &WriteState<'_>,
        sequence_id: Option<(&str, &str)>,
    ) -> Result<()> {
        writer.begin_object()?;
        self.write_properties(writer, value, ctx, state, sequence_id)?;
        writer.end_object()
    }

    fn write_properties(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        state: &WriteState<'_>,
        sequence_id: Option<(&str, &str)>,
    ) -> Result<()> {
        if let Some((name, id)) = sequence_id {
            writer.name(name)?;
            writer.raw_value(id)?;
        }
        for property in &self.properties {
            let name = property.name();
            if self.ignored.contains(name) || state.ignored.contains(name) {
                continue;
            }
            property.serialize(writer, value, ctx)?;
        }
        Ok(())
    }

    /// Writes the id property's value on its own and returns the text.
    fn property_id(
        &self,
        value: &T,
        ctx: &mut SerializationContext,
        identity: &IdentityInfo,
    ) -> Result<String> {
        let property = self
            .properties
            .iter()
            .find(|property| property.name() == identity.property_name)
            .ok_or_else(|| {
                ctx.trace_error(Error::codec(format!(
                    "Cannot find the property '{}' holding the object id of {}",
                    identity.property_name, self.type_name
                )))
            })?;
        let mut writer = JsonWriter::with_options(WriterOptions {
            allow_non_finite: ctx.config().lenient,
            ..WriterOptions::default()
        });
        property.serialize_value(&mut writer, value, ctx)?;
        writer.into_string()
    }

    fn instance_key(&self, value: &T, ctx: &SerializationContext) -> Result<InstanceKey> {
        let key = if ctx.config().use_equality_for_object_id {
            self.equality_key.or(self.address_key)
        } else {
            self.address_key.or(self.equality_key)
        };
        match key {
            Some(key) => Ok(key(value)),
            None => Err(ctx.trace_error(Error::codec(format!(
                "The type {} has object identity but no way to tell its instances apart",
                self.type_name
            )))),
        }
    }
}

impl<T: SharedInstance + 'static> BeanSerializer<T> {
    /// Sets the object identity settings. Instances are told apart by the
    /// address of the shared value.
    #[must_use]
    pub fn identity(self, identity: IdentityInfo) -> Self {
        Self {
            identity: Some(identity),
            ..self.shared()
        }
    }

    /// Tells instances apart by address without declaring identity here, for
    /// subtypes of a base that declares it.
    #[must_use]
    pub fn shared(mut self) -> Self {
        self.address_key = Some(address_key::<T>);
        self
    }
}

impl<T: Hash + PartialEq + Clone + 'static> BeanSerializer<T> {
    /// Tells equal instances apart by value when
    /// [`use_equality_for_object_id`](crate::SerializationConfig::use_equality_for_object_id)
    /// is on.
    #[must_use]
    pub fn equality_identity(mut self) -> Self {
        self.equality_key = Some(equality_key::<T>);
        self
    }
}

impl<T: 'static> JsonSerializer<T> for BeanSerializer<T> {
    fn serialize(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        params: &SerializerParameters,
    ) -> Result<()> {
        let identity = params.identity_info.as_ref().or(self.identity.as_ref());
        let state = WriteState {
            identity,
            scope: identity.map_or(self.type_name, |identity| identity.scope_or(self.type_name)),
            type_info: params.type_info.as_ref().or(self.type_info.as_ref()),
            ignored: &params.ignored_properties,
        };
        if let Some(runtime_type) = self.runtime_type {
            let type_name = runtime_type(value);
            if type_name != self.type_name {
                match self.subtypes.get(type_name) {
                    Some(subtype) => return subtype.write(writer, value, ctx, &state),
                    None => warn!(
                        "no serializer for the subtype {type_name} of {}, writing it as {}",
                        self.type_name, self.type_name
                    ),
                }
            }
        }
        self.write(writer, value, ctx, &state)
    }
}

fn address_key<T: SharedInstance + 'static>(value: &T) -> InstanceKey {
    InstanceKey::Address {
        type_id: TypeId::of::<T>(),
        address: value.instance_address(),
    }
}

fn equality_key<T: Hash + PartialEq + Clone + 'static>(value: &T) -> InstanceKey {
    InstanceKey::Equality(EqualityKey::new(value))
}

// ---- subtypes ----

trait SubtypeSerializer<T>: Send + Sync {
    fn write(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        state: &WriteState<'_>,
    ) -> Result<()>;
}

struct Subtype<S, T> {
    engine: Arc<BeanSerializer<S>>,
    downcast: fn(&T) -> Option<&S>,
}

impl<S: 'static, T: 'static> SubtypeSerializer<T> for Subtype<S, T> {
    fn write(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
        state: &WriteState<'_>,
    ) -> Result<()> {
        match (self.downcast)(value) {
            Some(value) => self.engine.write(writer, value, ctx, state),
            None => Err(ctx.trace_error(Error::codec(format!(
                "The value is not a {}",
                self.engine.type_name
            )))),
        }
    }
}
