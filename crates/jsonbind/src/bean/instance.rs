use indexmap::IndexMap;
use log::trace;

use crate::{
    codec::{DeserializerParameters, JsonDeserializer},
    context::DeserializationContext,
    error::{Location, Result},
    reader::JsonReader,
    token::JsonToken,
};

type Create<T> = dyn Fn(&mut CreatorArguments<'_>) -> Result<T> + Send + Sync;

/// How a bean engine obtains a fresh instance.
pub enum InstanceBuilder<T> {
    /// A constructor without arguments; every property is set afterwards.
    Default(Box<dyn Fn() -> T + Send + Sync>),
    /// A constructor taking some properties as arguments.
    ///
    /// Properties that come before the last creator property are buffered and
    /// set once the instance exists.
    Creator {
        /// Names of the properties passed to the constructor.
        properties: Vec<String>,
        /// Builds the instance from the creator properties found.
        create: Box<Create<T>>,
    },
}

impl<T> InstanceBuilder<T> {
    /// Builds instances with `constructor`.
    #[must_use]
    pub fn default_constructor(constructor: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::Default(Box::new(constructor))
    }

    /// Builds instances with `create`, from the properties named `properties`.
    #[must_use]
    pub fn creator<I, S>(
        properties: I,
        create: impl Fn(&mut CreatorArguments<'_>) -> Result<T> + Send + Sync + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Creator {
            properties: properties.into_iter().map(Into::into).collect(),
            create: Box::new(create),
        }
    }

    pub(super) fn new_instance(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
    ) -> Result<Instance<T>> {
        match self {
            Self::Default(constructor) => Ok(Instance {
                value: constructor(),
                buffered: IndexMap::new(),
                consumed: Vec::new(),
            }),
            Self::Creator { properties, create } => {
                let mut arguments = IndexMap::new();
                let mut buffered = IndexMap::new();
                while arguments.len() < properties.len() && reader.peek()? == JsonToken::Name {
                    let name = reader.next_name()?;
                    let raw = Buffered::read(reader)?;
                    if properties.contains(&name) {
                        arguments.insert(name, raw);
                    } else {
                        trace!("buffering property '{name}' until the instance exists");
                        buffered.insert(name, raw);
                    }
                }
                let value = create(&mut CreatorArguments {
                    values: &arguments,
                    ctx,
                })?;
                Ok(Instance {
                    value,
                    buffered,
                    consumed: arguments.into_keys().collect(),
                })
            }
        }
    }
}

/// The JSON text of a property value read ahead, and where it started.
pub(super) struct Buffered {
    raw: String,
    origin: Option<Location>,
}

impl Buffered {
    pub(super) fn read(reader: &mut dyn JsonReader) -> Result<Self> {
        reader.peek()?;
        let origin = reader.location();
        let raw = reader.next_value()?;
        Ok(Self { raw, origin })
    }

    /// Reads the value again with `read`. Errors point into the original
    /// input.
    pub(super) fn replay<V>(
        &self,
        ctx: &mut DeserializationContext,
        read: impl FnOnce(&mut dyn JsonReader, &mut DeserializationContext) -> Result<V>,
    ) -> Result<V> {
        let mut reader = ctx.new_reader(&self.raw);
        read(&mut reader, ctx).map_err(|err| err.at(reader.location()).relocated(self.origin))
    }
}

/// A new instance with the properties read while building it.
pub(super) struct Instance<T> {
    pub(super) value: T,
    /// Properties read ahead, in encounter order.
    pub(super) buffered: IndexMap<String, Buffered>,
    /// Names of the creator properties.
    pub(super) consumed: Vec<String>,
}

/// The creator properties found in the input.
pub struct CreatorArguments<'a> {
    values: &'a IndexMap<String, Buffered>,
    ctx: &'a mut DeserializationContext,
}

impl CreatorArguments<'_> {
    /// Reads the creator property `name`, or returns `None` when the input
    /// does not have it.
    ///
    /// # Errors
    ///
    /// Fails when the property value does not match `deserializer`.
    pub fn get<V>(
        &mut self,
        name: &str,
        deserializer: &dyn JsonDeserializer<V>,
    ) -> Result<Option<V>> {
        let Some(buffered) = self.values.get(name) else {
            return Ok(None);
        };
        buffered
            .replay(self.ctx, |reader, ctx| {
                deserializer.deserialize(reader, ctx, &DeserializerParameters::default())
            })
            .map(Some)
    }

    /// Whether the input has the creator property `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}
