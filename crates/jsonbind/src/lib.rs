//! Reflection-free JSON data binding.
//!
//! The crate is layered:
//!
//! - [`JsonReader`] and [`JsonWriter`] move JSON one token at a time, over
//!   text or over a [`Value`] tree.
//! - Codecs ([`JsonSerializer`], [`JsonDeserializer`]) bind one Rust type to
//!   those tokens. Scalars, sequences, maps, enums, `Option`, `Box`, `Rc` and
//!   `Arc` come with codecs; the [`CodecRegistry`] resolves them by type.
//! - Structs are bound by two generic engines, [`BeanSerializer`] and
//!   [`BeanDeserializer`], driven by property tables. The tables are plain
//!   data, usually emitted by a code generator.
//! - [`ObjectMapper`] ties a root type to its codecs and runs one call at a
//!   time with a fresh context.
//!
//! ```
//! use std::sync::Arc;
//!
//! use jsonbind::{
//!     BeanDeserializer, BeanPropertyDeserializer, BeanPropertySerializer, BeanSerializer,
//!     CodecRegistry, InstanceBuilder, JsonDeserializer, JsonSerializer, Mappable, ObjectMapper,
//!     Result,
//! };
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Mappable for Person {
//!     fn default_serializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonSerializer<Self>>> {
//!         Ok(Arc::new(
//!             BeanSerializer::new("Person")
//!                 .property(BeanPropertySerializer::new("name", registry.serializer()?, |p: &Person| &p.name))
//!                 .property(BeanPropertySerializer::new("age", registry.serializer()?, |p: &Person| &p.age)),
//!         ))
//!     }
//!
//!     fn default_deserializer(registry: &CodecRegistry) -> Result<Arc<dyn JsonDeserializer<Self>>> {
//!         Ok(Arc::new(
//!             BeanDeserializer::new("Person", InstanceBuilder::default_constructor(Person::default))
//!                 .property("name", true, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Person, v| p.name = v))
//!                 .property("age", false, BeanPropertyDeserializer::new(registry.deserializer()?, |p: &mut Person, v| p.age = v)),
//!         ))
//!     }
//! }
//!
//! let mapper = ObjectMapper::<Person>::new("Person")?;
//! let person = mapper.read(r#"{"name":"Ada","age":36}"#)?;
//! assert_eq!(person, Person { name: "Ada".into(), age: 36 });
//! assert_eq!(mapper.write(&person)?, r#"{"name":"Ada","age":36}"#);
//! # Ok::<(), jsonbind::Error>(())
//! ```

mod bean;
mod codec;
mod context;
mod error;
mod identity;
mod mapper;
mod reader;
mod token;
mod value;
mod writer;

#[cfg(test)]
mod tests;

pub use bean::{
    As, BeanDeserializer, BeanPropertyDeserializer, BeanPropertySerializer, BeanSerializer,
    CreatorArguments, InstanceBuilder, TypeInfo,
};
#[doc(hidden)]
pub use codec::enum_from_key;
pub use codec::{
    BoxDeserializer, BoxSerializer, ByteBuf, CodecRegistry, DeserializerParameters,
    EnumDeserializer, EnumMap, EnumSerializer, EnumSet, Include, JsonDeserializer, JsonEnum,
    JsonSerializer, MapDeserializer, MapKey, MapLike, MapSerializer, Mappable, OptionDeserializer,
    OptionSerializer, Sequence, SequenceDeserializer, SequenceSerializer, SerializerParameters,
    SharedDeserializer, SharedSerializer,
};
pub use context::{
    DeserializationConfig, DeserializationContext, SerializationConfig, SerializationContext,
};
pub use error::{Error, ErrorKind, Location, Result};
pub use identity::{IdGenerator, IdentityInfo, SharedInstance};
pub use mapper::ObjectMapper;
pub use reader::{JsonReader, JsonStreamReader, JsonTreeReader, ReaderOptions};
pub use token::JsonToken;
pub use value::{Array, Map, Number, Value};
pub use writer::{JsonWriter, WriterOptions};
