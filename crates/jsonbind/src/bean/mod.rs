//! Table-driven codecs for structs and enums of structs.
//!
//! A bean is described by plain data, usually emitted by a code generator:
//! one [`BeanPropertyDeserializer`] or [`BeanPropertySerializer`] per property,
//! plus optional object identity, polymorphic type info, back references and
//! subtype engines. One generic engine per direction interprets the tables:
//! [`BeanDeserializer`] and [`BeanSerializer`].

mod de;
mod instance;
mod property;
mod ser;

use indexmap::IndexMap;

pub use de::BeanDeserializer;
pub use instance::{CreatorArguments, InstanceBuilder};
pub use property::{BeanPropertyDeserializer, BeanPropertySerializer};
pub use ser::BeanSerializer;

/// Where the type discriminator of a polymorphic value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum As {
    /// An extra first property of the object: `{"@class":"Dog","name":"Rex"}`.
    Property,
    /// An object with the discriminator as its only key:
    /// `{"Dog":{"name":"Rex"}}`.
    WrapperObject,
    /// A two element array: `["Dog",{"name":"Rex"}]`.
    WrapperArray,
}

/// Polymorphic type settings: the discriminator shape and the tag of every
/// concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Discriminator shape.
    pub include: As,
    /// Name of the discriminator property in the [`As::Property`] shape.
    pub property_name: String,
    tags: IndexMap<&'static str, String>,
}

impl TypeInfo {
    /// Creates type info without any type.
    #[must_use]
    pub fn new(include: As, property_name: impl Into<String>) -> Self {
        Self {
            include,
            property_name: property_name.into(),
            tags: IndexMap::new(),
        }
    }

    /// Declares `tag` as the discriminator of the type named `type_name`.
    ///
    /// `type_name` is the name the type's engines were created with.
    #[must_use]
    pub fn with_type(mut self, type_name: &'static str, tag: impl Into<String>) -> Self {
        self.tags.insert(type_name, tag.into());
        self
    }

    /// The type tagged `tag`.
    #[must_use]
    pub fn type_for_tag(&self, tag: &str) -> Option<&'static str> {
        self.tags
            .iter()
            .find_map(|(type_name, candidate)| (candidate == tag).then_some(*type_name))
    }

    /// The tag of the type named `type_name`.
    #[must_use]
    pub fn tag_for_type(&self, type_name: &str) -> Option<&str> {
        self.tags.get(type_name).map(String::as_str)
    }
}
