//! The entry point: one mapper per root type.

use std::sync::Arc;

use crate::{
    codec::{
        CodecRegistry, DeserializerParameters, JsonDeserializer, JsonSerializer, Mappable,
        SerializerParameters,
    },
    context::{
        DeserializationConfig, DeserializationContext, SerializationConfig, SerializationContext,
    },
    error::{Error, Result},
    reader::{JsonReader, JsonTreeReader, ReaderOptions},
    token::JsonToken,
    value::Value,
    writer::JsonWriter,
};

/// Reads and writes documents whose root value is a `T`.
///
/// The codecs are resolved once, when the mapper is built. Every call then
/// works on its own context, so a mapper can be shared between threads.
///
/// ```
/// use jsonbind::{DeserializationConfig, ObjectMapper};
///
/// let mapper = ObjectMapper::<Vec<i32>>::new("numbers")?
///     .with_deserialization_config(DeserializationConfig {
///         accept_single_value_as_array: true,
///         ..DeserializationConfig::default()
///     });
/// assert_eq!(mapper.read("[1, 2]")?, vec![1, 2]);
/// assert_eq!(mapper.read("3")?, vec![3]);
/// assert_eq!(mapper.write(&vec![4, 5])?, "[4,5]");
/// # Ok::<(), jsonbind::Error>(())
/// ```
pub struct ObjectMapper<T> {
    root_name: String,
    serializer: Arc<dyn JsonSerializer<T>>,
    deserializer: Arc<dyn JsonDeserializer<T>>,
    deserialization_config: DeserializationConfig,
    serialization_config: SerializationConfig,
}

impl<T: Mappable> ObjectMapper<T> {
    /// Builds a mapper with the default codecs of `T`.
    ///
    /// `root_name` names the wrapping property when root wrapping is on.
    ///
    /// # Errors
    ///
    /// Fails when a codec of `T`, or of a type it contains, cannot be built.
    pub fn new(root_name: impl Into<String>) -> Result<Self> {
        Self::with_registry(root_name, &CodecRegistry::new())
    }

    /// Builds a mapper with the codecs `registry` resolves for `T`.
    ///
    /// # Errors
    ///
    /// Fails when a codec of `T`, or of a type it contains, cannot be built.
    pub fn with_registry(root_name: impl Into<String>, registry: &CodecRegistry) -> Result<Self> {
        Ok(Self::from_codecs(
            root_name,
            registry.serializer::<T>()?,
            registry.deserializer::<T>()?,
        ))
    }
}

impl<T> ObjectMapper<T> {
    /// Builds a mapper around the given codecs.
    #[must_use]
    pub fn from_codecs(
        root_name: impl Into<String>,
        serializer: Arc<dyn JsonSerializer<T>>,
        deserializer: Arc<dyn JsonDeserializer<T>>,
    ) -> Self {
        Self {
            root_name: root_name.into(),
            serializer,
            deserializer,
            deserialization_config: DeserializationConfig::default(),
            serialization_config: SerializationConfig::default(),
        }
    }

    /// Replaces the settings used by [`read`](Self::read).
    #[must_use]
    pub fn with_deserialization_config(mut self, config: DeserializationConfig) -> Self {
        self.deserialization_config = config;
        self
    }

    /// Replaces the settings used by [`write`](Self::write).
    #[must_use]
    pub fn with_serialization_config(mut self, config: SerializationConfig) -> Self {
        self.serialization_config = config;
        self
    }

    /// The name of the wrapping property.
    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Reads a document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, on input that does not match `T`, and on
    /// content after the root value. The error carries the position where
    /// reading stopped.
    pub fn read(&self, json: &str) -> Result<T> {
        let mut ctx = DeserializationContext::new(self.deserialization_config.clone());
        let mut reader = ctx.new_reader(json);
        let value = self
            .read_document(&mut reader, &mut ctx)
            .map_err(|err| ctx.trace_error(err, &reader))?;
        reader.close();
        Ok(value)
    }

    /// Reads a value tree.
    ///
    /// # Errors
    ///
    /// Fails when the tree does not match `T`.
    pub fn read_value(&self, value: &Value) -> Result<T> {
        let mut ctx = DeserializationContext::new(self.deserialization_config.clone());
        let mut reader =
            JsonTreeReader::with_options(value, self.deserialization_config.reader_options());
        self.read_document(&mut reader, &mut ctx)
            .map_err(|err| ctx.trace_error(err, &reader))
    }

    /// Writes a document.
    ///
    /// # Errors
    ///
    /// Fails when a codec fails, for example on a non-finite number with a
    /// strict writer.
    pub fn write(&self, value: &T) -> Result<String> {
        let mut ctx = SerializationContext::new(self.serialization_config.clone());
        let mut writer = ctx.new_writer();
        self.write_document(&mut writer, value, &mut ctx)
            .and_then(|()| writer.into_string())
            .map_err(|err| ctx.trace_error(err))
    }

    /// Writes a value tree.
    ///
    /// # Errors
    ///
    /// Same as [`write`](Self::write).
    pub fn write_value(&self, value: &T) -> Result<Value> {
        let text = self.write(value)?;
        Value::parse_with(
            &text,
            ReaderOptions {
                lenient: self.serialization_config.lenient,
                ..ReaderOptions::default()
            },
        )
    }

    fn read_document(
        &self,
        reader: &mut dyn JsonReader,
        ctx: &mut DeserializationContext,
    ) -> Result<T> {
        let params = DeserializerParameters::default();
        let value = if ctx.config().unwrap_root_value {
            reader.begin_object()?;
            if !reader.has_next()? {
                return Err(Error::structural(format!(
                    "Unwrap root value is enabled but the input has no property '{}'",
                    self.root_name
                )));
            }
            let name = reader.next_name()?;
            if name != self.root_name {
                return Err(Error::structural(format!(
                    "Unwrap root value is enabled but the name '{name}' does not match the expected root name '{}'",
                    self.root_name
                )));
            }
            let value = self.deserializer.deserialize(reader, ctx, &params)?;
            reader.end_object()?;
            value
        } else {
            self.deserializer.deserialize(reader, ctx, &params)?
        };
        match reader.peek()? {
            JsonToken::EndDocument => Ok(value),
            token => Err(Error::structural(format!(
                "Expected END_DOCUMENT but was {token}"
            ))),
        }
    }

    fn write_document(
        &self,
        writer: &mut JsonWriter,
        value: &T,
        ctx: &mut SerializationContext,
    ) -> Result<()> {
        let params = SerializerParameters::default();
        if ctx.config().wrap_root_value {
            writer.begin_object()?;
            writer.name(&self.root_name)?;
            self.serializer.serialize(writer, value, ctx, &params)?;
            writer.end_object()
        } else {
            self.serializer.serialize(writer, value, ctx, &params)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Location};

    fn wrapped() -> ObjectMapper<i32> {
        ObjectMapper::new("count")
            .unwrap()
            .with_deserialization_config(DeserializationConfig {
                unwrap_root_value: true,
                ..DeserializationConfig::default()
            })
            .with_serialization_config(SerializationConfig {
                wrap_root_value: true,
                ..SerializationConfig::default()
            })
    }

    #[test]
    fn root_values_are_wrapped_and_unwrapped() {
        let mapper = wrapped();
        assert_eq!(mapper.write(&7).unwrap(), r#"{"count":7}"#);
        assert_eq!(mapper.read(r#"{"count":7}"#).unwrap(), 7);
    }

    #[test]
    fn unwrapping_checks_the_root_name() {
        let err = wrapped().read(r#"{"total":7}"#).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Structural(msg) if msg.contains("'total'")));
        let err = wrapped().read("{}").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Structural(_)));
    }

    #[test]
    fn trailing_content_fails_with_its_position() {
        let mapper = ObjectMapper::<i32>::new("count").unwrap();
        let err = mapper.read("1 2").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Structural(_)));
        assert_eq!(err.location(), Some(Location { line: 1, column: 3 }));

        let lenient = mapper.with_deserialization_config(DeserializationConfig {
            lenient: true,
            ..DeserializationConfig::default()
        });
        let err = lenient.read("1 2").unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::Structural("Expected END_DOCUMENT but was NUMBER".into())
        );
    }

    #[test]
    fn trees_round_trip() {
        let mapper = ObjectMapper::<Vec<Option<String>>>::new("names").unwrap();
        let value = mapper
            .write_value(&vec![Some("a".to_owned()), None])
            .unwrap();
        assert_eq!(value.to_string(), r#"["a",null]"#);
        assert_eq!(
            mapper.read_value(&value).unwrap(),
            vec![Some("a".to_owned()), None]
        );
    }

    #[test]
    fn nesting_limit_comes_from_the_config() {
        let mapper = ObjectMapper::<Vec<Vec<i32>>>::new("grid")
            .unwrap()
            .with_deserialization_config(DeserializationConfig {
                max_depth: 1,
                ..DeserializationConfig::default()
            });
        let err = mapper.read("[[1]]").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Structural(_)));
        assert_eq!(err.location(), Some(Location { line: 1, column: 2 }));

        let tree = Value::parse("[[1]]").unwrap();
        let err = mapper.read_value(&tree).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Structural(_)));
        assert_eq!(mapper.read("[]").unwrap(), Vec::<Vec<i32>>::new());
    }

    #[test]
    fn mappers_are_shareable() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<ObjectMapper<Vec<String>>>();
    }
}
