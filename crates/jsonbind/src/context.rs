//! Per-call state of a (de)serialization.
//!
//! A context is created for every call of an
//! [`ObjectMapper`](crate::ObjectMapper) and dropped with it. It carries the
//! configuration, the object identity registries and the factories for the
//! readers and writers codecs open on their own.

#![allow(clippy::struct_excessive_bools)]

use std::{any::Any, collections::HashMap};

use log::debug;

use crate::{
    error::Error,
    identity::{IdKey, InstanceKey},
    reader::{JsonReader, JsonStreamReader, ReaderOptions},
    writer::{JsonWriter, WriterOptions},
};

/// Settings for reading.
///
/// # Default
///
/// Unknown properties fail; every other option is off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeserializationConfig {
    /// Whether a property the bean does not declare is an error.
    ///
    /// # Default
    ///
    /// `true`
    pub fail_on_unknown_properties: bool,

    /// Whether a single value is read as a one element sequence where an array
    /// is expected.
    ///
    /// # Default
    ///
    /// `false`
    pub accept_single_value_as_array: bool,

    /// Whether the document is an object with one property, named after the
    /// root type, wrapping the value.
    ///
    /// # Default
    ///
    /// `false`
    pub unwrap_root_value: bool,

    /// Whether an unknown enum constant in an `Option` slot reads as `None`.
    ///
    /// # Default
    ///
    /// `false`
    pub read_unknown_enum_values_as_null: bool,

    /// Whether the reader accepts the lenient syntax listed on
    /// [`ReaderOptions::lenient`].
    ///
    /// # Default
    ///
    /// `false`
    pub lenient: bool,

    /// How deeply arrays and objects may nest, see
    /// [`ReaderOptions::max_depth`].
    ///
    /// # Default
    ///
    /// [`ReaderOptions::DEFAULT_MAX_DEPTH`]
    pub max_depth: usize,
}

impl DeserializationConfig {
    /// The reader settings of this configuration.
    #[must_use]
    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            lenient: self.lenient,
            max_depth: self.max_depth,
        }
    }
}

impl Default for DeserializationConfig {
    fn default() -> Self {
        Self {
            fail_on_unknown_properties: true,
            accept_single_value_as_array: false,
            unwrap_root_value: false,
            read_unknown_enum_values_as_null: false,
            lenient: false,
            max_depth: ReaderOptions::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Settings for writing.
///
/// # Default
///
/// Compact output that writes `null` properties, empty arrays and `null` map
/// values, with every other option off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializationConfig {
    /// Indentation unit for pretty-printing, see [`WriterOptions::indent`].
    ///
    /// # Default
    ///
    /// `None`
    pub indent: Option<String>,

    /// Whether bean properties holding `null` are written.
    ///
    /// # Default
    ///
    /// `true`
    pub serialize_nulls: bool,

    /// Whether empty sequences are written as `[]`. When `false` the property
    /// is left out.
    ///
    /// # Default
    ///
    /// `true`
    pub write_empty_json_arrays: bool,

    /// Whether a sequence with one element is written as that bare element.
    ///
    /// # Default
    ///
    /// `false`
    pub write_single_elem_arrays_unwrapped: bool,

    /// Whether the entries of unordered maps are sorted by key.
    ///
    /// # Default
    ///
    /// `false`
    pub order_map_entries_by_keys: bool,

    /// Whether map entries whose value is `null` are written.
    ///
    /// # Default
    ///
    /// `true`
    pub write_null_map_values: bool,

    /// Whether equal values, rather than the same instance, share an object
    /// id.
    ///
    /// # Default
    ///
    /// `false`
    pub use_equality_for_object_id: bool,

    /// Whether the value is wrapped in an object with one property named
    /// after the root type.
    ///
    /// # Default
    ///
    /// `false`
    pub wrap_root_value: bool,

    /// Whether the writer is lenient, see [`WriterOptions::lenient`].
    ///
    /// # Default
    ///
    /// `false`
    pub lenient: bool,
}

impl Default for SerializationConfig {
    fn default() -> Self {
        Self {
            indent: None,
            serialize_nulls: true,
            write_empty_json_arrays: true,
            write_single_elem_arrays_unwrapped: false,
            order_map_entries_by_keys: false,
            write_null_map_values: true,
            use_equality_for_object_id: false,
            wrap_root_value: false,
            lenient: false,
        }
    }
}

/// State of one read.
pub struct DeserializationContext {
    config: DeserializationConfig,
    instances: HashMap<IdKey, Box<dyn Any>>,
}

impl DeserializationContext {
    /// Creates a context with an empty identity registry.
    #[must_use]
    pub fn new(config: DeserializationConfig) -> Self {
        Self {
            config,
            instances: HashMap::new(),
        }
    }

    /// The settings of this read.
    #[must_use]
    pub fn config(&self) -> &DeserializationConfig {
        &self.config
    }

    /// Opens a reader over `json` with the settings of this read.
    ///
    /// Engines use it to replay buffered property text.
    #[must_use]
    pub fn new_reader<'a>(&self, json: &'a str) -> JsonStreamReader<'a> {
        JsonStreamReader::with_options(json, self.config.reader_options())
    }

    /// Attaches the reader's position to `error` and logs it.
    #[must_use]
    pub fn trace_error(&self, error: Error, reader: &dyn JsonReader) -> Error {
        let error = error.at(reader.location());
        debug!("deserialization failed: {error}");
        error
    }

    pub(crate) fn instance(&self, key: &IdKey) -> Option<&dyn Any> {
        self.instances.get(key).map(Box::as_ref)
    }

    pub(crate) fn add_instance(&mut self, key: IdKey, instance: Box<dyn Any>) {
        self.instances.insert(key, instance);
    }
}

/// State of one write.
pub struct SerializationContext {
    config: SerializationConfig,
    /// JSON text of the id of every instance written so far.
    written: HashMap<InstanceKey, String>,
    sequences: HashMap<String, i64>,
}

impl SerializationContext {
    /// Creates a context with an empty identity registry.
    #[must_use]
    pub fn new(config: SerializationConfig) -> Self {
        Self {
            config,
            written: HashMap::new(),
            sequences: HashMap::new(),
        }
    }

    /// The settings of this write.
    #[must_use]
    pub fn config(&self) -> &SerializationConfig {
        &self.config
    }

    /// Opens a writer with the settings of this write.
    ///
    /// Null suppression is left to the codecs, so the writer itself always
    /// writes nulls.
    #[must_use]
    pub fn new_writer(&self) -> JsonWriter {
        JsonWriter::with_options(WriterOptions {
            indent: self.config.indent.clone(),
            lenient: self.config.lenient,
            serialize_nulls: true,
            allow_non_finite: self.config.lenient,
        })
    }

    /// Logs `error` and hands it back.
    #[must_use]
    pub fn trace_error(&self, error: Error) -> Error {
        debug!("serialization failed: {error}");
        error
    }

    pub(crate) fn written_id(&self, key: &InstanceKey) -> Option<&str> {
        self.written.get(key).map(String::as_str)
    }

    pub(crate) fn add_written_id(&mut self, key: InstanceKey, id: String) {
        self.written.insert(key, id);
    }

    pub(crate) fn next_sequence_id(&mut self, scope: &str) -> i64 {
        let next = self.sequences.entry(scope.to_owned()).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }
}
