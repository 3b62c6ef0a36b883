//! JSON value types and utilities.
//!
//! This module defines the [`Value`] tree read by
//! [`JsonTreeReader`](crate::JsonTreeReader), and the string escaping shared
//! with [`JsonWriter`](crate::JsonWriter).

use core::fmt::{self, Write as _};

use indexmap::IndexMap;

use crate::{
    error::{Error, Result},
    reader::{JsonReader, JsonStreamReader, ReaderOptions},
    token::JsonToken,
    writer::JsonWriter,
};

/// A JSON object. Properties keep their insertion order.
pub type Map = IndexMap<String, Value>;
/// A JSON array.
pub type Array = Vec<Value>;

/// A JSON number: an integer when the text fits an `i64`, a double otherwise.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// An integral number in the `i64` range.
    Int(i64),
    /// Any other number.
    Float(f64),
}

impl Number {
    /// Parses the text of a numeric token.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if let Ok(int) = text.parse::<i64>() {
            return Some(Self::Int(int));
        }
        match text {
            "NaN" => Some(Self::Float(f64::NAN)),
            "Infinity" => Some(Self::Float(f64::INFINITY)),
            "-Infinity" => Some(Self::Float(f64::NEG_INFINITY)),
            _ => crate::reader::parse_f64(text, true).ok().map(Self::Float),
        }
    }

    /// The value as a double, possibly losing precision.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(int) => int as f64,
            Self::Float(float) => float,
        }
    }

    /// The value as an `i64`, if it is integral and in range.
    #[must_use]
    pub fn as_i64(self) -> Option<i64> {
        match self {
            Self::Int(int) => Some(int),
            Self::Float(float) => exact_i64(float),
        }
    }
}

/// Converts a double to `i64` when no information is lost.
#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
pub(crate) fn exact_i64(double: f64) -> Option<i64> {
    // -2^63 and 2^63, both exact in f64
    const LOWER: f64 = -9_223_372_036_854_775_808.0;
    const UPPER: f64 = 9_223_372_036_854_775_808.0;
    if double.fract() == 0.0 && (LOWER..UPPER).contains(&double) {
        Some(double as i64)
    } else {
        None
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Int(int) => f.write_str(itoa::Buffer::new().format(int)),
            Self::Float(float) => f.write_str(&format_f64(float)),
        }
    }
}

pub(crate) fn format_f64(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_owned()
    } else if value == f64::INFINITY {
        "Infinity".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        ryu::Buffer::new().format_finite(value).to_owned()
    }
}

/// A JSON value as defined by [RFC 8259].
///
/// # Examples
///
/// ```
/// use jsonbind::{Map, Value};
///
/// let mut map = Map::new();
/// map.insert("key".to_string(), Value::String("value".into()));
/// map.insert("n".to_string(), Value::from(1_i64));
/// let v = Value::Object(map);
/// assert_eq!(v.to_string(), r#"{"key":"value","n":1}"#);
/// ```
///
/// [RFC 8259]: https://datatracker.ietf.org/doc/html/rfc8259
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    /// `null`
    #[default]
    Null,
    /// `true` or `false`
    Boolean(bool),
    /// A number
    Number(Number),
    /// A string
    String(String),
    /// An array
    Array(Array),
    /// An object
    Object(Map),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(Number::Int(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(Number::Float(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Array(v)
    }
}

impl From<Map> for Value {
    fn from(v: Map) -> Self {
        Self::Object(v)
    }
}

impl Value {
    /// Parses strict JSON text into a tree.
    ///
    /// # Errors
    ///
    /// Fails on malformed input, on trailing content, and on nesting deeper
    /// than [`ReaderOptions::DEFAULT_MAX_DEPTH`].
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with(text, ReaderOptions::default())
    }

    /// Parses JSON text into a tree with the given reader options.
    ///
    /// # Errors
    ///
    /// Fails on malformed input or trailing content.
    pub fn parse_with(text: &str, options: ReaderOptions) -> Result<Self> {
        let mut reader = JsonStreamReader::with_options(text, options);
        let value = Self::read_from(&mut reader)?;
        match reader.peek()? {
            JsonToken::EndDocument => Ok(value),
            token => Err(Error::structural(format!(
                "Expected END_DOCUMENT but was {token}"
            ))
            .at(reader.location())),
        }
    }

    /// Reads the next complete value from `reader`.
    ///
    /// # Errors
    ///
    /// Propagates reader errors; fails if the reader is not positioned at a
    /// value. The recursion is as deep as the reader's nesting limit allows.
    pub fn read_from(reader: &mut dyn JsonReader) -> Result<Self> {
        Ok(match reader.peek()? {
            JsonToken::BeginArray => {
                reader.begin_array()?;
                let mut items = Array::new();
                while reader.has_next()? {
                    items.push(Self::read_from(reader)?);
                }
                reader.end_array()?;
                Self::Array(items)
            }
            JsonToken::BeginObject => {
                reader.begin_object()?;
                let mut map = Map::new();
                while reader.has_next()? {
                    let name = reader.next_name()?;
                    map.insert(name, Self::read_from(reader)?);
                }
                reader.end_object()?;
                Self::Object(map)
            }
            JsonToken::String => Self::String(reader.next_string()?),
            JsonToken::Number => {
                let text = reader.next_string()?;
                let number = Number::parse(&text).ok_or_else(|| {
                    Error::number_format(format!("Expected a number but was {text}"))
                })?;
                Self::Number(number)
            }
            JsonToken::Boolean => Self::Boolean(reader.next_bool()?),
            JsonToken::Null => {
                reader.next_null()?;
                Self::Null
            }
            token => {
                return Err(Error::structural(format!(
                    "Expected a value but was {token}"
                ))
                .at(reader.location()));
            }
        })
    }

    /// Writes this value to `writer`.
    ///
    /// # Errors
    ///
    /// Propagates writer errors, for example a non-finite number on a writer
    /// that rejects them.
    pub fn write_to(&self, writer: &mut JsonWriter) -> Result<()> {
        match self {
            Self::Null => writer.null_value(),
            Self::Boolean(b) => writer.value_bool(*b),
            Self::Number(Number::Int(int)) => writer.value_i64(*int),
            Self::Number(Number::Float(float)) => writer.value_f64(*float),
            Self::String(s) => writer.value_str(s),
            Self::Array(items) => {
                writer.begin_array()?;
                for item in items {
                    item.write_to(writer)?;
                }
                writer.end_array()
            }
            Self::Object(map) => {
                writer.begin_object()?;
                for (name, value) in map {
                    writer.name(name)?;
                    value.write_to(writer)?;
                }
                writer.end_object()
            }
        }
    }

    /// Returns `true` if the value is [`Null`](Value::Null).
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string content, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The number as `i64`, if this is an integral number.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// The number as `f64`, if this is a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The properties, if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a property of an object.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(name))
    }
}

/// Escapes a string for inclusion in a JSON string literal.
///
/// Quotes, backslashes and control characters are escaped, using the short
/// forms where JSON has them. U+2028 and U+2029 are escaped as well, since
/// pre-2019 JavaScript parsers reject them inside string literals.
pub(crate) fn write_escaped_string<W: fmt::Write>(src: &str, f: &mut W) -> fmt::Result {
    let mut start = 0;
    for (i, c) in src.char_indices() {
        let escape = match c {
            '"' => "\\\"",
            '\\' => "\\\\",
            '\t' => "\\t",
            '\u{8}' => "\\b",
            '\n' => "\\n",
            '\r' => "\\r",
            '\u{c}' => "\\f",
            c if (c as u32) < 0x20 || c == '\u{2028}' || c == '\u{2029}' => "",
            _ => continue,
        };
        f.write_str(&src[start..i])?;
        if escape.is_empty() {
            write!(f, "\\u{:04x}", c as u32)?;
        } else {
            f.write_str(escape)?;
        }
        start = i + c.len_utf8();
    }
    f.write_str(&src[start..])
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => f.write_str(if *b { "true" } else { "false" }),
            Value::Number(n) => n.fmt(f),
            Value::String(s) => {
                f.write_char('"')?;
                write_escaped_string(s, f)?;
                f.write_char('"')
            }
            Value::Array(arr) => {
                f.write_char('[')?;
                let mut first = true;
                for v in arr {
                    if !first {
                        f.write_char(',')?;
                    }
                    first = false;
                    write!(f, "{v}")?;
                }
                f.write_char(']')
            }
            Value::Object(map) => {
                f.write_char('{')?;
                let mut first = true;
                for (k, v) in map {
                    if !first {
                        f.write_char(',')?;
                    }
                    first = false;
                    f.write_char('"')?;
                    write_escaped_string(k, f)?;
                    write!(f, "\":{v}")?;
                }
                f.write_char('}')
            }
        }
    }
}
