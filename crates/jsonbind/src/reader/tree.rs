use std::ops::RangeInclusive;

use log::trace;

use super::{
    JsonReader, ReaderOptions, out_of_range, parse_f64, parse_i32, parse_i64, parse_i64_in,
    unexpected,
};
use crate::{
    error::{Error, Location, Result},
    token::JsonToken,
    value::{Map, Number, Value},
};

#[derive(Debug, Clone, Copy)]
enum Frame<'v> {
    Array {
        items: &'v [Value],
        index: usize,
    },
    Object {
        map: &'v Map,
        index: usize,
        /// The name at `index` was consumed; its value is next.
        value_pending: bool,
    },
}

#[derive(Debug, Clone, Copy)]
enum Numeric<'v> {
    Number(&'v Number),
    Text(&'v str),
}

#[derive(Debug, Clone, Copy)]
enum Current<'v> {
    Value(&'v Value),
    Name(&'v str),
    End(JsonToken),
}

/// A [`JsonReader`] over an already parsed [`Value`].
///
/// The reader yields the same tokens a [`JsonStreamReader`] would for the
/// compact rendering of the tree. It has no source text, so
/// [`location`](JsonReader::location) is always `None`.
///
/// [`JsonStreamReader`]: crate::JsonStreamReader
///
/// # Examples
///
/// ```
/// use jsonbind::{JsonReader, JsonTreeReader, Value};
///
/// let tree = Value::parse(r#"{"tags": ["a", "b"]}"#)?;
/// let mut reader = JsonTreeReader::new(&tree);
/// reader.begin_object()?;
/// assert_eq!(reader.next_name()?, "tags");
/// assert_eq!(reader.next_value()?, r#"["a","b"]"#);
/// reader.end_object()?;
/// # Ok::<(), jsonbind::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonTreeReader<'v> {
    root: &'v Value,
    root_consumed: bool,
    stack: Vec<Frame<'v>>,
    closed: bool,
    options: ReaderOptions,
}

impl<'v> JsonTreeReader<'v> {
    /// Creates a reader positioned before `root`.
    #[must_use]
    pub fn new(root: &'v Value) -> Self {
        Self::with_options(root, ReaderOptions::default())
    }

    /// Creates a reader positioned before `root`.
    ///
    /// [`ReaderOptions::lenient`] allows non-finite numbers, and strings such
    /// as `"NaN"` to be read as them. [`ReaderOptions::max_depth`] limits the
    /// nesting the reader descends into.
    #[must_use]
    pub fn with_options(root: &'v Value, options: ReaderOptions) -> Self {
        Self {
            root,
            root_consumed: false,
            stack: Vec::new(),
            closed: false,
            options,
        }
    }

    fn current(&self) -> Result<Current<'v>> {
        if self.closed {
            return Err(Error::illegal_use("JsonReader is closed"));
        }
        Ok(match self.stack.last() {
            None if self.root_consumed => Current::End(JsonToken::EndDocument),
            None => Current::Value(self.root),
            Some(&Frame::Array { items, index }) => match items.get(index) {
                Some(value) => Current::Value(value),
                None => Current::End(JsonToken::EndArray),
            },
            Some(&Frame::Object {
                map,
                index,
                value_pending,
            }) => match map.get_index(index) {
                Some((_, value)) if value_pending => Current::Value(value),
                Some((name, _)) => Current::Name(name),
                None => Current::End(JsonToken::EndObject),
            },
        })
    }

    /// Moves past the value that was current.
    fn advance(&mut self) {
        match self.stack.last_mut() {
            None => self.root_consumed = true,
            Some(Frame::Array { index, .. }) => *index += 1,
            Some(Frame::Object {
                index,
                value_pending,
                ..
            }) => {
                *value_pending = false;
                *index += 1;
            }
        }
    }

    fn value(&self, expected: JsonToken) -> Result<&'v Value> {
        match self.current()? {
            Current::Value(value) => Ok(value),
            Current::Name(_) => Err(unexpected(expected, JsonToken::Name)),
            Current::End(token) => Err(unexpected(expected, token)),
        }
    }

    fn numeric(&self) -> Result<Numeric<'v>> {
        match self.value(JsonToken::Number)? {
            Value::Number(n) => Ok(Numeric::Number(n)),
            Value::String(s) => Ok(Numeric::Text(s)),
            other => Err(unexpected(JsonToken::Number, token_of(other))),
        }
    }

    fn open(&mut self, frame: Frame<'v>) -> Result<()> {
        if self.stack.len() >= self.options.max_depth {
            return Err(Error::structural(format!(
                "Nesting exceeds the maximum depth of {}",
                self.options.max_depth
            )));
        }
        self.stack.push(frame);
        Ok(())
    }

    fn finite(&self, number: &Number) -> Result<f64> {
        let value = number.as_f64();
        if value.is_finite() || self.options.lenient {
            Ok(value)
        } else {
            Err(Error::number_format(format!(
                "JSON forbids NaN and infinities: {number}"
            )))
        }
    }

    /// Fails on the first non-finite number in `value` unless lenient.
    fn check_finite(&self, value: &Value) -> Result<()> {
        match value {
            Value::Number(number) => self.finite(number).map(drop),
            Value::Array(items) => items.iter().try_for_each(|item| self.check_finite(item)),
            Value::Object(map) => map.values().try_for_each(|item| self.check_finite(item)),
            Value::Null | Value::Boolean(_) | Value::String(_) => Ok(()),
        }
    }

    fn end(&mut self, expected: JsonToken) -> Result<()> {
        match self.current()? {
            Current::End(token) if token == expected => {
                self.stack.pop();
                self.advance();
                Ok(())
            }
            Current::End(token) => Err(unexpected(expected, token)),
            Current::Name(_) => Err(unexpected(expected, JsonToken::Name)),
            Current::Value(value) => Err(unexpected(expected, token_of(value))),
        }
    }
}

fn token_of(value: &Value) -> JsonToken {
    match value {
        Value::Null => JsonToken::Null,
        Value::Boolean(_) => JsonToken::Boolean,
        Value::Number(_) => JsonToken::Number,
        Value::String(_) => JsonToken::String,
        Value::Array(_) => JsonToken::BeginArray,
        Value::Object(_) => JsonToken::BeginObject,
    }
}

impl JsonReader for JsonTreeReader<'_> {
    fn begin_array(&mut self) -> Result<()> {
        match self.value(JsonToken::BeginArray)? {
            Value::Array(items) => self.open(Frame::Array { items, index: 0 }),
            other => Err(unexpected(JsonToken::BeginArray, token_of(other))),
        }
    }

    fn end_array(&mut self) -> Result<()> {
        self.end(JsonToken::EndArray)
    }

    fn begin_object(&mut self) -> Result<()> {
        match self.value(JsonToken::BeginObject)? {
            Value::Object(map) => self.open(Frame::Object {
                map,
                index: 0,
                value_pending: false,
            }),
            other => Err(unexpected(JsonToken::BeginObject, token_of(other))),
        }
    }

    fn end_object(&mut self) -> Result<()> {
        self.end(JsonToken::EndObject)
    }

    fn peek(&mut self) -> Result<JsonToken> {
        let token = match self.current()? {
            Current::Value(value) => token_of(value),
            Current::Name(_) => JsonToken::Name,
            Current::End(token) => token,
        };
        trace!("tree token {token}");
        Ok(token)
    }

    fn next_name(&mut self) -> Result<String> {
        match self.current()? {
            Current::Name(name) => {
                if let Some(Frame::Object { value_pending, .. }) = self.stack.last_mut() {
                    *value_pending = true;
                }
                Ok(name.to_owned())
            }
            Current::Value(value) => Err(unexpected(JsonToken::Name, token_of(value))),
            Current::End(token) => Err(unexpected(JsonToken::Name, token)),
        }
    }

    fn next_string(&mut self) -> Result<String> {
        let result = match self.value(JsonToken::String)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => return Err(unexpected(JsonToken::String, token_of(other))),
        };
        self.advance();
        Ok(result)
    }

    fn next_bool(&mut self) -> Result<bool> {
        match self.value(JsonToken::Boolean)? {
            Value::Boolean(b) => {
                let b = *b;
                self.advance();
                Ok(b)
            }
            other => Err(unexpected(JsonToken::Boolean, token_of(other))),
        }
    }

    fn next_null(&mut self) -> Result<()> {
        match self.value(JsonToken::Null)? {
            Value::Null => {
                self.advance();
                Ok(())
            }
            other => Err(unexpected(JsonToken::Null, token_of(other))),
        }
    }

    fn next_f64(&mut self) -> Result<f64> {
        let result = match self.numeric()? {
            Numeric::Number(n) => self.finite(n)?,
            Numeric::Text(s) => parse_f64(s, self.options.lenient)?,
        };
        self.advance();
        Ok(result)
    }

    fn next_i64(&mut self) -> Result<i64> {
        let result = match self.numeric()? {
            Numeric::Number(n) => n
                .as_i64()
                .ok_or_else(|| Error::number_format(format!("Expected a long but was {n}")))?,
            Numeric::Text(s) => parse_i64(s)?,
        };
        self.advance();
        Ok(result)
    }

    fn next_i32(&mut self) -> Result<i32> {
        let result = match self.numeric()? {
            Numeric::Number(n) => n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(|| Error::number_format(format!("Expected an int but was {n}")))?,
            Numeric::Text(s) => parse_i32(s)?,
        };
        self.advance();
        Ok(result)
    }

    fn next_i64_in(&mut self, range: RangeInclusive<i64>) -> Result<i64> {
        let result = match self.numeric()? {
            Numeric::Number(n) => n
                .as_i64()
                .filter(|i| range.contains(i))
                .ok_or_else(|| out_of_range(&n.to_string(), &range))?,
            Numeric::Text(s) => parse_i64_in(s, &range)?,
        };
        self.advance();
        Ok(result)
    }

    fn skip_value(&mut self) -> Result<()> {
        match self.current()? {
            Current::Value(_) => {
                self.advance();
                Ok(())
            }
            Current::Name(_) => {
                self.next_name()?;
                Ok(())
            }
            Current::End(token) => Err(Error::structural(format!(
                "Expected a value but was {token}"
            ))),
        }
    }

    fn next_value(&mut self) -> Result<String> {
        match self.current()? {
            Current::Value(value) => {
                self.check_finite(value)?;
                let text = value.to_string();
                self.advance();
                Ok(text)
            }
            Current::Name(_) => Err(Error::structural("Expected a value but was NAME")),
            Current::End(token) => Err(Error::structural(format!(
                "Expected a value but was {token}"
            ))),
        }
    }

    fn close(&mut self) {
        self.closed = true;
        self.stack.clear();
    }

    fn location(&self) -> Option<Location> {
        None
    }
}
