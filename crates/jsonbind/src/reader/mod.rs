//! Pull-based token readers.
//!
//! A [`JsonReader`] hands out one [`JsonToken`] at a time. [`peek`] looks at the
//! next token without consuming it, and the `next_*`, `begin_*` and `end_*`
//! methods consume exactly one token each. Two implementations share the same
//! observable behavior:
//!
//! - [`JsonStreamReader`] lexes JSON text, strictly by default or leniently
//!   (see [`ReaderOptions::lenient`]), and reports the line and column of every
//!   failure.
//! - [`JsonTreeReader`] walks an already parsed [`Value`](crate::Value).
//!
//! # Failure does not advance
//!
//! A consuming call that fails leaves the reader where it was, so the caller
//! may retry with a different request:
//!
//! ```
//! use jsonbind::{JsonReader, JsonStreamReader, ErrorKind};
//!
//! let mut reader = JsonStreamReader::new("[1.5]");
//! reader.begin_array()?;
//! let err = reader.next_i32().unwrap_err();
//! assert!(matches!(err.kind(), ErrorKind::NumberFormat(_)));
//! assert_eq!(reader.next_f64()?, 1.5);
//! reader.end_array()?;
//! # Ok::<(), jsonbind::Error>(())
//! ```
//!
//! [`peek`]: JsonReader::peek

mod options;
mod stream;
mod tree;

pub use options::ReaderOptions;
pub use stream::JsonStreamReader;
pub use tree::JsonTreeReader;

use std::ops::RangeInclusive;

use crate::{
    error::{Error, Location, Result},
    token::JsonToken,
    value::exact_i64,
};

/// A pull reader over a JSON document.
///
/// The trait is object safe; the binding engines take `&mut dyn JsonReader` so
/// a codec works the same over text and over a tree.
pub trait JsonReader {
    /// Consumes `[`.
    ///
    /// # Errors
    ///
    /// Fails with a structural error when the next token is not `BEGIN_ARRAY`,
    /// or when [`ReaderOptions::max_depth`] containers are already open.
    fn begin_array(&mut self) -> Result<()>;

    /// Consumes `]`.
    ///
    /// # Errors
    ///
    /// Fails with a structural error when elements remain or the innermost
    /// container is not an array.
    fn end_array(&mut self) -> Result<()>;

    /// Consumes `{`.
    ///
    /// # Errors
    ///
    /// Fails with a structural error when the next token is not
    /// `BEGIN_OBJECT`, or when [`ReaderOptions::max_depth`] containers are
    /// already open.
    fn begin_object(&mut self) -> Result<()>;

    /// Consumes `}`.
    ///
    /// # Errors
    ///
    /// Fails with a structural error when properties remain or the innermost
    /// container is not an object.
    fn end_object(&mut self) -> Result<()>;

    /// Returns `true` if the current container has another element.
    ///
    /// # Errors
    ///
    /// Propagates lexical errors from looking ahead.
    fn has_next(&mut self) -> Result<bool> {
        let token = self.peek()?;
        Ok(!matches!(
            token,
            JsonToken::EndArray | JsonToken::EndObject | JsonToken::EndDocument
        ))
    }

    /// Returns the kind of the next token without consuming it.
    ///
    /// Calling `peek` repeatedly returns the same token.
    ///
    /// # Errors
    ///
    /// Fails when the upcoming text is malformed or the reader is closed.
    fn peek(&mut self) -> Result<JsonToken>;

    /// Consumes a property name.
    ///
    /// # Errors
    ///
    /// Fails with a structural error unless the next token is `NAME`.
    fn next_name(&mut self) -> Result<String>;

    /// Consumes a string value.
    ///
    /// Numbers are returned as text as well. A [`JsonStreamReader`] returns
    /// the source text; a [`JsonTreeReader`] has none and returns the
    /// number's rendering, so `1.50` comes back as `"1.5"`.
    ///
    /// # Errors
    ///
    /// Fails with a structural error for any other token.
    fn next_string(&mut self) -> Result<String>;

    /// Consumes a boolean literal.
    ///
    /// # Errors
    ///
    /// Fails with a structural error for any other token.
    fn next_bool(&mut self) -> Result<bool>;

    /// Consumes a `null` literal.
    ///
    /// # Errors
    ///
    /// Fails with a structural error for any other token.
    fn next_null(&mut self) -> Result<()>;

    /// Consumes a number, or a string holding a number, as `f64`.
    ///
    /// # Errors
    ///
    /// Fails with a number format error when the text is not a number, or is
    /// `NaN`/infinite outside lenient mode.
    fn next_f64(&mut self) -> Result<f64>;

    /// Consumes a number, or a string holding a number, as `i64`.
    ///
    /// # Errors
    ///
    /// Fails with a number format error, without consuming, when the value
    /// has a fractional part or does not fit.
    fn next_i64(&mut self) -> Result<i64>;

    /// Consumes a number, or a string holding a number, as `i32`.
    ///
    /// # Errors
    ///
    /// Fails with a number format error, without consuming, when the value
    /// has a fractional part or does not fit.
    fn next_i32(&mut self) -> Result<i32>;

    /// Consumes a number, or a string holding a number, that is an integer
    /// within `range`.
    ///
    /// # Errors
    ///
    /// Fails with a number format error, without consuming, when the value
    /// has a fractional part or lies outside `range`.
    fn next_i64_in(&mut self, range: RangeInclusive<i64>) -> Result<i64>;

    /// Consumes one complete value, including nested containers.
    ///
    /// # Errors
    ///
    /// Fails, without consuming anything, when the next token does not start
    /// a value or the value is malformed or nested too deeply.
    fn skip_value(&mut self) -> Result<()>;

    /// Consumes one complete value and returns its JSON text.
    ///
    /// The text can be parsed again on its own by a reader with the same
    /// options, which is what buffered property replay relies on.
    ///
    /// # Errors
    ///
    /// Same as [`skip_value`](JsonReader::skip_value). A tree reader also
    /// fails on non-finite numbers outside lenient mode.
    fn next_value(&mut self) -> Result<String>;

    /// Closes the reader. Every later call fails; closing twice is allowed.
    fn close(&mut self);

    /// The position of the next unconsumed token, when the source has one.
    fn location(&self) -> Option<Location>;
}

pub(crate) fn unexpected(expected: JsonToken, actual: JsonToken) -> Error {
    Error::structural(format!("Expected {expected} but was {actual}"))
}

/// Parses the text of a numeric token for a 64-bit integer request.
///
/// Integral decimals such as `1.0` or `1e2` are accepted. Anything with a
/// fractional part, or outside the `i64` range, is a format error.
pub(crate) fn parse_i64(text: &str) -> Result<i64> {
    if let Ok(value) = text.parse::<i64>() {
        return Ok(value);
    }
    text.parse::<f64>()
        .ok()
        .and_then(exact_i64)
        .ok_or_else(|| Error::number_format(format!("Expected a long but was {text}")))
}

pub(crate) fn parse_i32(text: &str) -> Result<i32> {
    parse_i64(text)
        .ok()
        .and_then(|value| i32::try_from(value).ok())
        .ok_or_else(|| Error::number_format(format!("Expected an int but was {text}")))
}

pub(crate) fn parse_i64_in(text: &str, range: &RangeInclusive<i64>) -> Result<i64> {
    parse_i64(text)
        .ok()
        .filter(|value| range.contains(value))
        .ok_or_else(|| out_of_range(text, range))
}

pub(crate) fn out_of_range(text: &str, range: &RangeInclusive<i64>) -> Error {
    Error::number_format(format!(
        "Expected an integer in [{}, {}] but was {text}",
        range.start(),
        range.end()
    ))
}

pub(crate) fn parse_f64(text: &str, lenient: bool) -> Result<f64> {
    let trimmed = text.trim();
    let value = match trimmed {
        "NaN" => f64::NAN,
        "Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if is_rust_only_float_spelling(trimmed) => {
            return Err(Error::number_format(format!(
                "Expected a double but was {text}"
            )));
        }
        _ => trimmed
            .parse::<f64>()
            .map_err(|_| Error::number_format(format!("Expected a double but was {text}")))?,
    };
    if !lenient && !value.is_finite() {
        return Err(Error::number_format(format!(
            "JSON forbids NaN and infinities: {text}"
        )));
    }
    Ok(value)
}

// `str::parse::<f64>` also accepts `inf`, `nan` and `infinity` in any case.
fn is_rust_only_float_spelling(text: &str) -> bool {
    let unsigned = text.trim_start_matches(['+', '-']);
    unsigned.eq_ignore_ascii_case("inf")
        || unsigned.eq_ignore_ascii_case("infinity")
        || unsigned.eq_ignore_ascii_case("nan")
}

#[cfg(test)]
mod tests;
