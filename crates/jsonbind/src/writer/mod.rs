//! Push-based JSON emitter.
//!
//! [`JsonWriter`] mirrors [`JsonReader`](crate::JsonReader): containers are
//! opened and closed explicitly, names are written before values inside
//! objects, and every call is checked against the current nesting so the
//! output is always well-formed.
//!
//! Names are deferred: [`JsonWriter::name`] only records the name, and it is
//! emitted together with the value that follows. This lets a serializer
//! withdraw a property after naming it, with [`JsonWriter::cancel_name`], when
//! it turns out there is nothing to write.

mod options;

pub use options::WriterOptions;

use crate::{
    error::{Error, Result},
    value::{format_f64, write_escaped_string},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    EmptyDocument,
    NonEmptyDocument,
    EmptyArray,
    NonEmptyArray,
    EmptyObject,
    /// A name was written; its value is next.
    DanglingName,
    NonEmptyObject,
}

/// Writes JSON text into an in-memory buffer.
///
/// # Examples
///
/// ```
/// use jsonbind::JsonWriter;
///
/// let mut writer = JsonWriter::new();
/// writer.begin_object()?;
/// writer.name("name")?;
/// writer.value_str("Rex")?;
/// writer.name("tags")?;
/// writer.begin_array()?;
/// writer.end_array()?;
/// writer.end_object()?;
/// assert_eq!(writer.into_string()?, r#"{"name":"Rex","tags":[]}"#);
/// # Ok::<(), jsonbind::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonWriter {
    out: String,
    /// Empty once the writer is closed.
    stack: Vec<Scope>,
    deferred_name: Option<String>,
    options: WriterOptions,
}

impl Default for JsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonWriter {
    /// Creates a compact, strict writer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(WriterOptions::default())
    }

    /// Creates a writer with the given options.
    #[must_use]
    pub fn with_options(options: WriterOptions) -> Self {
        Self {
            out: String::new(),
            stack: vec![Scope::EmptyDocument],
            deferred_name: None,
            options,
        }
    }

    /// The options this writer was created with.
    #[must_use]
    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Opens an array.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn begin_array(&mut self) -> Result<()> {
        self.write_deferred_name()?;
        self.open(Scope::EmptyArray, '[')
    }

    /// Closes the innermost array.
    ///
    /// # Errors
    ///
    /// Fails if the innermost container is not an array.
    pub fn end_array(&mut self) -> Result<()> {
        self.close_scope(Scope::EmptyArray, Scope::NonEmptyArray, ']')
    }

    /// Opens an object.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn begin_object(&mut self) -> Result<()> {
        self.write_deferred_name()?;
        self.open(Scope::EmptyObject, '{')
    }

    /// Closes the innermost object.
    ///
    /// # Errors
    ///
    /// Fails if the innermost container is not an object or a name is still
    /// waiting for its value.
    pub fn end_object(&mut self) -> Result<()> {
        self.close_scope(Scope::EmptyObject, Scope::NonEmptyObject, '}')
    }

    /// Records the name of the next property.
    ///
    /// # Errors
    ///
    /// Fails outside an object, or if the previous name has no value yet.
    pub fn name(&mut self, name: &str) -> Result<()> {
        if let Some(pending) = &self.deferred_name {
            return Err(Error::illegal_use(format!(
                "Expected a value for '{pending}' before the next name"
            )));
        }
        match self.top()? {
            Scope::EmptyObject | Scope::NonEmptyObject => {
                self.deferred_name = Some(name.to_owned());
                Ok(())
            }
            _ => Err(Error::illegal_use("Nesting problem: names belong in objects")),
        }
    }

    /// Withdraws the pending name without writing anything.
    ///
    /// Does nothing when no name is pending.
    pub fn cancel_name(&mut self) {
        self.deferred_name = None;
    }

    /// Whether a name is waiting for its value.
    #[must_use]
    pub fn has_pending_name(&self) -> bool {
        self.deferred_name.is_some()
    }

    /// Writes a string value.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn value_str(&mut self, value: &str) -> Result<()> {
        self.write_deferred_name()?;
        self.before_value()?;
        self.string(value);
        Ok(())
    }

    /// Writes `true` or `false`.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn value_bool(&mut self, value: bool) -> Result<()> {
        self.write_deferred_name()?;
        self.before_value()?;
        self.out.push_str(if value { "true" } else { "false" });
        Ok(())
    }

    /// Writes a signed integer.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn value_i64(&mut self, value: i64) -> Result<()> {
        self.write_deferred_name()?;
        self.before_value()?;
        self.out.push_str(itoa::Buffer::new().format(value));
        Ok(())
    }

    /// Writes an unsigned integer.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn value_u64(&mut self, value: u64) -> Result<()> {
        self.write_deferred_name()?;
        self.before_value()?;
        self.out.push_str(itoa::Buffer::new().format(value));
        Ok(())
    }

    /// Writes a double.
    ///
    /// # Errors
    ///
    /// Fails for `NaN` and the infinities unless the writer allows them, and
    /// if a value is not allowed here.
    pub fn value_f64(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() && !self.allows_non_finite() {
            return Err(Error::illegal_use(format!(
                "Numeric values must be finite, but was {}",
                format_f64(value)
            )));
        }
        self.write_deferred_name()?;
        self.before_value()?;
        self.out.push_str(&format_f64(value));
        Ok(())
    }

    /// Writes pre-formatted numeric text as is.
    ///
    /// # Errors
    ///
    /// Fails for `NaN` and the infinities unless the writer allows them, and
    /// if a value is not allowed here.
    pub fn value_number(&mut self, text: &str) -> Result<()> {
        if matches!(text, "NaN" | "Infinity" | "-Infinity") && !self.allows_non_finite() {
            return Err(Error::illegal_use(format!(
                "Numeric values must be finite, but was {text}"
            )));
        }
        self.write_deferred_name()?;
        self.before_value()?;
        self.out.push_str(text);
        Ok(())
    }

    /// Writes `null`.
    ///
    /// With [`WriterOptions::serialize_nulls`] off, a pending name is dropped
    /// together with the null.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn null_value(&mut self) -> Result<()> {
        if self.deferred_name.is_some() {
            if self.options.serialize_nulls {
                self.write_deferred_name()?;
            } else {
                self.deferred_name = None;
                return Ok(());
            }
        }
        self.before_value()?;
        self.out.push_str("null");
        Ok(())
    }

    /// Writes `json` verbatim as the next value.
    ///
    /// The text is not validated.
    ///
    /// # Errors
    ///
    /// Fails if a value is not allowed here.
    pub fn raw_value(&mut self, json: &str) -> Result<()> {
        self.write_deferred_name()?;
        self.before_value()?;
        self.out.push_str(json);
        Ok(())
    }

    /// Checks that the writer is still open.
    ///
    /// The output lives in memory, so there is nothing else to flush.
    ///
    /// # Errors
    ///
    /// Fails once the writer is closed.
    pub fn flush(&mut self) -> Result<()> {
        self.top().map(|_| ())
    }

    /// Closes the writer. Closing a closed writer does nothing.
    ///
    /// # Errors
    ///
    /// Fails if containers are still open, a name is pending, or no value was
    /// written.
    pub fn close(&mut self) -> Result<()> {
        if self.stack.is_empty() {
            return Ok(());
        }
        if self.stack != [Scope::NonEmptyDocument] || self.deferred_name.is_some() {
            return Err(Error::illegal_use("Incomplete document"));
        }
        self.stack.clear();
        Ok(())
    }

    /// The text written so far.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.out
    }

    /// Closes the writer and returns the text.
    ///
    /// # Errors
    ///
    /// Same as [`close`](JsonWriter::close).
    pub fn into_string(mut self) -> Result<String> {
        self.close()?;
        Ok(self.out)
    }

    fn allows_non_finite(&self) -> bool {
        self.options.allow_non_finite || self.options.lenient
    }

    fn top(&self) -> Result<Scope> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| Error::illegal_use("JsonWriter is closed"))
    }

    fn replace_top(&mut self, scope: Scope) {
        if let Some(top) = self.stack.last_mut() {
            *top = scope;
        }
    }

    fn open(&mut self, scope: Scope, bracket: char) -> Result<()> {
        self.before_value()?;
        self.stack.push(scope);
        self.out.push(bracket);
        Ok(())
    }

    fn close_scope(&mut self, empty: Scope, non_empty: Scope, bracket: char) -> Result<()> {
        let context = self.top()?;
        if context != empty && context != non_empty {
            return Err(Error::illegal_use("Nesting problem"));
        }
        if let Some(name) = &self.deferred_name {
            return Err(Error::illegal_use(format!("Dangling name: {name}")));
        }
        self.stack.pop();
        if context == non_empty {
            self.newline();
        }
        self.out.push(bracket);
        Ok(())
    }

    fn write_deferred_name(&mut self) -> Result<()> {
        if let Some(name) = self.deferred_name.take() {
            self.before_name()?;
            self.string(&name);
        }
        Ok(())
    }

    fn before_name(&mut self) -> Result<()> {
        match self.top()? {
            Scope::NonEmptyObject => self.out.push(','),
            Scope::EmptyObject => {}
            _ => return Err(Error::illegal_use("Nesting problem")),
        }
        self.newline();
        self.replace_top(Scope::DanglingName);
        Ok(())
    }

    fn before_value(&mut self) -> Result<()> {
        match self.top()? {
            Scope::NonEmptyDocument if !self.options.lenient => Err(Error::illegal_use(
                "JSON must have only one top-level value",
            )),
            Scope::EmptyDocument | Scope::NonEmptyDocument => {
                self.replace_top(Scope::NonEmptyDocument);
                Ok(())
            }
            Scope::EmptyArray => {
                self.replace_top(Scope::NonEmptyArray);
                self.newline();
                Ok(())
            }
            Scope::NonEmptyArray => {
                self.out.push(',');
                self.newline();
                Ok(())
            }
            Scope::DanglingName => {
                self.out
                    .push_str(if self.options.indent.is_some() { ": " } else { ":" });
                self.replace_top(Scope::NonEmptyObject);
                Ok(())
            }
            Scope::EmptyObject | Scope::NonEmptyObject => Err(Error::illegal_use(
                "Expected a name before a value in an object",
            )),
        }
    }

    fn newline(&mut self) {
        let Some(indent) = &self.options.indent else {
            return;
        };
        self.out.push('\n');
        // the document scope sits at the bottom of the stack
        for _ in 1..self.stack.len() {
            self.out.push_str(indent);
        }
    }

    fn string(&mut self, value: &str) {
        self.out.push('"');
        // writing into a String cannot fail
        let _ = write_escaped_string(value, &mut self.out);
        self.out.push('"');
    }
}
