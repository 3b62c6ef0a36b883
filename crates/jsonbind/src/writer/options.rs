/// Configuration options for [`JsonWriter`](crate::JsonWriter).
///
/// # Examples
///
/// ```rust
/// use jsonbind::{JsonWriter, WriterOptions};
///
/// let options = WriterOptions {
///     indent: Some("  ".to_owned()),
///     ..Default::default()
/// };
/// let mut writer = JsonWriter::with_options(options);
/// writer.begin_object()?;
/// writer.name("a")?;
/// writer.value_bool(true)?;
/// writer.end_object()?;
/// assert_eq!(writer.into_string()?, "{\n  \"a\": true\n}");
/// # Ok::<(), jsonbind::Error>(())
/// ```
///
/// # Default
///
/// Compact, strict output that writes nulls and rejects non-finite numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    /// String repeated once per nesting level when pretty-printing.
    ///
    /// When set, every element, name and closing bracket of a non-empty
    /// container starts on a new line, and names are followed by `": "`.
    /// Empty containers are still written as `[]` and `{}`.
    ///
    /// # Default
    ///
    /// `None` (compact output)
    pub indent: Option<String>,

    /// Whether to relax well-formedness checks.
    ///
    /// A lenient writer accepts several top-level values, written back to
    /// back, and non-finite numbers.
    ///
    /// # Default
    ///
    /// `false`
    pub lenient: bool,

    /// Whether `null` values are written for named properties.
    ///
    /// When `false`, [`JsonWriter::null_value`] after a name drops both the
    /// name and the null. Nulls inside arrays are always written.
    ///
    /// [`JsonWriter::null_value`]: crate::JsonWriter::null_value
    ///
    /// # Default
    ///
    /// `true`
    pub serialize_nulls: bool,

    /// Whether `NaN` and the infinities may be written, as the bare literals
    /// `NaN`, `Infinity` and `-Infinity`.
    ///
    /// # Default
    ///
    /// `false`
    pub allow_non_finite: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            indent: None,
            lenient: false,
            serialize_nulls: true,
            allow_non_finite: false,
        }
    }
}
