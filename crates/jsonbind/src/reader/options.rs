/// Configuration options for [`JsonStreamReader`](crate::JsonStreamReader).
///
/// # Examples
///
/// ```rust
/// use jsonbind::{JsonReader, JsonStreamReader, ReaderOptions};
///
/// let options = ReaderOptions {
///     lenient: true,
///     ..Default::default()
/// };
/// let mut reader = JsonStreamReader::with_options("{a: true}", options);
/// reader.begin_object()?;
/// assert_eq!(reader.next_name()?, "a");
/// assert!(reader.next_bool()?);
/// # Ok::<(), jsonbind::Error>(())
/// ```
///
/// # Default
///
/// The reader accepts RFC 8259 JSON only, nested at most
/// [`DEFAULT_MAX_DEPTH`](Self::DEFAULT_MAX_DEPTH) containers deep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Whether to accept the relaxed grammar.
    ///
    /// Lenient mode accepts, in addition to strict JSON:
    ///
    /// - unquoted and single-quoted names and strings,
    /// - end-of-line comments (`//`, `#`) and block comments (`/* */`),
    /// - `=` and `=>` between a name and its value,
    /// - `;` in place of `,`,
    /// - a trailing comma before `}`,
    /// - omitted array elements, read as `null` (`[1,,2]`, `[1,]`),
    /// - `NaN`, `Infinity` and `-Infinity`,
    /// - several top-level values,
    /// - `true`, `false` and `null` in any letter case,
    /// - the non-execute prefix `)]}'` followed by a newline,
    /// - raw control characters inside strings.
    ///
    /// # Default
    ///
    /// `false`
    pub lenient: bool,

    /// How many arrays and objects may be open at once.
    ///
    /// Opening one more fails with a structural error.
    ///
    /// # Default
    ///
    /// [`DEFAULT_MAX_DEPTH`](Self::DEFAULT_MAX_DEPTH)
    pub max_depth: usize,
}

impl ReaderOptions {
    /// The default nesting limit.
    pub const DEFAULT_MAX_DEPTH: usize = 128;
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            lenient: false,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
