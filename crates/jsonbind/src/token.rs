use core::fmt;

/// A lexical unit of a JSON stream, as reported by [`JsonReader::peek`].
///
/// [`JsonReader::peek`]: crate::JsonReader::peek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonToken {
    /// `{`
    BeginObject,
    /// `}`
    EndObject,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// A property name inside an object.
    Name,
    /// A string value.
    String,
    /// A numeric value.
    Number,
    /// `true` or `false`.
    Boolean,
    /// `null`.
    Null,
    /// End of the input.
    EndDocument,
}

impl JsonToken {
    /// Returns `true` for tokens that start or are a complete value.
    #[must_use]
    pub fn is_value_start(self) -> bool {
        !matches!(
            self,
            Self::EndObject | Self::EndArray | Self::Name | Self::EndDocument
        )
    }
}

impl fmt::Display for JsonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeginObject => "BEGIN_OBJECT",
            Self::EndObject => "END_OBJECT",
            Self::BeginArray => "BEGIN_ARRAY",
            Self::EndArray => "END_ARRAY",
            Self::Name => "NAME",
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
            Self::Null => "NULL",
            Self::EndDocument => "END_DOCUMENT",
        })
    }
}
