//! Error types shared by the reader, the writer and the binding engines.

use core::fmt;

use thiserror::Error;

/// What went wrong.
///
/// Every failure raised by this crate carries one of these kinds. The variants
/// map one-to-one onto the failure classes a caller may want to react to; the
/// human readable message is part of the variant payload.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed nesting, premature end of input, a token of the wrong kind, or
    /// a lexical error.
    #[error("{0}")]
    Structural(String),
    /// A numeric value that cannot be represented with the requested width.
    #[error("{0}")]
    NumberFormat(String),
    /// A property name the bean does not declare, with unknown properties
    /// treated as failures.
    #[error("Unknown property '{0}'")]
    UnknownProperty(String),
    /// One or more required properties were absent when the object closed.
    #[error("Required properties are missing: [{}]", .0.join(", "))]
    MissingRequiredProperties(Vec<String>),
    /// An object id that refers to no instance read so far.
    #[error("Cannot find an object with id {0}")]
    ReferenceResolution(String),
    /// A discriminator or runtime type without a matching subtype codec.
    #[error("{0}")]
    SubtypeResolution(String),
    /// API misuse: a value without a name, two names in a row, a closed stream.
    #[error("{0}")]
    IllegalUse(String),
    /// The codec graph for a type could not be built.
    #[error("{0}")]
    Codec(String),
}

/// A position in the source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number, starting at 1.
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An error raised while reading, writing or binding JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    location: Option<Location>,
}

impl Error {
    /// Creates an error without a source location.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub(crate) fn structural(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Structural(msg.into()))
    }

    pub(crate) fn number_format(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NumberFormat(msg.into()))
    }

    pub(crate) fn illegal_use(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalUse(msg.into()))
    }

    pub(crate) fn subtype(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SubtypeResolution(msg.into()))
    }

    pub(crate) fn codec(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Codec(msg.into()))
    }

    /// Attaches a source location unless one is already present.
    #[must_use]
    pub fn at(mut self, location: Option<Location>) -> Self {
        if self.location.is_none() {
            self.location = location;
        }
        self
    }

    /// Maps the location of an error raised while re-reading a snippet of the
    /// source onto the source, given where the snippet starts there.
    ///
    /// Without an `origin` the source has no positions and the location is
    /// dropped.
    #[must_use]
    pub(crate) fn relocated(mut self, origin: Option<Location>) -> Self {
        self.location = origin.map(|origin| match self.location {
            None => origin,
            Some(inner) if inner.line == 1 => Location {
                line: origin.line,
                column: origin.column + inner.column - 1,
            },
            Some(inner) => Location {
                line: origin.line + inner.line - 1,
                column: inner.column,
            },
        });
        self
    }

    /// The kind of failure.
    #[must_use]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Where in the source text the failure was detected, when known.
    #[must_use]
    pub fn location(&self) -> Option<Location> {
        self.location
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{} at {location}", self.kind),
            None => self.kind.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
