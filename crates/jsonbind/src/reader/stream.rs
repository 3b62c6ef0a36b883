//! Character-level JSON lexer behind [`JsonStreamReader`].
//!
//! The reader works over a fully materialized `&str`. Every call to
//! [`peek`](JsonReader::peek) lexes at most one token and caches it; consuming
//! calls take the cached token. Lexing failures restore the cursor and the
//! innermost scope, so a failed call can be retried at the same position.
//! [`skip_value`](JsonReader::skip_value) lexes many tokens and restores a
//! whole checkpoint instead.

use std::{borrow::Cow, ops::RangeInclusive};

use log::trace;

use super::{
    JsonReader, ReaderOptions, parse_f64, parse_i32, parse_i64, parse_i64_in, unexpected,
};
use crate::{
    error::{Error, Location, Result},
    token::JsonToken,
};

// ------------------------------------------------------------------------------------------------
// Lexer - scopes & tokens
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    EmptyArray,
    NonEmptyArray,
    EmptyObject,
    /// A name was read; the `:` and value are next.
    DanglingName,
    NonEmptyObject,
    EmptyDocument,
    NonEmptyDocument,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
enum Peeked<'src> {
    BeginObject,
    EndObject,
    BeginArray,
    EndArray,
    Name(Cow<'src, str>),
    String(Cow<'src, str>),
    /// Source text of the number.
    Number(&'src str),
    Boolean(bool),
    Null,
    EndDocument,
}

impl Peeked<'_> {
    fn token(&self) -> JsonToken {
        match self {
            Self::BeginObject => JsonToken::BeginObject,
            Self::EndObject => JsonToken::EndObject,
            Self::BeginArray => JsonToken::BeginArray,
            Self::EndArray => JsonToken::EndArray,
            Self::Name(_) => JsonToken::Name,
            Self::String(_) => JsonToken::String,
            Self::Number(_) => JsonToken::Number,
            Self::Boolean(_) => JsonToken::Boolean,
            Self::Null => JsonToken::Null,
            Self::EndDocument => JsonToken::EndDocument,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    /// Byte offset into the input.
    pos: usize,
    line: usize,
    /// Byte offset of the first character on `line`.
    line_start: usize,
}

/// Reader state saved before a call that consumes several tokens.
#[derive(Debug, Clone)]
struct Checkpoint<'src> {
    cursor: Cursor,
    token: Cursor,
    depth: usize,
    scope: Option<Scope>,
    peeked: Option<Peeked<'src>>,
}

const NON_EXECUTE_PREFIX: &[u8] = b")]}'\n";

/// A [`JsonReader`] over JSON text.
///
/// # Examples
///
/// ```
/// use jsonbind::{JsonReader, JsonStreamReader, JsonToken};
///
/// let mut reader = JsonStreamReader::new(r#"{"name": "Rex", "age": 3}"#);
/// reader.begin_object()?;
/// assert_eq!(reader.next_name()?, "name");
/// assert_eq!(reader.next_string()?, "Rex");
/// assert_eq!(reader.next_name()?, "age");
/// assert_eq!(reader.next_i32()?, 3);
/// reader.end_object()?;
/// assert_eq!(reader.peek()?, JsonToken::EndDocument);
/// # Ok::<(), jsonbind::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonStreamReader<'src> {
    input: &'src str,
    cursor: Cursor,
    scopes: Vec<Scope>,
    peeked: Option<Peeked<'src>>,
    /// Start of the most recently lexed token.
    token: Cursor,
    options: ReaderOptions,
}

impl<'src> JsonStreamReader<'src> {
    /// Creates a strict reader over `input`.
    #[must_use]
    pub fn new(input: &'src str) -> Self {
        Self::with_options(input, ReaderOptions::default())
    }

    /// Creates a reader over `input` with the given options.
    ///
    /// A leading byte order mark is skipped.
    #[must_use]
    pub fn with_options(input: &'src str, options: ReaderOptions) -> Self {
        let start = if input.starts_with('\u{feff}') {
            '\u{feff}'.len_utf8()
        } else {
            0
        };
        let cursor = Cursor {
            pos: start,
            line: 1,
            line_start: start,
        };
        Self {
            input,
            cursor,
            scopes: vec![Scope::EmptyDocument],
            peeked: None,
            token: cursor,
            options,
        }
    }

    /// Whether the relaxed grammar is accepted.
    #[must_use]
    pub fn is_lenient(&self) -> bool {
        self.options.lenient
    }

    /// The text being read.
    #[must_use]
    pub fn input(&self) -> &'src str {
        self.input
    }

    fn bytes(&self) -> &'src [u8] {
        self.input.as_bytes()
    }

    fn set_scope(&mut self, scope: Scope) {
        if let Some(top) = self.scopes.last_mut() {
            *top = scope;
        }
    }

    fn checkpoint(&self) -> Checkpoint<'src> {
        Checkpoint {
            cursor: self.cursor,
            token: self.token,
            depth: self.scopes.len(),
            scope: self.scopes.last().copied(),
            peeked: self.peeked.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint<'src>) {
        self.cursor = checkpoint.cursor;
        self.token = checkpoint.token;
        self.scopes.truncate(checkpoint.depth);
        if let Some(scope) = checkpoint.scope {
            self.set_scope(scope);
        }
        self.peeked = checkpoint.peeked;
    }

    fn peeked_token(&mut self) -> Result<JsonToken> {
        if let Some(peeked) = &self.peeked {
            return Ok(peeked.token());
        }
        let cursor = self.cursor;
        let scope = self.scopes.last().copied();
        match self.do_peek() {
            Ok(peeked) => {
                let token = peeked.token();
                trace!("lexed {token} at {}", self.location_of(self.token));
                self.peeked = Some(peeked);
                Ok(token)
            }
            Err(err) => {
                self.cursor = cursor;
                if let Some(scope) = scope {
                    self.set_scope(scope);
                }
                Err(err)
            }
        }
    }

    fn do_peek(&mut self) -> Result<Peeked<'src>> {
        let Some(&scope) = self.scopes.last() else {
            return Err(closed());
        };
        match scope {
            Scope::EmptyArray => self.set_scope(Scope::NonEmptyArray),
            Scope::NonEmptyArray => match self.next_non_whitespace()? {
                b']' => {
                    self.mark_token();
                    return Ok(Peeked::EndArray);
                }
                b';' => self.check_lenient()?,
                b',' => {}
                _ => return Err(self.syntax_error("Unterminated array")),
            },
            Scope::EmptyObject | Scope::NonEmptyObject => {
                self.set_scope(Scope::DanglingName);
                if scope == Scope::NonEmptyObject {
                    match self.next_non_whitespace()? {
                        b'}' => {
                            self.mark_token();
                            return Ok(Peeked::EndObject);
                        }
                        b';' => self.check_lenient()?,
                        b',' => {}
                        _ => return Err(self.syntax_error("Unterminated object")),
                    }
                }
                return self.peek_name(scope);
            }
            Scope::DanglingName => {
                self.set_scope(Scope::NonEmptyObject);
                match self.next_non_whitespace()? {
                    b':' => {}
                    b'=' => {
                        self.check_lenient()?;
                        if self.bytes().get(self.cursor.pos) == Some(&b'>') {
                            self.cursor.pos += 1;
                        }
                    }
                    _ => return Err(self.syntax_error("Expected ':'")),
                }
            }
            Scope::EmptyDocument => {
                if self.options.lenient {
                    self.consume_non_execute_prefix()?;
                }
                self.set_scope(Scope::NonEmptyDocument);
            }
            Scope::NonEmptyDocument => {
                if self.next_non_whitespace_or_eof()?.is_none() {
                    self.token = self.cursor;
                    return Ok(Peeked::EndDocument);
                }
                self.check_lenient()?;
                self.cursor.pos -= 1;
            }
            Scope::Closed => return Err(closed()),
        }

        let c = self.next_non_whitespace()?;
        self.mark_token();
        match c {
            b']' if scope == Scope::EmptyArray => Ok(Peeked::EndArray),
            // An omitted array element reads as null in lenient mode.
            b']' | b';' | b',' => {
                if matches!(scope, Scope::EmptyArray | Scope::NonEmptyArray) {
                    self.check_lenient()?;
                    self.cursor.pos -= 1;
                    Ok(Peeked::Null)
                } else {
                    Err(self.syntax_error("Unexpected value"))
                }
            }
            b'\'' => {
                self.check_lenient()?;
                Ok(Peeked::String(self.read_quoted(b'\'')?))
            }
            b'"' => Ok(Peeked::String(self.read_quoted(b'"')?)),
            b'[' => Ok(Peeked::BeginArray),
            b'{' => Ok(Peeked::BeginObject),
            _ => {
                self.cursor.pos -= 1;
                self.peek_literal()
            }
        }
    }

    fn peek_name(&mut self, scope: Scope) -> Result<Peeked<'src>> {
        let c = self.next_non_whitespace()?;
        self.mark_token();
        match c {
            b'"' => Ok(Peeked::Name(self.read_quoted(b'"')?)),
            b'\'' => {
                self.check_lenient()?;
                Ok(Peeked::Name(self.read_quoted(b'\'')?))
            }
            // `{}` always; `{"a":1,}` only leniently
            b'}' if scope == Scope::EmptyObject || self.options.lenient => Ok(Peeked::EndObject),
            b'}' => Err(self.syntax_error("Expected name")),
            _ => {
                self.check_lenient()?;
                self.cursor.pos -= 1;
                if is_literal(c) {
                    Ok(Peeked::Name(Cow::Borrowed(self.read_unquoted())))
                } else {
                    self.cursor.pos += 1;
                    Err(self.syntax_error("Expected name"))
                }
            }
        }
    }

    fn peek_literal(&mut self) -> Result<Peeked<'src>> {
        if let Some(keyword) = self.peek_keyword() {
            return Ok(keyword);
        }
        if let Some(len) = self.number_length() {
            let start = self.cursor.pos;
            self.cursor.pos += len;
            return Ok(Peeked::Number(&self.input[start..self.cursor.pos]));
        }
        let c = self.bytes()[self.cursor.pos];
        if !is_literal(c) {
            self.cursor.pos += 1;
            return Err(self.syntax_error("Expected value"));
        }
        if !self.options.lenient {
            self.cursor.pos += 1;
            return Err(self.syntax_error(MALFORMED));
        }
        let text = self.read_unquoted();
        Ok(match text {
            "NaN" | "Infinity" | "-Infinity" => Peeked::Number(text),
            _ => Peeked::String(Cow::Borrowed(text)),
        })
    }

    fn peek_keyword(&mut self) -> Option<Peeked<'src>> {
        let rest = &self.bytes()[self.cursor.pos..];
        let keywords: [(&[u8], Peeked<'src>); 3] = [
            (b"true".as_slice(), Peeked::Boolean(true)),
            (b"false".as_slice(), Peeked::Boolean(false)),
            (b"null".as_slice(), Peeked::Null),
        ];
        for (word, peeked) in keywords {
            let Some(candidate) = rest.get(..word.len()) else {
                continue;
            };
            let matched = if self.options.lenient {
                candidate.eq_ignore_ascii_case(word)
            } else {
                candidate == word
            };
            if !matched {
                continue;
            }
            // `truey` is not a keyword
            if rest.get(word.len()).is_some_and(|&b| is_literal(b)) {
                return None;
            }
            self.cursor.pos += word.len();
            return Some(peeked);
        }
        None
    }

    /// Length of an RFC 8259 number at the cursor, if one starts there and is
    /// not followed by more literal characters.
    fn number_length(&self) -> Option<usize> {
        let b = &self.bytes()[self.cursor.pos..];
        let digit = |i: usize| b.get(i).is_some_and(u8::is_ascii_digit);
        let mut i = 0;
        if b.first() == Some(&b'-') {
            i += 1;
        }
        match b.get(i) {
            Some(b'0') => i += 1,
            Some(b'1'..=b'9') => {
                while digit(i) {
                    i += 1;
                }
            }
            _ => return None,
        }
        if b.get(i) == Some(&b'.') {
            i += 1;
            if !digit(i) {
                return None;
            }
            while digit(i) {
                i += 1;
            }
        }
        if matches!(b.get(i), Some(b'e' | b'E')) {
            i += 1;
            if matches!(b.get(i), Some(b'+' | b'-')) {
                i += 1;
            }
            if !digit(i) {
                return None;
            }
            while digit(i) {
                i += 1;
            }
        }
        if b.get(i).is_some_and(|&c| is_literal(c)) {
            return None;
        }
        Some(i)
    }

    fn read_unquoted(&mut self) -> &'src str {
        let bytes = self.bytes();
        let start = self.cursor.pos;
        while bytes.get(self.cursor.pos).is_some_and(|&c| is_literal(c)) {
            self.cursor.pos += 1;
        }
        &self.input[start..self.cursor.pos]
    }

    /// Reads a string body up to the closing `quote`. The cursor is just past
    /// the opening quote.
    fn read_quoted(&mut self, quote: u8) -> Result<Cow<'src, str>> {
        let bytes = self.bytes();
        let input = self.input;
        let mut start = self.cursor.pos;
        let mut owned: Option<String> = None;
        loop {
            let Some(&c) = bytes.get(self.cursor.pos) else {
                return Err(self.syntax_error("Unterminated string"));
            };
            self.cursor.pos += 1;
            match c {
                _ if c == quote => {
                    let chunk = &input[start..self.cursor.pos - 1];
                    return Ok(match owned {
                        None => Cow::Borrowed(chunk),
                        Some(mut buf) => {
                            buf.push_str(chunk);
                            Cow::Owned(buf)
                        }
                    });
                }
                b'\\' => {
                    let buf = owned.get_or_insert_with(String::new);
                    buf.push_str(&input[start..self.cursor.pos - 1]);
                    buf.push(self.read_escape()?);
                    start = self.cursor.pos;
                }
                b'\n' if self.options.lenient => self.new_line(),
                0x00..=0x1f if !self.options.lenient => {
                    return Err(self.syntax_error("Unescaped control character in string"));
                }
                _ => {}
            }
        }
    }

    /// Decodes one escape sequence. The cursor is just past the backslash.
    fn read_escape(&mut self) -> Result<char> {
        let Some(&c) = self.bytes().get(self.cursor.pos) else {
            return Err(self.syntax_error("Unterminated escape sequence"));
        };
        self.cursor.pos += 1;
        Ok(match c {
            b'u' => return self.read_unicode_escape(),
            b't' => '\t',
            b'b' => '\u{8}',
            b'n' => '\n',
            b'r' => '\r',
            b'f' => '\u{c}',
            b'"' | b'\\' | b'/' => char::from(c),
            b'\'' if self.options.lenient => '\'',
            b'\n' if self.options.lenient => {
                self.new_line();
                '\n'
            }
            _ => return Err(self.syntax_error("Invalid escape sequence")),
        })
    }

    fn read_unicode_escape(&mut self) -> Result<char> {
        let unit = self.read_hex4()?;
        match unit {
            0xD800..=0xDBFF => {
                let resume = self.cursor.pos;
                if self.bytes()[resume..].starts_with(b"\\u") {
                    self.cursor.pos += 2;
                    let low = self.read_hex4()?;
                    if (0xDC00..=0xDFFF).contains(&low) {
                        let code = 0x1_0000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                        return char::from_u32(code)
                            .ok_or_else(|| self.syntax_error("Invalid escape sequence"));
                    }
                    self.cursor.pos = resume;
                }
                self.lone_surrogate()
            }
            0xDC00..=0xDFFF => self.lone_surrogate(),
            _ => char::from_u32(unit).ok_or_else(|| self.syntax_error("Invalid escape sequence")),
        }
    }

    fn lone_surrogate(&self) -> Result<char> {
        if self.options.lenient {
            Ok(char::REPLACEMENT_CHARACTER)
        } else {
            Err(self.syntax_error("Unpaired surrogate in escape sequence"))
        }
    }

    fn read_hex4(&mut self) -> Result<u32> {
        let start = self.cursor.pos;
        let Some(digits) = self.bytes().get(start..start + 4) else {
            self.cursor.pos = self.bytes().len();
            return Err(self.syntax_error("Unterminated escape sequence"));
        };
        let mut code = 0;
        for &digit in digits {
            self.cursor.pos += 1;
            let Some(value) = char::from(digit).to_digit(16) else {
                return Err(self.syntax_error("Malformed Unicode escape sequence"));
            };
            code = (code << 4) | value;
        }
        Ok(code)
    }

    fn next_non_whitespace(&mut self) -> Result<u8> {
        match self.next_non_whitespace_or_eof()? {
            Some(c) => Ok(c),
            None => Err(self.syntax_error("End of input")),
        }
    }

    /// Skips whitespace and, leniently, comments. Returns the next byte and
    /// moves past it.
    fn next_non_whitespace_or_eof(&mut self) -> Result<Option<u8>> {
        let bytes = self.bytes();
        while let Some(&c) = bytes.get(self.cursor.pos) {
            self.cursor.pos += 1;
            match c {
                b'\n' => self.new_line(),
                b' ' | b'\r' | b'\t' => {}
                b'/' => match bytes.get(self.cursor.pos) {
                    Some(b'*') => {
                        self.check_lenient()?;
                        self.cursor.pos += 1;
                        self.skip_block_comment()?;
                    }
                    Some(b'/') => {
                        self.check_lenient()?;
                        self.skip_to_end_of_line();
                    }
                    _ => return Ok(Some(c)),
                },
                b'#' => {
                    self.check_lenient()?;
                    self.skip_to_end_of_line();
                }
                _ => return Ok(Some(c)),
            }
        }
        Ok(None)
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let bytes = self.bytes();
        while let Some(&c) = bytes.get(self.cursor.pos) {
            self.cursor.pos += 1;
            if c == b'\n' {
                self.new_line();
            } else if c == b'*' && bytes.get(self.cursor.pos) == Some(&b'/') {
                self.cursor.pos += 1;
                return Ok(());
            }
        }
        Err(self.syntax_error("Unterminated comment"))
    }

    fn skip_to_end_of_line(&mut self) {
        let bytes = self.bytes();
        while let Some(&c) = bytes.get(self.cursor.pos) {
            self.cursor.pos += 1;
            if c == b'\n' {
                self.new_line();
                break;
            }
            if c == b'\r' {
                break;
            }
        }
    }

    fn consume_non_execute_prefix(&mut self) -> Result<()> {
        if self.next_non_whitespace_or_eof()?.is_none() {
            return Ok(());
        }
        self.cursor.pos -= 1;
        if self.bytes()[self.cursor.pos..].starts_with(NON_EXECUTE_PREFIX) {
            self.cursor.pos += NON_EXECUTE_PREFIX.len();
            self.new_line();
        }
        Ok(())
    }

    /// Called with the cursor just past a `\n`.
    fn new_line(&mut self) {
        self.cursor.line += 1;
        self.cursor.line_start = self.cursor.pos;
    }

    /// Records the byte just consumed as the start of the current token.
    fn mark_token(&mut self) {
        self.token = Cursor {
            pos: self.cursor.pos - 1,
            ..self.cursor
        };
    }

    fn check_lenient(&self) -> Result<()> {
        if self.options.lenient {
            Ok(())
        } else {
            Err(self.syntax_error(MALFORMED))
        }
    }

    // --------------------------------------------------------------------------------------------
    // Errors
    // --------------------------------------------------------------------------------------------

    fn location_of(&self, cursor: Cursor) -> Location {
        let line = &self.bytes()[cursor.line_start.min(cursor.pos)..cursor.pos];
        // count characters, not bytes
        let column = line.iter().filter(|&&b| (b & 0xC0) != 0x80).count();
        Location {
            line: cursor.line,
            column: column + 1,
        }
    }

    /// An error at the character just consumed.
    fn syntax_error(&self, msg: &str) -> Error {
        let mut location = self.location_of(self.cursor);
        location.column = location.column.saturating_sub(1).max(1);
        Error::structural(msg).at(Some(location))
    }

    fn mismatch(&self, expected: JsonToken, actual: JsonToken) -> Error {
        unexpected(expected, actual).at(Some(self.location_of(self.token)))
    }

    /// Consumes the token opening a container and enters `scope`.
    fn open(&mut self, expected: JsonToken, scope: Scope) -> Result<()> {
        self.expect(expected)?;
        // the document scope is not a container
        if self.scopes.len() > self.options.max_depth {
            return Err(Error::structural(format!(
                "Nesting exceeds the maximum depth of {}",
                self.options.max_depth
            ))
            .at(Some(self.location_of(self.token))));
        }
        self.scopes.push(scope);
        self.peeked = None;
        Ok(())
    }

    fn skip_nested(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peeked_token()? {
                JsonToken::BeginArray => {
                    self.begin_array()?;
                    depth += 1;
                }
                JsonToken::BeginObject => {
                    self.begin_object()?;
                    depth += 1;
                }
                JsonToken::EndArray if depth > 0 => {
                    self.end_array()?;
                    depth -= 1;
                }
                JsonToken::EndObject if depth > 0 => {
                    self.end_object()?;
                    depth -= 1;
                }
                token @ (JsonToken::EndArray | JsonToken::EndObject | JsonToken::EndDocument) => {
                    return Err(Error::structural(format!("Expected a value but was {token}"))
                        .at(Some(self.location_of(self.token))));
                }
                _ => self.peeked = None,
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    fn expect(&mut self, expected: JsonToken) -> Result<()> {
        let token = self.peeked_token()?;
        if token == expected {
            Ok(())
        } else {
            Err(self.mismatch(expected, token))
        }
    }

    /// Text of the peeked number or string, for the numeric accessors.
    fn numeric_text(&mut self) -> Result<&str> {
        let token = self.peeked_token()?;
        match &self.peeked {
            Some(Peeked::Number(text)) => Ok(*text),
            Some(Peeked::String(text)) => Ok(text.as_ref()),
            _ => Err(self.mismatch(JsonToken::Number, token)),
        }
    }
}

const MALFORMED: &str = "Malformed JSON; enable lenient mode to accept it";

fn closed() -> Error {
    Error::illegal_use("JsonReader is closed")
}

fn is_literal(c: u8) -> bool {
    !matches!(
        c,
        b'/' | b'\\'
            | b';'
            | b'#'
            | b'='
            | b'{'
            | b'}'
            | b'['
            | b']'
            | b':'
            | b','
            | b' '
            | b'\t'
            | b'\x0c'
            | b'\r'
            | b'\n'
    )
}

impl JsonReader for JsonStreamReader<'_> {
    fn begin_array(&mut self) -> Result<()> {
        self.open(JsonToken::BeginArray, Scope::EmptyArray)
    }

    fn end_array(&mut self) -> Result<()> {
        self.expect(JsonToken::EndArray)?;
        self.scopes.pop();
        self.peeked = None;
        Ok(())
    }

    fn begin_object(&mut self) -> Result<()> {
        self.open(JsonToken::BeginObject, Scope::EmptyObject)
    }

    fn end_object(&mut self) -> Result<()> {
        self.expect(JsonToken::EndObject)?;
        self.scopes.pop();
        self.peeked = None;
        Ok(())
    }

    fn peek(&mut self) -> Result<JsonToken> {
        self.peeked_token()
    }

    fn next_name(&mut self) -> Result<String> {
        let token = self.peeked_token()?;
        match self.peeked.take() {
            Some(Peeked::Name(name)) => Ok(name.into_owned()),
            other => {
                self.peeked = other;
                Err(self.mismatch(JsonToken::Name, token))
            }
        }
    }

    fn next_string(&mut self) -> Result<String> {
        let token = self.peeked_token()?;
        match self.peeked.take() {
            Some(Peeked::String(value)) => Ok(value.into_owned()),
            Some(Peeked::Number(text)) => Ok(text.to_owned()),
            other => {
                self.peeked = other;
                Err(self.mismatch(JsonToken::String, token))
            }
        }
    }

    fn next_bool(&mut self) -> Result<bool> {
        let token = self.peeked_token()?;
        match self.peeked {
            Some(Peeked::Boolean(value)) => {
                self.peeked = None;
                Ok(value)
            }
            _ => Err(self.mismatch(JsonToken::Boolean, token)),
        }
    }

    fn next_null(&mut self) -> Result<()> {
        self.expect(JsonToken::Null)?;
        self.peeked = None;
        Ok(())
    }

    fn next_f64(&mut self) -> Result<f64> {
        let lenient = self.options.lenient;
        let parsed = parse_f64(self.numeric_text()?, lenient);
        let value = parsed.map_err(|err| err.at(Some(self.location_of(self.token))))?;
        self.peeked = None;
        Ok(value)
    }

    fn next_i64(&mut self) -> Result<i64> {
        let parsed = parse_i64(self.numeric_text()?);
        let value = parsed.map_err(|err| err.at(Some(self.location_of(self.token))))?;
        self.peeked = None;
        Ok(value)
    }

    fn next_i32(&mut self) -> Result<i32> {
        let parsed = parse_i32(self.numeric_text()?);
        let value = parsed.map_err(|err| err.at(Some(self.location_of(self.token))))?;
        self.peeked = None;
        Ok(value)
    }

    fn next_i64_in(&mut self, range: RangeInclusive<i64>) -> Result<i64> {
        let parsed = parse_i64_in(self.numeric_text()?, &range);
        let value = parsed.map_err(|err| err.at(Some(self.location_of(self.token))))?;
        self.peeked = None;
        Ok(value)
    }

    fn skip_value(&mut self) -> Result<()> {
        let checkpoint = self.checkpoint();
        let result = self.skip_nested();
        if result.is_err() {
            self.restore(checkpoint);
        }
        result
    }

    fn next_value(&mut self) -> Result<String> {
        let token = self.peeked_token()?;
        if !token.is_value_start() {
            return Err(Error::structural(format!("Expected a value but was {token}"))
                .at(Some(self.location_of(self.token))));
        }
        // an omitted lenient array element has no text of its own
        if token == JsonToken::Null {
            self.peeked = None;
            return Ok("null".to_owned());
        }
        let start = self.token.pos;
        self.skip_value()?;
        Ok(self.input[start..self.cursor.pos].to_owned())
    }

    fn close(&mut self) {
        self.peeked = None;
        self.scopes.clear();
        self.scopes.push(Scope::Closed);
    }

    fn location(&self) -> Option<Location> {
        if self.peeked.is_some() {
            Some(self.location_of(self.token))
        } else {
            Some(self.location_of(self.cursor))
        }
    }
}
