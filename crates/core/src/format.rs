//! Compact field-format strings
//!
//! A composite record format is an optional byte-order marker followed by
//! a sequence of field tokens, each an optional repeat count and a single
//! type character:
//!
//! ```text
//! format := [endian] token*
//! endian := '@' | '=' | '<' | '>' | '!'
//! token  := [count] type
//! ```
//!
//! For example `<d?3f3sb` is a little-endian record of an 8-byte float,
//! a bool, three 4-byte floats, a 3-byte string and a signed byte.
//!
//! Parsing goes through [`Tokenizer`], which yields a typed lexeme stream;
//! [`FormatString::parse`] enforces the grammar on top of it. No alignment
//! padding is ever inserted, so [`calcsize`] is a plain sum of token widths.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Largest record or token size in bytes
pub const MAX_RECORD_SIZE: usize = isize::MAX as usize;

/// Byte order of every multi-byte field in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endian {
    /// Host byte order with native widths (`@` or no marker)
    Native,
    /// Host byte order with standard widths (`=`)
    Standard,
    /// Little endian with standard widths (`<`)
    #[default]
    Little,
    /// Big endian with standard widths (`>` or `!`)
    Big,
}

impl Endian {
    /// Marker rendered in front of a composite format. Native renders empty.
    pub fn marker(&self) -> &'static str {
        match self {
            Endian::Native => "",
            Endian::Standard => "=",
            Endian::Little => "<",
            Endian::Big => ">",
        }
    }

    /// Map a marker character to its byte order
    pub fn from_marker(c: char) -> Option<Endian> {
        match c {
            '@' => Some(Endian::Native),
            '=' => Some(Endian::Standard),
            '<' => Some(Endian::Little),
            '>' | '!' => Some(Endian::Big),
            _ => None,
        }
    }

    /// Whether multi-byte fields are stored least significant byte first
    pub fn is_little(&self) -> bool {
        match self {
            Endian::Native | Endian::Standard => cfg!(target_endian = "little"),
            Endian::Little => true,
            Endian::Big => false,
        }
    }
}

impl FromStr for Endian {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Ok(Endian::Native),
            (Some(c), None) => Endian::from_marker(c)
                .ok_or_else(|| Error::schema(format!("unknown byte order marker '{}'", s))),
            _ => Err(Error::schema(format!("unknown byte order marker '{}'", s))),
        }
    }
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Primitive type of a field token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// `c`: one byte, decoded as a 1-byte string
    Char,
    /// `b`
    I8,
    /// `B`
    U8,
    /// `?`
    Bool,
    /// `h`
    I16,
    /// `H`
    U16,
    /// `i`
    I32,
    /// `I`
    U32,
    /// `l`: 4 bytes, or the platform C long under native byte order
    Long,
    /// `L`
    ULong,
    /// `q`
    I64,
    /// `Q`
    U64,
    /// `e`: IEEE-754 half precision
    F16,
    /// `f`
    F32,
    /// `d`
    F64,
    /// `s`: fixed-length byte string, the count is its length
    Bytes,
}

impl TypeCode {
    /// Parse a type character
    pub fn from_char(c: char) -> Option<TypeCode> {
        Some(match c {
            'c' => TypeCode::Char,
            'b' => TypeCode::I8,
            'B' => TypeCode::U8,
            '?' => TypeCode::Bool,
            'h' => TypeCode::I16,
            'H' => TypeCode::U16,
            'i' => TypeCode::I32,
            'I' => TypeCode::U32,
            'l' => TypeCode::Long,
            'L' => TypeCode::ULong,
            'q' => TypeCode::I64,
            'Q' => TypeCode::U64,
            'e' => TypeCode::F16,
            'f' => TypeCode::F32,
            'd' => TypeCode::F64,
            's' => TypeCode::Bytes,
            _ => return None,
        })
    }

    /// The type character
    pub fn as_char(&self) -> char {
        match self {
            TypeCode::Char => 'c',
            TypeCode::I8 => 'b',
            TypeCode::U8 => 'B',
            TypeCode::Bool => '?',
            TypeCode::I16 => 'h',
            TypeCode::U16 => 'H',
            TypeCode::I32 => 'i',
            TypeCode::U32 => 'I',
            TypeCode::Long => 'l',
            TypeCode::ULong => 'L',
            TypeCode::I64 => 'q',
            TypeCode::U64 => 'Q',
            TypeCode::F16 => 'e',
            TypeCode::F32 => 'f',
            TypeCode::F64 => 'd',
            TypeCode::Bytes => 's',
        }
    }

    /// Width in bytes of one element under the given byte order
    pub fn width(&self, endian: Endian) -> usize {
        match self {
            TypeCode::Char | TypeCode::I8 | TypeCode::U8 | TypeCode::Bool | TypeCode::Bytes => 1,
            TypeCode::I16 | TypeCode::U16 | TypeCode::F16 => 2,
            TypeCode::I32 | TypeCode::U32 | TypeCode::F32 => 4,
            TypeCode::Long | TypeCode::ULong => match endian {
                Endian::Native => std::mem::size_of::<std::os::raw::c_long>(),
                Endian::Standard | Endian::Little | Endian::Big => 4,
            },
            TypeCode::I64 | TypeCode::U64 | TypeCode::F64 => 8,
        }
    }

    /// Signed integer types
    pub fn is_signed_int(&self) -> bool {
        matches!(
            self,
            TypeCode::I8 | TypeCode::I16 | TypeCode::I32 | TypeCode::Long | TypeCode::I64
        )
    }

    /// Unsigned integer types
    pub fn is_unsigned_int(&self) -> bool {
        matches!(
            self,
            TypeCode::U8 | TypeCode::U16 | TypeCode::U32 | TypeCode::ULong | TypeCode::U64
        )
    }

    /// Floating point types
    pub fn is_float(&self) -> bool {
        matches!(self, TypeCode::F16 | TypeCode::F32 | TypeCode::F64)
    }
}

/// One field token: repeat count plus type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatToken {
    /// Repeat count (string length for `s`)
    pub count: usize,
    /// Element type
    pub code: TypeCode,
}

impl FormatToken {
    /// Create a token
    pub fn new(count: usize, code: TypeCode) -> Self {
        FormatToken { count, code }
    }

    /// Byte width of the whole token
    ///
    /// Tokens from [`FormatString::parse`] always fit; use
    /// [`FormatToken::checked_size`] for hand-built ones.
    pub fn size(&self, endian: Endian) -> usize {
        self.count.saturating_mul(self.code.width(endian))
    }

    /// Byte width of the whole token, failing past [`MAX_RECORD_SIZE`]
    pub fn checked_size(&self, endian: Endian) -> Result<usize> {
        self.count
            .checked_mul(self.code.width(endian))
            .filter(|&n| n <= MAX_RECORD_SIZE)
            .ok_or_else(|| Error::schema(format!("token '{}' is too long", self)))
    }

    /// Whether the token decodes to several values (carried as `Value::Array`)
    pub fn is_repeated(&self) -> bool {
        self.code != TypeCode::Bytes && self.count > 1
    }

    /// Parse a string holding exactly one token and no byte-order marker
    pub fn parse_single(s: &str) -> Result<FormatToken> {
        let parsed = FormatString::parse(s)?;
        if parsed.has_marker {
            return Err(Error::schema(format!(
                "field format '{}' must not carry a byte order marker",
                s
            )));
        }
        match parsed.tokens.as_slice() {
            [token] => Ok(*token),
            _ => Err(Error::schema(format!(
                "field format '{}' must be exactly one token, found {}",
                s,
                parsed.tokens.len()
            ))),
        }
    }
}

impl fmt::Display for FormatToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 && self.code != TypeCode::Bytes {
            write!(f, "{}", self.code.as_char())
        } else {
            write!(f, "{}{}", self.count, self.code.as_char())
        }
    }
}

/// Lexeme produced by [`Tokenizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme {
    /// Byte-order marker at `position`
    Endian {
        /// Character index in the source string
        position: usize,
        /// Parsed byte order
        endian: Endian,
    },
    /// Field token at `position`
    Token {
        /// Character index in the source string
        position: usize,
        /// Parsed token
        token: FormatToken,
    },
}

/// Explicit scanner over a format string
///
/// Whitespace between tokens is skipped. A count must be followed by a
/// type character.
pub struct Tokenizer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    source: &'a str,
}

impl<'a> Tokenizer<'a> {
    /// Start scanning `source`
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            chars: source.char_indices().peekable(),
            source,
        }
    }

    fn read_count(&mut self, first: char) -> Result<usize> {
        let mut count = first.to_digit(10).map(|d| d as usize).unwrap_or(0);
        while let Some(&(_, c)) = self.chars.peek() {
            let Some(digit) = c.to_digit(10) else { break };
            count = count
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit as usize))
                .ok_or_else(|| {
                    Error::schema(format!("repeat count overflows in '{}'", self.source))
                })?;
            self.chars.next();
        }
        Ok(count)
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Lexeme>;

    fn next(&mut self) -> Option<Self::Item> {
        let (position, c) = loop {
            let (position, c) = self.chars.next()?;
            if !c.is_whitespace() {
                break (position, c);
            }
        };

        if let Some(endian) = Endian::from_marker(c) {
            return Some(Ok(Lexeme::Endian { position, endian }));
        }

        let count = if c.is_ascii_digit() {
            let count = match self.read_count(c) {
                Ok(count) => count,
                Err(e) => return Some(Err(e)),
            };
            match self.chars.next() {
                Some((_, type_char)) => return Some(self.finish_token(position, count, type_char)),
                None => {
                    return Some(Err(Error::schema(format!(
                        "repeat count without a type in '{}'",
                        self.source
                    ))))
                }
            }
        } else {
            1
        };

        Some(self.finish_token(position, count, c))
    }
}

impl Tokenizer<'_> {
    fn finish_token(&self, position: usize, count: usize, type_char: char) -> Result<Lexeme> {
        let code = TypeCode::from_char(type_char).ok_or_else(|| {
            Error::schema(format!(
                "unsupported format character '{}' in '{}'",
                type_char, self.source
            ))
        })?;
        if count == 0 {
            return Err(Error::schema(format!(
                "zero repeat count in '{}'",
                self.source
            )));
        }
        let token = FormatToken::new(count, code);
        // Native widths are the widest of every byte order.
        token.checked_size(Endian::Native)?;
        Ok(Lexeme::Token { position, token })
    }
}

/// Parsed composite format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatString {
    endian: Endian,
    has_marker: bool,
    tokens: Vec<FormatToken>,
}

impl FormatString {
    /// Build from parts
    pub fn new(endian: Endian, tokens: Vec<FormatToken>) -> Self {
        FormatString {
            endian,
            has_marker: endian != Endian::Native,
            tokens,
        }
    }

    /// Parse a composite format string
    pub fn parse(source: &str) -> Result<FormatString> {
        let mut endian = Endian::Native;
        let mut has_marker = false;
        let mut tokens = Vec::new();

        for lexeme in Tokenizer::new(source) {
            match lexeme? {
                Lexeme::Endian { position, endian: e } => {
                    if has_marker || !tokens.is_empty() {
                        return Err(Error::schema(format!(
                            "byte order marker at position {} of '{}' must come first",
                            position, source
                        )));
                    }
                    endian = e;
                    has_marker = true;
                }
                Lexeme::Token { token, .. } => tokens.push(token),
            }
        }

        calcsize(&tokens, endian)?;
        Ok(FormatString {
            endian,
            has_marker,
            tokens,
        })
    }

    /// Byte order of the record
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Field tokens in declaration order
    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    /// Total record size
    pub fn size(&self) -> Result<usize> {
        calcsize(&self.tokens, self.endian)
    }
}

impl FromStr for FormatString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FormatString::parse(s)
    }
}

impl fmt::Display for FormatString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endian.marker())?;
        for token in &self.tokens {
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

/// Size in bytes of a token sequence. No padding is inserted.
///
/// Fails with `Schema` when the total exceeds [`MAX_RECORD_SIZE`].
pub fn calcsize(tokens: &[FormatToken], endian: Endian) -> Result<usize> {
    tokens.iter().try_fold(0usize, |total, token| {
        total
            .checked_add(token.checked_size(endian)?)
            .filter(|&n| n <= MAX_RECORD_SIZE)
            .ok_or_else(|| Error::schema("total record size is too long"))
    })
}
