//! Record schema
//!
//! A [`Schema`] is an ordered list of [`FieldDescriptor`]s plus a byte
//! order. Construction validates that keys are unique, that each field
//! format is a single token, and that every declared `size` matches the
//! width its token implies under the active byte order. The composite
//! format, record size and [`OffsetTable`] are derived once and cached;
//! a schema is immutable afterwards; deriving a variant (projection,
//! recovery) builds a new one.

use crate::error::{Error, Result};
use crate::format::{Endian, FormatString, FormatToken};
use crate::offsets::OffsetCalculator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One named field as declared in a table header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name, unique within a schema
    pub key: String,
    /// Single format token, e.g. `d` or `6s`
    pub format: String,
    /// Byte width implied by `format`
    pub size: usize,
}

impl FieldDescriptor {
    /// Create a descriptor
    pub fn new(key: impl Into<String>, format: impl Into<String>, size: usize) -> Self {
        FieldDescriptor {
            key: key.into(),
            format: format.into(),
            size,
        }
    }
}

/// Location of one field inside a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetEntry {
    /// Field key
    pub key: String,
    /// Byte offset from the start of the record
    pub offset: usize,
    /// Byte width
    pub size: usize,
}

/// Ordered `(key, offset, size)` triples for a schema
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OffsetTable {
    entries: Vec<OffsetEntry>,
}

impl OffsetTable {
    /// All entries in declaration order
    pub fn entries(&self) -> &[OffsetEntry] {
        &self.entries
    }

    /// Look up one field
    pub fn get(&self, key: &str) -> Option<&OffsetEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Offsets in declaration order
    pub fn offsets(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.offset).collect()
    }

    /// Sizes in declaration order
    pub fn sizes(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.size).collect()
    }
}

/// Validated record layout
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
    tokens: Vec<FormatToken>,
    endian: Endian,
    record_size: usize,
    offsets: OffsetTable,
}

impl Schema {
    /// Build a schema from descriptors and a byte order
    pub fn new(fields: Vec<FieldDescriptor>, endian: Endian) -> Result<Self> {
        Self::validate_unique_keys(&fields)?;
        let tokens = Self::parse_tokens(&fields, endian)?;

        let format = FormatString::new(endian, tokens.clone());
        let calc = OffsetCalculator::new(&format)?;
        let entries = fields
            .iter()
            .zip(calc.offsets().iter().zip(calc.sizes()))
            .map(|(field, (&offset, size))| OffsetEntry {
                key: field.key.clone(),
                offset,
                size,
            })
            .collect();

        Ok(Schema {
            fields,
            tokens,
            endian,
            record_size: calc.record_size(),
            offsets: OffsetTable { entries },
        })
    }

    /// Composite format and record size for `fields` under `endian`
    ///
    /// Fails when a declared size disagrees with its token's width.
    pub fn compose(fields: &[FieldDescriptor], endian: Endian) -> Result<(String, usize)> {
        let tokens = Self::parse_tokens(fields, endian)?;
        let format = FormatString::new(endian, tokens);
        let size = format.size()?;
        Ok((format.to_string(), size))
    }

    /// Fail on the first duplicated key
    pub fn validate_unique_keys(fields: &[FieldDescriptor]) -> Result<()> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in fields {
            if !seen.insert(field.key.as_str()) {
                return Err(Error::schema(format!("duplicate field key '{}'", field.key)));
            }
        }
        Ok(())
    }

    fn parse_tokens(fields: &[FieldDescriptor], endian: Endian) -> Result<Vec<FormatToken>> {
        fields
            .iter()
            .map(|field| {
                let token = FormatToken::parse_single(&field.format).map_err(|e| {
                    Error::schema(format!("field '{}': {}", field.key, e))
                })?;
                let implied = token
                    .checked_size(endian)
                    .map_err(|e| Error::schema(format!("field '{}': {}", field.key, e)))?;
                if implied != field.size {
                    return Err(Error::schema(format!(
                        "field '{}' declares size {} but format '{}' is {} bytes",
                        field.key, field.size, field.format, implied
                    )));
                }
                Ok(token)
            })
            .collect()
    }

    /// Field descriptors in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Parsed token of every field
    pub fn tokens(&self) -> &[FormatToken] {
        &self.tokens
    }

    /// Field keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Byte order
    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Bytes per record
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Cached offset table
    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    /// Composite format including the byte-order marker
    pub fn format(&self) -> String {
        self.format_string().to_string()
    }

    /// Composite format as a parsed value
    pub fn format_string(&self) -> FormatString {
        FormatString::new(self.endian, self.tokens.clone())
    }

    /// Position of a field by key
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }

    /// Schema of the selected keys, kept in declaration order
    ///
    /// The caller's ordering of `keys` is ignored. Unknown keys fail with
    /// `InvalidColumn`.
    pub fn project<S: AsRef<str>>(&self, keys: &[S]) -> Result<Schema> {
        for key in keys {
            if self.index_of(key.as_ref()).is_none() {
                return Err(Error::invalid_column(format!(
                    "'{}' is not a field of this table",
                    key.as_ref()
                )));
            }
        }
        let selected = self
            .fields
            .iter()
            .filter(|f| keys.iter().any(|k| k.as_ref() == f.key))
            .cloned()
            .collect();
        Schema::new(selected, self.endian)
    }

    /// Same fields with a different byte order
    pub fn with_endian(&self, endian: Endian) -> Result<Schema> {
        Schema::new(self.fields.clone(), endian)
    }
}
