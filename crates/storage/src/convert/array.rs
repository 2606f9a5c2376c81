//! Typed structured arrays
//!
//! A [`StructuredArray`] keeps the record bytes as they are and attaches a
//! typed description of every field: element kind, width, byte order and,
//! for repeated tokens, a one-dimensional sub-array shape. Field types are
//! rendered as array-protocol type strings such as `<f8`, `|b1` or `|S5`.
//!
//! Half-precision (`e`) fields have no element type here and are reported
//! as a format interpretation failure.

use super::check_whole_records;
use crate::codec::decode_token;
use byteorder::{BigEndian, LittleEndian};
use recstore_core::{Endian, Error, FormatToken, Result, Schema, TypeCode, Value};
use std::fmt;

/// Element category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// One-byte boolean
    Bool,
    /// Signed integer
    Int,
    /// Unsigned integer
    UInt,
    /// IEEE-754 float
    Float,
    /// Fixed-length byte string
    Bytes,
}

impl ElementKind {
    fn code(&self) -> char {
        match self {
            ElementKind::Bool => 'b',
            ElementKind::Int => 'i',
            ElementKind::UInt => 'u',
            ElementKind::Float => 'f',
            ElementKind::Bytes => 'S',
        }
    }
}

/// Element type of one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementType {
    /// Category
    pub kind: ElementKind,
    /// Width of one element in bytes
    pub width: usize,
    /// Byte order, `None` where order does not apply
    pub little: Option<bool>,
}

impl ElementType {
    /// Element type for `token`, or a format interpretation error
    pub fn from_token(token: FormatToken, endian: Endian) -> Result<Self> {
        let kind = match token.code {
            TypeCode::Bool => ElementKind::Bool,
            TypeCode::Char | TypeCode::Bytes => ElementKind::Bytes,
            TypeCode::F32 | TypeCode::F64 => ElementKind::Float,
            TypeCode::F16 => {
                return Err(Error::format_interpretation(format!(
                    "token '{}' has no typed array element type",
                    token
                )))
            }
            c if c.is_signed_int() => ElementKind::Int,
            _ => ElementKind::UInt,
        };
        let width = match token.code {
            TypeCode::Bytes => token.count,
            code => code.width(endian),
        };
        let little = (width > 1 && kind != ElementKind::Bytes).then(|| endian.is_little());
        Ok(ElementType {
            kind,
            width,
            little,
        })
    }

    /// Array-protocol type string, e.g. `<i4`
    pub fn descr(&self) -> String {
        let order = match self.little {
            None => '|',
            Some(true) => '<',
            Some(false) => '>',
        };
        format!("{}{}{}", order, self.kind.code(), self.width)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descr())
    }
}

/// One named field of a structured array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayField {
    /// Field key
    pub name: String,
    /// Element type
    pub dtype: ElementType,
    /// Sub-array shape, empty for scalars
    pub shape: Vec<usize>,
    /// Byte offset within a record
    pub offset: usize,
    token: FormatToken,
}

impl ArrayField {
    /// Bytes occupied in each record
    pub fn size(&self) -> usize {
        self.dtype.width * self.shape.iter().product::<usize>()
    }
}

/// Record bytes plus a typed field description
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredArray {
    fields: Vec<ArrayField>,
    itemsize: usize,
    endian: Endian,
    data: Vec<u8>,
}

impl StructuredArray {
    /// Interpret `bytes` as whole records laid out by `schema`
    pub fn from_bytes(bytes: &[u8], schema: &Schema) -> Result<Self> {
        let endian = schema.endian();
        let mut fields = Vec::with_capacity(schema.len());
        for ((token, entry), field) in schema
            .tokens()
            .iter()
            .zip(schema.offsets().entries())
            .zip(schema.fields())
        {
            let dtype = ElementType::from_token(*token, endian)?;
            let shape = if token.is_repeated() {
                vec![token.count]
            } else {
                Vec::new()
            };
            fields.push(ArrayField {
                name: field.key.clone(),
                dtype,
                shape,
                offset: entry.offset,
                token: *token,
            });
        }
        check_whole_records(bytes.len(), schema.record_size())?;
        Ok(StructuredArray {
            fields,
            itemsize: schema.record_size(),
            endian,
            data: bytes.to_vec(),
        })
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.data.len().checked_div(self.itemsize).unwrap_or(0)
    }

    /// True when the array holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per record
    pub fn itemsize(&self) -> usize {
        self.itemsize
    }

    /// Field descriptions in record order
    pub fn fields(&self) -> &[ArrayField] {
        &self.fields
    }

    /// `(name, type string, shape)` per field
    pub fn descr(&self) -> Vec<(String, String, Vec<usize>)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.dtype.descr(), f.shape.clone()))
            .collect()
    }

    /// Underlying record bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Every value of field `name`
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        let field = self.fields.iter().find(|f| f.name == name)?;
        Some(
            (0..self.len())
                .map(|row| self.decode_field(field, row))
                .collect(),
        )
    }

    /// Values of record `index`
    pub fn row(&self, index: usize) -> Option<Vec<Value>> {
        if index >= self.len() {
            return None;
        }
        Some(
            self.fields
                .iter()
                .map(|field| self.decode_field(field, index))
                .collect(),
        )
    }

    fn decode_field(&self, field: &ArrayField, row: usize) -> Value {
        let start = row * self.itemsize + field.offset;
        let buf = &self.data[start..start + field.size()];
        if self.endian.is_little() {
            decode_token::<LittleEndian>(field.token, self.endian, buf)
        } else {
            decode_token::<BigEndian>(field.token, self.endian, buf)
        }
    }
}
