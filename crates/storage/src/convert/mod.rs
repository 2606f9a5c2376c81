//! Output representations
//!
//! The same record bytes can be handed back in five shapes. [`ReadTarget`]
//! is the closed set of shapes; [`ReadTarget::convert`] turns raw bytes
//! plus the (possibly projected) schema into a [`ReadOutput`].
//!
//! Every decoded shape reports a mismatch between the schema and the bytes
//! as `Error::FormatInterpretation`, so callers can detect a mis-declared
//! header uniformly and retry through recovery mode.

mod array;
mod frame;

pub use array::{ArrayField, ElementKind, ElementType, StructuredArray};
pub use frame::{Frame, FrameColumn};

use crate::codec::RecordCodec;
use recstore_core::{Error, Result, Schema, Value};
use std::fmt;
use std::str::FromStr;

/// Requested representation of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadTarget {
    /// Bytes exactly as stored (projected fields only)
    Raw,
    /// One value tuple per record
    #[default]
    Tuple,
    /// One key → value mapping per record
    Mapping,
    /// Column-oriented table
    Frame,
    /// Typed structured array
    Array,
}

impl ReadTarget {
    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            ReadTarget::Raw => "raw",
            ReadTarget::Tuple => "tuple",
            ReadTarget::Mapping => "mapping",
            ReadTarget::Frame => "frame",
            ReadTarget::Array => "array",
        }
    }

    /// Whether the target interprets bytes through the schema
    pub fn decodes(&self) -> bool {
        !matches!(self, ReadTarget::Raw)
    }

    /// Convert `bytes`, laid out by `schema`, into this representation
    pub fn convert(&self, bytes: &[u8], schema: &Schema) -> Result<ReadOutput> {
        match self {
            ReadTarget::Raw => Ok(ReadOutput::Raw(bytes.to_vec())),
            ReadTarget::Tuple => decode_tuples(bytes, schema).map(ReadOutput::Tuples),
            ReadTarget::Mapping => decode_mappings(bytes, schema).map(ReadOutput::Mappings),
            ReadTarget::Frame => {
                let keys = schema.keys().map(str::to_string).collect();
                let rows = decode_tuples(bytes, schema)?;
                Ok(ReadOutput::Frame(Frame::from_rows(keys, rows)))
            }
            ReadTarget::Array => StructuredArray::from_bytes(bytes, schema).map(ReadOutput::Array),
        }
    }
}

impl FromStr for ReadTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "raw" | "buffer" => Ok(ReadTarget::Raw),
            "tuple" => Ok(ReadTarget::Tuple),
            "mapping" | "dict" => Ok(ReadTarget::Mapping),
            "frame" | "dataframe" | "data_frame" | "pandas" | "df" => Ok(ReadTarget::Frame),
            "array" | "structuredarray" | "structured_array" | "sa" => Ok(ReadTarget::Array),
            other => Err(Error::UnsupportedTarget(other.to_string())),
        }
    }
}

impl fmt::Display for ReadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One record as an ordered key → value mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordMap {
    entries: Vec<(String, Value)>,
}

impl RecordMap {
    /// Pair keys with values in order
    pub fn new(keys: impl IntoIterator<Item = String>, values: Vec<Value>) -> Self {
        RecordMap {
            entries: keys.into_iter().zip(values).collect(),
        }
    }

    /// Value of `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Keys in schema order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the mapping has no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values in schema order
    pub fn into_values(self) -> Vec<Value> {
        self.entries.into_iter().map(|(_, v)| v).collect()
    }
}

/// Result of a read, one variant per [`ReadTarget`]
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutput {
    /// Unmodified bytes
    Raw(Vec<u8>),
    /// One tuple per record
    Tuples(Vec<Vec<Value>>),
    /// One mapping per record
    Mappings(Vec<RecordMap>),
    /// Column-oriented table
    Frame(Frame),
    /// Typed structured array
    Array(StructuredArray),
}

impl ReadOutput {
    /// Target that produced this output
    pub fn target(&self) -> ReadTarget {
        match self {
            ReadOutput::Raw(_) => ReadTarget::Raw,
            ReadOutput::Tuples(_) => ReadTarget::Tuple,
            ReadOutput::Mappings(_) => ReadTarget::Mapping,
            ReadOutput::Frame(_) => ReadTarget::Frame,
            ReadOutput::Array(_) => ReadTarget::Array,
        }
    }

    /// Number of records, or bytes for `Raw`
    pub fn len(&self) -> usize {
        match self {
            ReadOutput::Raw(bytes) => bytes.len(),
            ReadOutput::Tuples(rows) => rows.len(),
            ReadOutput::Mappings(rows) => rows.len(),
            ReadOutput::Frame(frame) => frame.num_rows(),
            ReadOutput::Array(array) => array.len(),
        }
    }

    /// True when nothing was read
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes, if this is a raw output
    pub fn into_raw(self) -> Option<Vec<u8>> {
        match self {
            ReadOutput::Raw(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Tuples, if this is a tuple output
    pub fn into_tuples(self) -> Option<Vec<Vec<Value>>> {
        match self {
            ReadOutput::Tuples(rows) => Some(rows),
            _ => None,
        }
    }

    /// Mappings, if this is a mapping output
    pub fn into_mappings(self) -> Option<Vec<RecordMap>> {
        match self {
            ReadOutput::Mappings(rows) => Some(rows),
            _ => None,
        }
    }

    /// Frame, if this is a frame output
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            ReadOutput::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    /// Structured array, if this is an array output
    pub fn into_array(self) -> Option<StructuredArray> {
        match self {
            ReadOutput::Array(array) => Some(array),
            _ => None,
        }
    }
}

pub(crate) fn check_whole_records(len: usize, record_size: usize) -> Result<()> {
    if record_size == 0 {
        if len == 0 {
            return Ok(());
        }
        return Err(Error::format_interpretation(format!(
            "{} bytes cannot be read with an empty record format",
            len
        )));
    }
    if len % record_size != 0 {
        return Err(Error::format_interpretation(format!(
            "{} bytes is not a whole number of {}-byte records",
            len, record_size
        )));
    }
    Ok(())
}

fn decode_tuples(bytes: &[u8], schema: &Schema) -> Result<Vec<Vec<Value>>> {
    check_whole_records(bytes.len(), schema.record_size())?;
    let codec = RecordCodec::new(schema);
    codec
        .decode_many(bytes)
        .map(|row| row.map_err(|e| Error::format_interpretation(e.to_string())))
        .collect()
}

fn decode_mappings(bytes: &[u8], schema: &Schema) -> Result<Vec<RecordMap>> {
    let keys: Vec<String> = schema.keys().map(str::to_string).collect();
    Ok(decode_tuples(bytes, schema)?
        .into_iter()
        .map(|values| RecordMap::new(keys.iter().cloned(), values))
        .collect())
}
