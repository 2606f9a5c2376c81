//! Table header files
//!
//! A header is a small JSON document next to the data file:
//!
//! ```json
//! {
//!   "data": [
//!     {"key": "time", "format": "d", "size": 8},
//!     {"key": "name", "format": "6s", "size": 6}
//!   ],
//!   "memo": "generated by logger v2"
//! }
//! ```
//!
//! `data` is the field list. An optional `endian` key records the byte
//! order marker the table was written with. Every other key is opaque
//! metadata and is preserved verbatim.

use recstore_core::{Endian, FieldDescriptor, Result, Schema};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Contents of a `<name>.header` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableHeader {
    /// Field descriptors in record order
    pub data: Vec<FieldDescriptor>,
    /// Byte order marker, when recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endian: Option<String>,
    /// Free-form metadata
    #[serde(flatten)]
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl TableHeader {
    /// Header with the given fields and no metadata
    pub fn new(data: Vec<FieldDescriptor>) -> Self {
        TableHeader {
            data,
            endian: None,
            meta: serde_json::Map::new(),
        }
    }

    /// Record the byte order the table is written with
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian.marker().to_string());
        self
    }

    /// Attach a `memo` string
    pub fn with_memo(self, memo: impl Into<String>) -> Self {
        self.with_meta("memo", serde_json::Value::String(memo.into()))
    }

    /// Attach an arbitrary metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// Metadata entry by key
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }

    /// Byte order recorded in the header, if any
    pub fn declared_endian(&self) -> Result<Option<Endian>> {
        self.endian.as_deref().map(str::parse).transpose()
    }

    /// Validated schema under `endian`
    pub fn schema(&self, endian: Endian) -> Result<Schema> {
        Schema::new(self.data.clone(), endian)
    }

    /// Read a header file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Write a header file, replacing any existing one
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
