//! Column-projected reads
//!
//! A projected read walks the data file record by record and copies only
//! the byte ranges of the requested fields, skipping the rest, so unwanted
//! fields are never decoded. Selected fields always come out in schema
//! declaration order, whatever order the caller listed them in.
//!
//! Without a column selection the requested record range is handed back
//! as a borrowed slice of the backing bytes.

use recstore_core::{Error, Result, Schema};
use std::borrow::Cow;

/// Column selection for a read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Columns {
    /// Every field, in schema order
    #[default]
    All,
    /// The named fields; an empty list means every field
    Select(Vec<String>),
    /// A single bare string where a list of keys was expected
    ///
    /// Always rejected by [`Columns::resolve`]: a string is not silently
    /// treated as a one-key list or as a sequence of characters.
    Scalar(String),
}

impl Columns {
    /// Keys to project, or `None` for every field
    pub fn resolve(&self, schema: &Schema) -> Result<Option<Vec<String>>> {
        match self {
            Columns::All => Ok(None),
            Columns::Select(keys) if keys.is_empty() => Ok(None),
            Columns::Select(keys) => {
                if let Some(unknown) = keys.iter().find(|k| schema.index_of(k).is_none()) {
                    return Err(Error::invalid_column(format!(
                        "'{}' is not a field of this table",
                        unknown
                    )));
                }
                Ok(Some(keys.clone()))
            }
            Columns::Scalar(s) => Err(Error::invalid_column(format!(
                "column names should be given as a list of keys, got the string '{}'",
                s
            ))),
        }
    }
}

impl From<&str> for Columns {
    fn from(s: &str) -> Self {
        Columns::Scalar(s.to_string())
    }
}

impl From<String> for Columns {
    fn from(s: String) -> Self {
        Columns::Scalar(s)
    }
}

impl From<Vec<String>> for Columns {
    fn from(keys: Vec<String>) -> Self {
        Columns::Select(keys)
    }
}

impl From<Vec<&str>> for Columns {
    fn from(keys: Vec<&str>) -> Self {
        Columns::Select(keys.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Columns {
    fn from(keys: &[&str]) -> Self {
        Columns::Select(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl From<&[String]> for Columns {
    fn from(keys: &[String]) -> Self {
        Columns::Select(keys.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for Columns {
    fn from(keys: [&str; N]) -> Self {
        Columns::Select(keys.iter().map(|k| k.to_string()).collect())
    }
}

/// One step of a projection walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Copy this many bytes to the output
    Copy(usize),
    /// Advance past this many bytes
    Skip(usize),
}

/// Copy/skip program for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionPlan {
    instructions: Vec<Instruction>,
    output_size: usize,
}

impl ProjectionPlan {
    /// Plan copying `keys` out of records laid out by `schema`
    pub fn new<S: AsRef<str>>(schema: &Schema, keys: &[S]) -> Result<Self> {
        if let Some(unknown) = keys.iter().find(|k| schema.index_of(k.as_ref()).is_none()) {
            return Err(Error::invalid_column(format!(
                "'{}' is not a field of this table",
                unknown.as_ref()
            )));
        }

        let mut instructions = Vec::with_capacity(schema.len());
        let mut output_size = 0;
        for entry in schema.offsets().entries() {
            if keys.iter().any(|k| k.as_ref() == entry.key) {
                instructions.push(Instruction::Copy(entry.size));
                output_size += entry.size;
            } else {
                instructions.push(Instruction::Skip(entry.size));
            }
        }

        Ok(ProjectionPlan {
            instructions,
            output_size,
        })
    }

    /// Instructions in field order
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Bytes copied per record
    pub fn output_size(&self) -> usize {
        self.output_size
    }
}

/// Cursor over record-aligned bytes
pub struct ProjectionReader<'a> {
    source: &'a [u8],
    record_size: usize,
    cursor: usize,
}

impl<'a> ProjectionReader<'a> {
    /// Reader positioned at the first record
    pub fn new(source: &'a [u8], record_size: usize) -> Self {
        ProjectionReader {
            source,
            record_size,
            cursor: 0,
        }
    }

    /// Whole records in the source
    pub fn record_count(&self) -> usize {
        self.source.len().checked_div(self.record_size).unwrap_or(0)
    }

    /// Move to the boundary of record `index`, clamped to the last whole record
    pub fn seek_record(&mut self, index: usize) {
        let index = index.min(self.record_count());
        self.cursor = index * self.record_size;
    }

    /// Whole records left after the cursor
    pub fn remaining_records(&self) -> usize {
        self.record_count()
            .saturating_sub(self.cursor.checked_div(self.record_size).unwrap_or(0))
    }

    fn take(&self, count: Option<usize>) -> usize {
        let remaining = self.remaining_records();
        count.map_or(remaining, |n| n.min(remaining))
    }

    /// Read up to `count` records (all remaining for `None`), every field
    pub fn read_all_columns(&mut self, count: Option<usize>) -> Cow<'a, [u8]> {
        let n = self.take(count);
        let source = self.source;
        let start = self.cursor;
        self.cursor += n * self.record_size;
        Cow::Borrowed(&source[start..self.cursor])
    }

    /// Read up to `count` records following `plan`
    pub fn read_columns(&mut self, count: Option<usize>, plan: &ProjectionPlan) -> Cow<'a, [u8]> {
        let n = self.take(count);
        let mut out = Vec::with_capacity(n * plan.output_size());
        for _ in 0..n {
            for instruction in plan.instructions() {
                match *instruction {
                    Instruction::Copy(size) => {
                        out.extend_from_slice(&self.source[self.cursor..self.cursor + size]);
                        self.cursor += size;
                    }
                    Instruction::Skip(size) => self.cursor += size,
                }
            }
        }
        Cow::Owned(out)
    }
}
