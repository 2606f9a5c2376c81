//! Tables
//!
//! A [`Table`] owns the open data file and the active schema, and exposes
//! the two entry points of the store:
//!
//! - [`Table::append`]: encode one record and append it to the data file
//! - [`Table::read`]: project a record range and convert it to a
//!   [`ReadOutput`]
//!
//! Reads map the data file read-only for the duration of the call. A table
//! opened with [`OpenMode::Append`] assumes it is the only writer.

use crate::backing::BackingView;
use crate::codec::RecordCodec;
use crate::config::{StoreConfig, TruncationPolicy};
use crate::convert::{ReadOutput, ReadTarget};
use crate::header::TableHeader;
use crate::paths::{DatabasePaths, TablePaths};
use crate::projection::{Columns, ProjectionPlan, ProjectionReader};
use crate::recovery::RecoveryAdapter;
use recstore_core::{Endian, Error, Result, Schema, Value};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Access mode of an open table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Read only
    #[default]
    Read,
    /// Read and append records
    Append,
}

/// Options for opening a table
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    mode: OpenMode,
    endian: Option<Endian>,
}

impl OpenOptions {
    /// Open read-only
    pub fn read() -> Self {
        OpenOptions::default()
    }

    /// Open for appending
    pub fn append() -> Self {
        OpenOptions {
            mode: OpenMode::Append,
            endian: None,
        }
    }

    /// Override the byte order recorded in the header
    pub fn endian(mut self, endian: Endian) -> Self {
        self.endian = Some(endian);
        self
    }

    /// Access mode
    pub fn mode(&self) -> OpenMode {
        self.mode
    }
}

impl From<OpenMode> for OpenOptions {
    fn from(mode: OpenMode) -> Self {
        OpenOptions { mode, endian: None }
    }
}

/// Parameters of one read
///
/// Defaults: every remaining record from index 0, every column, as tuples.
#[derive(Debug, Clone, Default)]
pub struct ReadRequest {
    count: Option<usize>,
    start: usize,
    columns: Columns,
    target: ReadTarget,
}

impl ReadRequest {
    /// Request with defaults
    pub fn new() -> Self {
        ReadRequest::default()
    }

    /// Read at most `n` records
    pub fn count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Read every remaining record
    pub fn all(mut self) -> Self {
        self.count = None;
        self
    }

    /// Start at record `index`
    pub fn start(mut self, index: usize) -> Self {
        self.start = index;
        self
    }

    /// Select columns
    pub fn columns(mut self, columns: impl Into<Columns>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Output representation
    pub fn target(mut self, target: ReadTarget) -> Self {
        self.target = target;
        self
    }

    /// Requested record count, `None` for all
    pub fn requested_count(&self) -> Option<usize> {
        self.count
    }

    /// First record index
    pub fn requested_start(&self) -> usize {
        self.start
    }

    /// Output representation
    pub fn requested_target(&self) -> ReadTarget {
        self.target
    }

    /// Whether the clamped window is non-empty and ends at the last of
    /// `nrecords` whole records
    pub fn reaches_tail(&self, nrecords: usize) -> bool {
        self.start < nrecords
            && self
                .count
                .map_or(true, |n| n > 0 && self.start.saturating_add(n) >= nrecords)
    }
}

/// An open table
#[derive(Debug)]
pub struct Table {
    name: String,
    paths: TablePaths,
    header: TableHeader,
    schema: Schema,
    codec: RecordCodec,
    file: File,
    mode: OpenMode,
    truncation: TruncationPolicy,
    recovered: bool,
}

impl Table {
    /// Open table `name` inside database directory `dir`
    ///
    /// The byte order is, in priority order: the one in `options`, the one
    /// recorded in the header, `config.default_endian`.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
        options: &OpenOptions,
        config: &StoreConfig,
    ) -> Result<Self> {
        let paths = DatabasePaths::from_root(dir).table(name)?;
        if !paths.exists() {
            return Err(Error::TableNotFound {
                name: name.to_string(),
            });
        }

        let header = TableHeader::load(paths.header())?;
        let endian = match options.endian {
            Some(endian) => endian,
            None => header.declared_endian()?.unwrap_or(config.default_endian),
        };
        let schema = header.schema(endian)?;
        if schema.record_size() == 0 {
            return Err(Error::schema(format!("table '{}' declares no fields", name)));
        }

        let file = match options.mode {
            OpenMode::Read => File::open(paths.data())?,
            OpenMode::Append => fs::OpenOptions::new()
                .read(true)
                .append(true)
                .open(paths.data())?,
        };

        let table = Table {
            name: name.to_string(),
            codec: RecordCodec::new(&schema),
            paths,
            header,
            schema,
            file,
            mode: options.mode,
            truncation: config.truncation,
            recovered: false,
        };
        table.check_remainder(config.truncation)?;

        debug!(
            table = %table.name,
            format = %table.format(),
            record_size = table.record_size(),
            mode = ?table.mode,
            "Opened table"
        );
        Ok(table)
    }

    fn check_remainder(&self, policy: TruncationPolicy) -> Result<()> {
        let size = self.file_size()?;
        let remainder = size % self.record_size() as u64;
        if remainder == 0 {
            return Ok(());
        }
        if policy == TruncationPolicy::Reject {
            return Err(Error::decoding(format!(
                "data file of table '{}' is {} bytes, not a multiple of the {}-byte record",
                self.name,
                size,
                self.record_size()
            )));
        }
        warn!(
            table = %self.name,
            file_size = size,
            record_size = self.record_size(),
            remainder,
            "Data file does not hold a whole number of records"
        );
        Ok(())
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header as loaded at open
    pub fn header(&self) -> &TableHeader {
        &self.header
    }

    /// Active schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Composite format of the active schema
    pub fn format(&self) -> String {
        self.schema.format()
    }

    /// Bytes per record
    pub fn record_size(&self) -> usize {
        self.schema.record_size()
    }

    /// Byte order of the active schema
    pub fn endian(&self) -> Endian {
        self.schema.endian()
    }

    /// Access mode
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Whether this is a recovery view
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// Current size of the data file
    pub fn file_size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Whole records in the data file
    pub fn nrecords(&self) -> Result<usize> {
        Ok(self.file_size()? as usize / self.record_size())
    }

    /// Append one record
    pub fn append(&mut self, values: &[Value]) -> Result<()> {
        if self.mode != OpenMode::Append {
            return Err(Error::InvalidOperation(format!(
                "table '{}' is not open for appending",
                self.name
            )));
        }
        let record = self.codec.encode(values)?;
        self.file.write_all(&record)?;
        debug!(table = %self.name, bytes = record.len(), "Appended record");
        Ok(())
    }

    /// Read records as described by `request`
    pub fn read(&self, request: &ReadRequest) -> Result<ReadOutput> {
        let keys = request.columns.resolve(&self.schema)?;
        let view = BackingView::map(&self.file)?;
        let record_size = self.record_size();

        let remainder = view.len() % record_size;
        if remainder != 0 {
            match self.truncation {
                TruncationPolicy::Ignore => {}
                TruncationPolicy::Strict => {
                    let misread = request.target.decodes()
                        && keys.is_none()
                        && request.reaches_tail(view.len() / record_size);
                    if misread {
                        return Err(Error::format_interpretation(format!(
                            "data file of table '{}' is {} bytes, which is not a whole number of {}-byte '{}' records",
                            self.name,
                            view.len(),
                            record_size,
                            self.format()
                        )));
                    }
                }
                TruncationPolicy::Reject => {
                    return Err(Error::decoding(format!(
                        "data file of table '{}' ends with a partial record of {} bytes",
                        self.name, remainder
                    )))
                }
            }
        }

        let mut reader = ProjectionReader::new(&view, record_size);
        reader.seek_record(request.start);
        let (bytes, schema) = match &keys {
            None => (
                reader.read_all_columns(request.count),
                Cow::Borrowed(&self.schema),
            ),
            Some(keys) => {
                let plan = ProjectionPlan::new(&self.schema, keys)?;
                (
                    reader.read_columns(request.count, &plan),
                    Cow::Owned(self.schema.project(keys)?),
                )
            }
        };

        debug!(
            table = %self.name,
            start = request.start,
            count = ?request.count,
            columns = ?keys,
            target = %request.target,
            bytes = bytes.len(),
            "Read records"
        );
        request.target.convert(&bytes, &schema)
    }

    /// Read-only view of this table through the recovery schema
    ///
    /// The stored header and this table are left untouched.
    pub fn recovered(&self) -> Result<Table> {
        let schema = RecoveryAdapter::adapt(&self.schema)?;
        let file = File::open(self.paths.data())?;
        warn!(
            table = %self.name,
            declared = %self.format(),
            recovered = %schema.format(),
            "Opening table in recovery mode"
        );
        Ok(Table {
            name: self.name.clone(),
            paths: self.paths.clone(),
            header: self.header.clone(),
            codec: RecordCodec::new(&schema),
            schema,
            file,
            mode: OpenMode::Read,
            truncation: self.truncation,
            recovered: true,
        })
    }

    /// Flush pending appends and release the file handle
    pub fn close(self) -> Result<()> {
        if self.mode == OpenMode::Append {
            self.file.sync_data()?;
        }
        debug!(table = %self.name, "Closed table");
        Ok(())
    }
}
