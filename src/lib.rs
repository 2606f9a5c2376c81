//! recstore - fixed-record binary table store
//!
//! A database is a directory of tables. Each table is a flat file of
//! equal-size binary records plus a JSON header describing the fields.
//! Reads can select a record range and a subset of columns, and hand the
//! result back as raw bytes, tuples, mappings, a column frame or a typed
//! structured array.
//!
//! # Quick Start
//!
//! ```no_run
//! use recstore::{Database, DbMode, FieldDescriptor, OpenMode, ReadRequest, ReadTarget, TableHeader, Value};
//!
//! # fn main() -> recstore::Result<()> {
//! let db = Database::open("./weather.db", DbMode::Write)?;
//! db.create_table(
//!     "station",
//!     &TableHeader::new(vec![
//!         FieldDescriptor::new("time", "d", 8),
//!         FieldDescriptor::new("temp", "f", 4),
//!         FieldDescriptor::new("site", "6s", 6),
//!     ]),
//! )?;
//!
//! let mut table = db.open_table("station", OpenMode::Append)?;
//! table.append(&[Value::Float(1.7e9), Value::Float(12.5), Value::from("roof")])?;
//! table.close()?;
//!
//! let table = db.open_table("station", OpenMode::Read)?;
//! let frame = table
//!     .read(&ReadRequest::new().columns(["time", "temp"]).target(ReadTarget::Frame))?
//!     .into_frame();
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `recstore-core`: format tokens, offsets, schemas, values and errors
//! - `recstore-storage`: record codec, projected reads, output targets,
//!   recovery mode, tables and database directories

pub use recstore_core::*;
pub use recstore_storage::*;
