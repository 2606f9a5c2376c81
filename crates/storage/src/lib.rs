//! Storage layer for recstore
//!
//! This crate turns a schema into table files and back:
//! - RecordCodec: packs values into fixed-size records and unpacks them
//! - ProjectionReader: copies only the requested fields out of a record range
//! - ReadTarget: raw, tuple, mapping, frame and structured-array outputs
//! - RecoveryAdapter: reads tables whose header mis-declares booleans
//! - Table: append/read orchestration over a memory-mapped data file
//! - Database: table directory glue, summaries and tar checkouts
//!
//! # Read path
//!
//! `Table::read` maps the data file, positions a `ProjectionReader` at the
//! start record, extracts the selected fields and hands the bytes plus the
//! projected schema to the requested `ReadTarget`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod backing;
pub mod codec;
pub mod config;
pub mod convert;
pub mod database;
pub mod header;
pub mod paths;
pub mod projection;
pub mod recovery;
pub mod table;

pub use archive::{ArchiveCompression, ArchiveInfo, ArchiveWriter};
pub use backing::BackingView;
pub use codec::{DecodeIter, RecordCodec};
pub use config::{StoreConfig, TruncationPolicy};
pub use convert::{
    ArrayField, ElementKind, ElementType, Frame, FrameColumn, ReadOutput, ReadTarget, RecordMap,
    StructuredArray,
};
pub use database::{Database, DbMode, TableInfo};
pub use header::TableHeader;
pub use paths::{DatabasePaths, TablePaths};
pub use projection::{Columns, Instruction, ProjectionPlan, ProjectionReader};
pub use recovery::RecoveryAdapter;
pub use table::{OpenMode, OpenOptions, ReadRequest, Table};
