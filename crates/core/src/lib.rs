//! Core types for recstore
//!
//! This crate defines the layout side of a fixed-record table:
//! - Error: Error type hierarchy shared by every recstore crate
//! - Value: One decoded or to-be-encoded field value
//! - format: Tokenizer and parser for compact field-format strings
//! - offsets: Per-field byte offsets derived from a composite format
//! - schema: Field descriptors, validated schemas and offset tables

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod format;
pub mod offsets;
pub mod schema;
pub mod value;

pub use error::{Error, Result, RECOVERY_HINT};
pub use format::{
    calcsize, Endian, FormatString, FormatToken, Lexeme, Tokenizer, TypeCode, MAX_RECORD_SIZE,
};
pub use offsets::{get_field_offsets, get_field_sizes, OffsetCalculator};
pub use schema::{FieldDescriptor, OffsetEntry, OffsetTable, Schema};
pub use value::Value;
