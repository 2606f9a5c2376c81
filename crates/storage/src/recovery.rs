//! Recovery mode for mis-declared headers
//!
//! Some historical writers declared boolean fields as `i` (4-byte signed
//! integer) in the header while actually packing them as `?` (one byte),
//! in host byte order. Reading such a table with its declared format
//! misaligns every record after the first bad field.
//!
//! [`RecoveryAdapter::adapt`] derives the schema those writers really
//! used:
//!
//! - every `i` token becomes `?`, keeping its repeat count, with the
//!   declared size set to the count
//! - byte order becomes [`Endian::Native`]
//! - every other field keeps its key and format; sizes are re-derived
//!   under native widths
//!
//! The stored header is never touched. Other corruption patterns are not
//! detected, and a recovered read can still be semantically wrong while
//! being structurally valid (for example a timestamp field decoding to a
//! value near zero). Callers should sanity-check recovered values.

use recstore_core::{Endian, FieldDescriptor, FormatToken, Result, Schema, TypeCode};
use tracing::warn;

/// Derives the as-written schema from a mis-declared one
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryAdapter;

impl RecoveryAdapter {
    /// Schema with `i` fields read as `?`, in native byte order
    pub fn adapt(schema: &Schema) -> Result<Schema> {
        let mut rewritten = Vec::new();
        let fields = schema
            .fields()
            .iter()
            .zip(schema.tokens())
            .map(|(field, token)| {
                let token = if token.code == TypeCode::I32 {
                    rewritten.push(field.key.as_str());
                    FormatToken::new(token.count, TypeCode::Bool)
                } else {
                    *token
                };
                FieldDescriptor::new(
                    field.key.clone(),
                    recovered_format(field, token),
                    token.size(Endian::Native),
                )
            })
            .collect();

        if !rewritten.is_empty() {
            warn!(
                fields = ?rewritten,
                "Reading 'i' fields as '?' in native byte order"
            );
        }
        Schema::new(fields, Endian::Native)
    }
}

fn recovered_format(field: &FieldDescriptor, token: FormatToken) -> String {
    if token.code == TypeCode::Bool {
        token.to_string()
    } else {
        field.format.clone()
    }
}
