//! Per-field byte offsets of a composite format
//!
//! Offsets are derived by stripping tokens off the end of the format one
//! at a time and sizing the remaining prefix with [`calcsize`], the same
//! function the codec uses for whole records. Offset math and the actual
//! encode/decode widths therefore cannot drift apart, whatever mix of
//! field widths the format holds.
//!
//! Trailing padding is not supported: the format must not rely on any
//! alignment between fields.

use crate::error::Result;
use crate::format::{calcsize, FormatString};

/// Offset calculator over a parsed composite format
#[derive(Debug, Clone)]
pub struct OffsetCalculator {
    offsets: Vec<usize>,
    total: usize,
}

impl OffsetCalculator {
    /// Compute offsets for a parsed format
    pub fn new(format: &FormatString) -> Result<Self> {
        let tokens = format.tokens();
        let endian = format.endian();
        let total = calcsize(tokens, endian)?;

        let mut offsets = vec![0; tokens.len()];
        for stripped in (0..tokens.len()).rev() {
            // The prefix left after stripping token `stripped` ends where it starts.
            offsets[stripped] = calcsize(&tokens[..stripped], endian)?;
        }

        Ok(OffsetCalculator { offsets, total })
    }

    /// Parse `format` and compute its offsets
    pub fn from_format(format: &str) -> Result<Self> {
        Self::new(&FormatString::parse(format)?)
    }

    /// Start offset of every field token, in declaration order
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Byte size of every field token, in declaration order
    pub fn sizes(&self) -> Vec<usize> {
        self.boundaries().windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Offsets followed by the implicit final boundary at the record size
    pub fn boundaries(&self) -> Vec<usize> {
        let mut boundaries = self.offsets.clone();
        boundaries.push(self.total);
        boundaries
    }

    /// Total record size
    pub fn record_size(&self) -> usize {
        self.total
    }
}

/// Start offsets of each field token in `format`
pub fn get_field_offsets(format: &str) -> Result<Vec<usize>> {
    Ok(OffsetCalculator::from_format(format)?.offsets().to_vec())
}

/// Byte sizes of each field token in `format`
pub fn get_field_sizes(format: &str) -> Result<Vec<usize>> {
    Ok(OffsetCalculator::from_format(format)?.sizes())
}
