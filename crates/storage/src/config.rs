//! Store configuration
//!
//! Controls the byte order assumed for tables whose header does not name
//! one, and what to do when a data file does not hold a whole number of
//! records.

use recstore_core::{Endian, Error, Result};

/// Handling of data files whose size is not a multiple of the record size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Count whole records only and decode them as if nothing were left over
    Ignore,
    /// Count whole records and allow raw reads, but refuse decoded reads
    /// of every column whose window reaches the leftover tail: the header
    /// format does not describe the bytes. Empty windows, windows that
    /// stop before the last whole record and column projections decode
    /// normally.
    #[default]
    Strict,
    /// Refuse to open the table
    Reject,
}

/// Store configuration
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Byte order used when neither the caller nor the header names one
    pub default_endian: Endian,
    /// Leftover-bytes handling
    pub truncation: TruncationPolicy,
}

impl StoreConfig {
    /// Tolerant config: leftover bytes are ignored everywhere
    pub fn tolerant() -> Self {
        StoreConfig {
            truncation: TruncationPolicy::Ignore,
            ..Default::default()
        }
    }

    /// Set the default byte order
    pub fn with_endian(mut self, endian: Endian) -> Self {
        self.default_endian = endian;
        self
    }

    /// Set the truncation policy
    pub fn with_truncation_policy(mut self, policy: TruncationPolicy) -> Self {
        self.truncation = policy;
        self
    }

    /// Validate configuration
    ///
    /// Host byte orders are reserved for recovery views and explicit
    /// headers; new tables must pin little or big endian.
    pub fn validate(&self) -> Result<()> {
        if matches!(self.default_endian, Endian::Native | Endian::Standard) {
            return Err(Error::InvalidOperation(
                "default byte order must be little or big endian".to_string(),
            ));
        }
        Ok(())
    }
}
