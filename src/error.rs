//! Error types returned by table and snapshot operations.

use crate::config::ConfigError;
use std::io;
use thiserror::Error;

/// The bucket array or a slot's strings could not be allocated, or the
/// requested capacity does not fit in `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation failed for {buckets} buckets")]
pub struct AllocError {
    /// Bucket count of the table being built when the failure happened.
    pub buckets: usize,
}

/// Failure to build a table from a [`TableConfig`](crate::TableConfig).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CreateError {
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Rejection returned by [`Table::put`](crate::Table::put).
#[derive(Debug, Error)]
pub enum PutError {
    /// The key is already present; the table is unchanged.
    #[error("key already exists")]
    KeyExists,

    /// Key or value exceeds its limit under `LengthPolicy::Reject`.
    #[error("{what} is {len} bytes, limit is {limit}")]
    TooLong {
        what: &'static str,
        len: usize,
        limit: usize,
    },

    /// Growing the table or copying the entry failed; the table is unchanged.
    #[error(transparent)]
    Alloc(#[from] AllocError),
}

/// Failures while writing or reading a snapshot stream.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Underlying reader failed for a reason other than end of stream.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The stream ended in the middle of a header or record.
    #[error("snapshot truncated while reading {what}")]
    Truncated { what: &'static str },

    /// The sink failed; `fields_written` counts header fields and whole records
    /// that made it out before the failure.
    #[error("snapshot write failed after {fields_written} fields: {source}")]
    WriteFailed {
        fields_written: usize,
        #[source]
        source: io::Error,
    },

    #[error("invalid capacity {0}: must be a power of two >= 2")]
    InvalidCapacity(u64),

    /// The header asks for more buckets than the config allows decoding.
    #[error("capacity {capacity} exceeds the decode limit of {max}")]
    CapacityTooLarge { capacity: u64, max: u64 },

    #[error("entry count {count} exceeds capacity {capacity}")]
    CountOutOfRange { count: u64, capacity: u64 },

    #[error("{what} length {len} is outside 1..={max}")]
    LengthOutOfRange {
        what: &'static str,
        len: u64,
        max: u64,
    },

    #[error("{what} is missing its terminator byte")]
    MissingTerminator { what: &'static str },

    #[error("{what} is not valid UTF-8")]
    InvalidUtf8 { what: &'static str },

    #[error("slot position {position} is outside capacity {capacity}")]
    PositionOutOfRange { position: u64, capacity: u64 },

    #[error("two records claim slot position {0}")]
    DuplicatePosition(u64),

    #[error("two records share key {0:?}")]
    DuplicateKey(String),

    #[error(transparent)]
    Alloc(#[from] AllocError),
}

impl CodecError {
    /// Map a read failure, treating a short read as truncation.
    pub(crate) fn from_read(e: io::Error, what: &'static str) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Truncated { what }
        } else {
            CodecError::Io(e)
        }
    }
}
