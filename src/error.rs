//! Error types for imeta-io

use crate::{ContainerKind, MetadataKind};
use std::io;

/// Result type for imeta-io operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing image metadata
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid file format
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Unsupported file format
    #[error("Unsupported format")]
    UnsupportedFormat,

    /// Invalid segment
    #[error("Invalid segment at offset {offset}: {reason}")]
    InvalidSegment { offset: u64, reason: String },

    /// PNG chunk whose stored CRC does not match its contents
    #[error("Invalid CRC for chunk with type: {chunk} (stored {expected:#010x}, computed {actual:#010x})")]
    CrcMismatch {
        chunk: String,
        expected: u32,
        actual: u32,
    },

    /// The container cannot carry the requested metadata kind
    #[error("{} files do not support {metadata} metadata", .container.name())]
    Unsupported {
        metadata: MetadataKind,
        container: ContainerKind,
    },

    /// A metadata payload could not be decoded or encoded
    #[error("Invalid metadata payload: {0}")]
    Encoding(String),

    /// Caller passed an argument the operation cannot use
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Data size exceeds maximum allowed
    #[error("Data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: usize, max: usize },
}

/// Malformed XML only ever comes from an XMP payload
impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Encoding(format!("Malformed XMP: {e}"))
    }
}

impl Error {
    /// True for errors caused by a malformed or unrecognized container
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_)
                | Error::InvalidSegment { .. }
                | Error::CrcMismatch { .. }
                | Error::UnsupportedFormat
        )
    }

    pub(crate) fn truncated(offset: u64, what: &str) -> Self {
        Error::InvalidSegment {
            offset,
            reason: format!("truncated {what}"),
        }
    }
}
