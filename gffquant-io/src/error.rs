use std::io;
use thiserror::Error;

/// Error type for alignment sources.
#[derive(Error, Debug)]
pub enum AlignmentSourceError {
    /// IO error while reading the archive.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive header could not be read.
    #[error("Failed to read alignment header from {path}: {reason}")]
    Header { path: String, reason: String },

    /// A record position does not fit the 32-bit coordinates used for counting.
    #[error("Record {qname} has position {position} beyond the supported range")]
    PositionOutOfRange { qname: String, position: usize },

    /// A record refers to a reference id missing from the header.
    #[error("Record {qname} refers to unknown reference id {rid}")]
    UnknownReference { qname: String, rid: usize },
}

/// Result type alias for alignment source operations.
pub type Result<T> = std::result::Result<T, AlignmentSourceError>;
