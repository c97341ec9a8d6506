use std::path::PathBuf;

use thiserror::Error;

use gffquant_core::CoreError;
use gffquant_counting::CountingError;
use gffquant_io::AlignmentSourceError;
use gffquant_overlaprs::FeatureIndexError;

#[derive(Debug, Error)]
pub enum QuantError {
    #[error("Malformed row {line} in spill file {path}: {reason}")]
    MalformedSpill {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Reference id {0} is not known to the alignment source")]
    UnknownReference(usize),

    #[error("Invalid count config {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Counting(#[from] CountingError),

    #[error(transparent)]
    FeatureIndex(#[from] FeatureIndexError),

    #[error(transparent)]
    AlignmentSource(#[from] AlignmentSourceError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QuantError>;
