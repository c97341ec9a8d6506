use thiserror::Error;

use gffquant_core::CoreError;
use gffquant_overlaprs::FeatureIndexError;

use crate::modes::DistributionMode;

#[derive(Debug, Error)]
pub enum CountingError {
    #[error("Distribution mode {0} does not resolve ambiguous alignments in groups")]
    UngroupedMode(DistributionMode),

    #[error("Reference id {0} is not known to the alignment source")]
    UnknownReference(usize),

    #[error(transparent)]
    FeatureIndex(#[from] FeatureIndexError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CountingError>;
