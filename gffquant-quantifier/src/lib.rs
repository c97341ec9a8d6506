//! Two-pass quantification of alignments against annotated features.
//!
//! The first pass streams the alignment archive once, counting unique reads
//! and merged read pairs as it goes and spilling the feature hits of
//! multi-mapped reads to a temporary file. The second pass sorts that file
//! by read and distributes each multi-mapped read over its candidates.
pub mod ambiguous;
pub mod config;
pub mod errors;
pub mod mates;
pub mod quantifier;
pub mod spill;
pub mod unique;

pub use ambiguous::{AmbiguousAlignmentGroup, resolve_all};
pub use config::CountConfig;
pub use errors::*;
pub use mates::{FlushOutcome, MergeOutcome, SkipReason, UniqueCache};
pub use quantifier::{FeatureQuantifier, RunSummary};
pub use spill::{SpillCleanup, SpillRow, SpillWriter, read_sorted_spill};
pub use unique::{PhaseOneSummary, UniquePass};
