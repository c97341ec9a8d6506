//! # Alignment sources for gffquant.
//!
//! An alignment source hands out [`AlignmentRecord`]s in archive order,
//! filtered by mapping multiplicity and flag bits, and answers reference
//! lookups by id. [`BamFile`] reads a BAM archive with noodles;
//! [`InMemoryAlignmentSource`] serves records from a vector.
//!
//! [`AlignmentRecord`]: gffquant_core::models::AlignmentRecord
pub mod bam;
pub mod error;
pub mod memory;
pub mod multimappers;
pub mod source;

// re-expose core types
pub use bam::BamFile;
pub use error::*;
pub use memory::InMemoryAlignmentSource;
pub use source::{AlignmentFilter, AlignmentIter, AlignmentSource, ReferenceInfo};
