//! Feature overlap queries for gffquant.
//!
//! Two layers live here. [`AIList`] answers "which intervals overlap
//! `[start, end)`" for a single reference sequence. [`FeatureIndex`] sits on
//! top of it and serves a whole GFF database, building one [`AIList`] per
//! reference on first use and keeping it in an explicit cache that callers
//! clear and inspect through the [`FeatureLookup`] trait.
//!
//! ```rust
//! use gffquant_core::models::Feature;
//! use gffquant_overlaprs::{FeatureIndex, FeatureLookup};
//!
//! let features = vec![
//!     Feature { seqid: "contig_1".to_string(), start: 100, end: 200, feature_id: Some("gene_1".to_string()) },
//!     Feature { seqid: "contig_1".to_string(), start: 150, end: 300, feature_id: Some("gene_2".to_string()) },
//! ];
//! let mut index = FeatureIndex::from_features(features);
//!
//! let overlaps = index.overlaps("contig_1", 180, 250).unwrap();
//! assert_eq!(overlaps.len(), 2);
//! assert_eq!(index.cache_stats().misses, 1);
//! ```

/// Augmented Interval List implementation.
pub mod ailist;

/// GFF backed feature database.
pub mod feature_index;

/// Core traits for overlap operations.
pub mod traits;

// re-exports
pub use self::ailist::AIList;
pub use self::feature_index::{
    CacheStats, FeatureIndex, FeatureIndexError, FeatureLookup, IndexEntry, Overlap,
    build_gff_index, write_gff_index,
};
pub use self::traits::{Interval, Overlapper};

pub mod consts {
    /// Suffix appended to a GFF path to locate its block index.
    pub const INDEX_SUFFIX: &str = ".index";
}
