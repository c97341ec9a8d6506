//! A GFF database served one reference sequence at a time.
//!
//! The database is a GFF3 file whose features are grouped by `seqid`, plus a
//! block index (`<gff>.index`) with one `seqid<TAB>offset<TAB>length` row per
//! reference. A query for a reference reads its block, builds an [`AIList`]
//! and caches it. The cache is never evicted implicitly: the owner of the
//! index decides when to [`clear`](FeatureLookup::clear_cache) it.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
use log::debug;
use thiserror::Error;

use gffquant_core::CoreError;
use gffquant_core::models::{Feature, Interval};

use crate::{AIList, Overlapper};

#[derive(Debug, Error)]
pub enum FeatureIndexError {
    #[error("Malformed index line {line}: {reason}")]
    MalformedIndex { line: String, reason: String },

    #[error("Features of reference {0} are not contiguous in the GFF file")]
    UngroupedReference(String),

    #[error("Index block for {seqid} points past the end of the GFF file")]
    TruncatedBlock { seqid: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A feature interval returned for a query, in 0-based half-open coordinates.
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Overlap {
    pub begin: u32,
    pub end: u32,
    pub feature_id: Option<Arc<str>>,
}

/// Counters describing how the query cache has been used since the last clear.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub cached_references: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CacheStats(hits={}, misses={}, cached_references={})",
            self.hits, self.misses, self.cached_references
        )
    }
}

///
/// Overlap queries against an annotation, with an explicit cache handle.
///
/// Implementations may cache per-reference structures between queries; they
/// must not drop that cache on their own initiative.
///
pub trait FeatureLookup {
    fn overlaps(
        &mut self,
        reference: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<Overlap>, FeatureIndexError>;

    fn clear_cache(&mut self);

    fn cache_stats(&self) -> CacheStats;
}

/// One row of a GFF block index.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct IndexEntry {
    pub seqid: String,
    pub offset: u64,
    pub length: u64,
}

type FeatureTree = AIList<u32, Option<Arc<str>>>;

enum FeatureSource {
    Gff {
        path: PathBuf,
        blocks: HashMap<String, (u64, u64)>,
    },
    Memory(HashMap<String, Vec<Feature>>),
}

pub struct FeatureIndex {
    source: FeatureSource,
    trees: HashMap<String, FeatureTree>,
    hits: u64,
    misses: u64,
}

impl FeatureIndex {
    ///
    /// Open a GFF database through its block index.
    ///
    /// # Arguments
    /// - gff: path to the (uncompressed) GFF file
    /// - index: path to the block index written by [`write_gff_index`]
    pub fn open(gff: &Path, index: &Path) -> Result<FeatureIndex, FeatureIndexError> {
        let reader = BufReader::new(File::open(index)?);
        let mut blocks = HashMap::default();

        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let entry = parse_index_line(&line)?;
            blocks.insert(entry.seqid, (entry.offset, entry.length));
        }

        debug!("Loaded {} index blocks from {}", blocks.len(), index.display());

        Ok(FeatureIndex {
            source: FeatureSource::Gff {
                path: gff.to_path_buf(),
                blocks,
            },
            trees: HashMap::default(),
            hits: 0,
            misses: 0,
        })
    }

    ///
    /// Serve a set of features held in memory. Queries still go through the
    /// cache, so statistics behave exactly as for a GFF database.
    ///
    pub fn from_features(features: Vec<Feature>) -> FeatureIndex {
        let mut by_seqid: HashMap<String, Vec<Feature>> = HashMap::default();
        for feature in features {
            by_seqid
                .entry(feature.seqid.clone())
                .or_default()
                .push(feature);
        }
        FeatureIndex {
            source: FeatureSource::Memory(by_seqid),
            trees: HashMap::default(),
            hits: 0,
            misses: 0,
        }
    }

    /// Number of references with at least one feature.
    pub fn n_references(&self) -> usize {
        match &self.source {
            FeatureSource::Gff { blocks, .. } => blocks.len(),
            FeatureSource::Memory(features) => features.len(),
        }
    }

    fn load_features(&self, reference: &str) -> Result<Vec<Feature>, FeatureIndexError> {
        match &self.source {
            FeatureSource::Memory(features) => {
                Ok(features.get(reference).cloned().unwrap_or_default())
            }
            FeatureSource::Gff { path, blocks } => {
                let Some(&(offset, length)) = blocks.get(reference) else {
                    return Ok(Vec::new());
                };

                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start(offset))?;
                let mut block = String::with_capacity(length as usize);
                let read = file.take(length).read_to_string(&mut block)?;
                if (read as u64) < length {
                    return Err(FeatureIndexError::TruncatedBlock {
                        seqid: reference.to_string(),
                    });
                }

                let mut features = Vec::new();
                for line in block.lines() {
                    if let Some(feature) = Feature::from_gff_line(line)? {
                        features.push(feature);
                    }
                }
                Ok(features)
            }
        }
    }

    fn build_tree(features: Vec<Feature>) -> FeatureTree {
        let intervals = features
            .into_iter()
            .map(|feature| Interval {
                start: feature.start,
                end: feature.end,
                val: feature.feature_id.map(Arc::from),
            })
            .collect();
        AIList::build(intervals)
    }
}

impl FeatureLookup for FeatureIndex {
    fn overlaps(
        &mut self,
        reference: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<Overlap>, FeatureIndexError> {
        if self.trees.contains_key(reference) {
            self.hits += 1;
        } else {
            self.misses += 1;
            let tree = Self::build_tree(self.load_features(reference)?);
            self.trees.insert(reference.to_string(), tree);
        }

        let Some(tree) = self.trees.get(reference) else {
            return Ok(Vec::new());
        };

        let mut overlaps: Vec<Overlap> = tree
            .find_iter(start, end)
            .map(|iv| Overlap {
                begin: iv.start,
                end: iv.end,
                feature_id: iv.val.clone(),
            })
            .collect();
        // sublist order is an implementation detail, callers get coordinate order
        overlaps.sort_by(|a, b| (a.begin, a.end, &a.feature_id).cmp(&(b.begin, b.end, &b.feature_id)));
        Ok(overlaps)
    }

    fn clear_cache(&mut self) {
        debug!("Clearing feature cache ({} references)", self.trees.len());
        self.trees.clear();
        self.hits = 0;
        self.misses = 0;
    }

    fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            cached_references: self.trees.len(),
        }
    }
}

fn parse_index_line(line: &str) -> Result<IndexEntry, FeatureIndexError> {
    let malformed = |reason: &str| FeatureIndexError::MalformedIndex {
        line: line.to_string(),
        reason: reason.to_string(),
    };

    let mut fields = line.split('\t');
    let seqid = fields.next().ok_or_else(|| malformed("missing seqid"))?;
    let offset = fields
        .next()
        .ok_or_else(|| malformed("missing offset"))?
        .parse::<u64>()
        .map_err(|_| malformed("offset is not an integer"))?;
    let length = fields
        .next()
        .ok_or_else(|| malformed("missing length"))?
        .parse::<u64>()
        .map_err(|_| malformed("length is not an integer"))?;

    Ok(IndexEntry {
        seqid: seqid.to_string(),
        offset,
        length,
    })
}

///
/// Scan a GFF file and compute the byte block of every reference.
///
/// Comment lines inside a block are carried along; features of one
/// reference must be contiguous.
///
pub fn build_gff_index(gff: &Path) -> Result<Vec<IndexEntry>, FeatureIndexError> {
    let mut reader = BufReader::new(File::open(gff)?);
    let mut entries: Vec<IndexEntry> = Vec::new();
    let mut seen: HashSet<String> = HashSet::default();

    let mut line = String::new();
    let mut offset = 0u64;
    loop {
        line.clear();
        let n_bytes = reader.read_line(&mut line)? as u64;
        if n_bytes == 0 {
            break;
        }

        if let Some(feature) = Feature::from_gff_line(&line)? {
            match entries.last_mut() {
                Some(current) if current.seqid == feature.seqid => {
                    current.length = offset + n_bytes - current.offset;
                }
                _ => {
                    if !seen.insert(feature.seqid.clone()) {
                        return Err(FeatureIndexError::UngroupedReference(feature.seqid));
                    }
                    entries.push(IndexEntry {
                        seqid: feature.seqid,
                        offset,
                        length: n_bytes,
                    });
                }
            }
        }
        offset += n_bytes;
    }

    Ok(entries)
}

/// Build the block index of `gff` and write it to `index`.
pub fn write_gff_index(gff: &Path, index: &Path) -> Result<usize, FeatureIndexError> {
    let entries = build_gff_index(gff)?;
    let mut writer = io::BufWriter::new(File::create(index)?);
    for entry in entries.iter() {
        writeln!(writer, "{}\t{}\t{}", entry.seqid, entry.offset, entry.length)?;
    }
    writer.flush()?;
    Ok(entries.len())
}
