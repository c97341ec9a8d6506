use std::fmt::{self, Display};

use fxhash::FxHashMap as HashMap;

use gffquant_core::consts::REVCOMP_ALIGNMENT;
use gffquant_core::models::{AlignmentRecord, Fragment};
use gffquant_counting::Strand;

/// Why a read contributed nothing to the unique counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// the mate points at a different reference than the cached mate sits on
    MateReferenceMismatch {
        qname: String,
        cached_rid: usize,
        rnext: Option<usize>,
    },
    /// more than two primary alignments were cached for one read
    TooManyAlignments { qname: String, n_alignments: usize },
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MateReferenceMismatch {
                qname,
                cached_rid,
                rnext,
            } => write!(
                f,
                "alignment {qname} seems to be corrupted: cached mate on rid={cached_rid}, mate reference {}",
                rnext.map_or("unset".to_string(), |rid| rid.to_string())
            ),
            SkipReason::TooManyAlignments {
                qname,
                n_alignments,
            } => write!(
                f,
                "more than two primary alignments for {qname} ({n_alignments}), ignoring"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// first mate seen, kept until its partner arrives
    Deferred,
    Counted(Fragment),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// a leftover single mate (`strand` set) or a merged pair (`strand` unset)
    Counted {
        start: u32,
        end: u32,
        strand: Option<Strand>,
    },
    Skipped(SkipReason),
}

/// A mate waiting for its partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedMate {
    pub rid: usize,
    pub start: u32,
    pub end: u32,
    pub flag: u16,
}

impl From<&AlignmentRecord> for CachedMate {
    fn from(aln: &AlignmentRecord) -> Self {
        CachedMate {
            rid: aln.rid,
            start: aln.start,
            end: aln.end,
            flag: aln.flag,
        }
    }
}

///
/// Properly paired unique mates of the current reference, keyed by read name.
///
/// The cache only ever holds mates of one reference; its owner flushes it
/// whenever the reference changes.
///
#[derive(Debug, Default)]
pub struct UniqueCache {
    mates: HashMap<String, Vec<CachedMate>>,
}

impl UniqueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mates.is_empty()
    }

    pub fn push(&mut self, qname: &str, mate: CachedMate) {
        self.mates.entry(qname.to_string()).or_default().push(mate);
    }

    ///
    /// Pair `aln` with its cached mate, or cache it if it is the first mate seen.
    ///
    /// A mate whose reference does not match the cached one drops the whole
    /// read from the cache.
    ///
    pub fn merge_mate(&mut self, aln: &AlignmentRecord) -> MergeOutcome {
        let Some(cached) = self.mates.get(&aln.qname).and_then(|mates| mates.first().copied())
        else {
            self.push(&aln.qname, CachedMate::from(aln));
            return MergeOutcome::Deferred;
        };

        self.mates.remove(&aln.qname);

        if aln.rnext != Some(cached.rid) {
            return MergeOutcome::Skipped(SkipReason::MateReferenceMismatch {
                qname: aln.qname.clone(),
                cached_rid: cached.rid,
                rnext: aln.rnext,
            });
        }

        MergeOutcome::Counted(Fragment::from_mates(
            cached.rid,
            (cached.start, cached.end),
            (aln.start, aln.end),
        ))
    }

    ///
    /// Resolve everything left in the cache and empty it.
    ///
    /// Outcomes are ordered by read name.
    ///
    pub fn flush(&mut self) -> Vec<(String, FlushOutcome)> {
        let mut outcomes: Vec<(String, FlushOutcome)> = self
            .mates
            .drain()
            .map(|(qname, mates)| {
                let outcome = match mates.as_slice() {
                    [single] => FlushOutcome::Counted {
                        start: single.start,
                        end: single.end,
                        strand: Some(single.flag & REVCOMP_ALIGNMENT != 0),
                    },
                    [mate1, mate2] => {
                        let fragment = Fragment::from_mates(
                            mate1.rid,
                            (mate1.start, mate1.end),
                            (mate2.start, mate2.end),
                        );
                        FlushOutcome::Counted {
                            start: fragment.start,
                            end: fragment.end,
                            strand: None,
                        }
                    }
                    _ => FlushOutcome::Skipped(SkipReason::TooManyAlignments {
                        qname: qname.clone(),
                        n_alignments: mates.len(),
                    }),
                };
                (qname, outcome)
            })
            .collect();
        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        outcomes
    }
}
