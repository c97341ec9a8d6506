use std::collections::BTreeSet;

use indicatif::ProgressBar;

use gffquant_core::consts::{FIRST_IN_PAIR_FLAG, REVCOMP_ALIGNMENT, SECOND_IN_PAIR_FLAG};
use gffquant_counting::{AmbiguousHits, DistributionMode, OverlapCounter};

use crate::errors::Result;
use crate::spill::SpillRow;

/// One informative spill row: a feature hit of one alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct AlignmentHit {
    rid: usize,
    start: u32,
    end: u32,
    flag: u16,
}

impl AlignmentHit {
    fn position(&self) -> (usize, u32, u32) {
        (self.rid, self.start, self.end)
    }
}

///
/// All spilled hits of one multi-mapped read (or read pair).
///
/// The first hit flagged as mate 1 and the first flagged as mate 2 take the
/// primary slots; everything else is a secondary. Overlapping mates are not
/// merged, so a feature hit by both mates of a pair is weighted twice.
///
#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousAlignmentGroup {
    qname_id: u64,
    primary1: Option<AlignmentHit>,
    primary2: Option<AlignmentHit>,
    secondaries: Vec<AlignmentHit>,
    informative: BTreeSet<(usize, u32, u32)>,
    unannotated: usize,
}

impl AmbiguousAlignmentGroup {
    pub fn new(row: &SpillRow) -> Self {
        let mut group = AmbiguousAlignmentGroup {
            qname_id: row.qname_id,
            primary1: None,
            primary2: None,
            secondaries: Vec::new(),
            informative: BTreeSet::new(),
            unannotated: 0,
        };
        group.add_alignment(row);
        group
    }

    pub fn qname_id(&self) -> u64 {
        self.qname_id
    }

    pub fn add_alignment(&mut self, row: &SpillRow) {
        let Some((start, end)) = row.overlap else {
            self.unannotated += 1;
            return;
        };

        let hit = AlignmentHit {
            rid: row.rid,
            start,
            end,
            flag: row.flag,
        };
        self.informative.insert(hit.position());

        if row.flag & FIRST_IN_PAIR_FLAG != 0 && self.primary1.is_none() {
            self.primary1 = Some(hit);
        } else if row.flag & SECOND_IN_PAIR_FLAG != 0 && self.primary2.is_none() {
            self.primary2 = Some(hit);
        } else {
            self.secondaries.push(hit);
        }
    }

    /// Number of distinct `(rid, start, end)` hits, the `1overN` denominator.
    pub fn n_align(&self) -> usize {
        self.informative.len()
    }

    /// Rows without a feature hit.
    pub fn n_unannotated(&self) -> usize {
        self.unannotated
    }

    ///
    /// Deduplicated hits per reference, as `(start, end, reverse_bit)`.
    ///
    /// A mate-2 primary at the same position as the mate-1 primary is taken
    /// to be the same alignment reported twice and dropped.
    ///
    pub fn hits_by_rid(&self) -> AmbiguousHits {
        let primary2 = match (self.primary1, self.primary2) {
            (Some(p1), Some(p2)) if p1.position() == p2.position() => None,
            (_, p2) => p2,
        };

        let alignments: BTreeSet<AlignmentHit> = [self.primary1, primary2]
            .into_iter()
            .flatten()
            .chain(self.secondaries.iter().copied())
            .collect();

        let mut hits = AmbiguousHits::new();
        for aln in alignments {
            hits.entry(aln.rid).or_default().insert((
                aln.start,
                aln.end,
                aln.flag & REVCOMP_ALIGNMENT != 0,
            ));
        }
        hits
    }

    /// Hand the group to `counter`. Returns the group's `n_align`.
    pub fn resolve(&self, counter: &mut OverlapCounter, mode: DistributionMode) -> Result<usize> {
        counter.update_ambiguous(&self.hits_by_rid(), self.n_align(), self.unannotated, mode)?;
        Ok(self.n_align())
    }
}

///
/// Resolve runs of rows sharing a `qname_id`, one group at a time.
///
/// `rows` must already be sorted by `qname_id`. Returns the total number of
/// informative alignments resolved.
///
pub fn resolve_all<I>(
    rows: I,
    counter: &mut OverlapCounter,
    mode: DistributionMode,
    progress: &ProgressBar,
) -> Result<usize>
where
    I: IntoIterator<Item = SpillRow>,
{
    let mut n_align = 0;
    let mut current: Option<AmbiguousAlignmentGroup> = None;

    for row in rows {
        progress.inc(1);
        match current.as_mut() {
            Some(group) if group.qname_id() == row.qname_id => group.add_alignment(&row),
            _ => {
                if let Some(group) = current.replace(AmbiguousAlignmentGroup::new(&row)) {
                    n_align += group.resolve(counter, mode)?;
                }
            }
        }
    }

    if let Some(group) = current {
        n_align += group.resolve(counter, mode)?;
    }

    Ok(n_align)
}
