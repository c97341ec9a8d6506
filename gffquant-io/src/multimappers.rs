//! Detection of multi-mapped read names.
//!
//! A read is ambiguous when one of its records is flagged secondary or when
//! the same mate segment (first, second, or unpaired) is aligned more than
//! once. Supplementary and unmapped records are not passed in here.

use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

use gffquant_core::consts::{FIRST_IN_PAIR_FLAG, SECOND_IN_PAIR_FLAG, SECONDARY_ALN_FLAG};

fn segment_bit(flag: u16) -> u8 {
    if flag & FIRST_IN_PAIR_FLAG != 0 {
        0b001
    } else if flag & SECOND_IN_PAIR_FLAG != 0 {
        0b010
    } else {
        0b100
    }
}

/// Tracks which segments of one read have been observed.
#[derive(Debug, Default, Clone, Copy)]
struct SegmentTally {
    seen: u8,
    ambiguous: bool,
}

impl SegmentTally {
    fn observe(&mut self, flag: u16) {
        let bit = segment_bit(flag);
        if flag & SECONDARY_ALN_FLAG != 0 || self.seen & bit != 0 {
            self.ambiguous = true;
        }
        self.seen |= bit;
    }
}

///
/// Scan `(qname, flag)` pairs of an archive in any order.
///
/// Keeps a tally per read name for the whole scan.
///
pub fn scan_unordered<I, E>(records: I) -> Result<HashSet<String>, E>
where
    I: IntoIterator<Item = Result<(String, u16), E>>,
{
    let mut tallies: HashMap<String, SegmentTally> = HashMap::default();
    for record in records {
        let (qname, flag) = record?;
        tallies.entry(qname).or_default().observe(flag);
    }

    Ok(tallies
        .into_iter()
        .filter_map(|(qname, tally)| tally.ambiguous.then_some(qname))
        .collect())
}

///
/// Scan `(qname, flag)` pairs of a name-sorted archive.
///
/// Only the current read group is tallied, so memory is bounded by the
/// number of ambiguous names.
///
pub fn scan_name_sorted<I, E>(records: I) -> Result<HashSet<String>, E>
where
    I: IntoIterator<Item = Result<(String, u16), E>>,
{
    let mut ambiguous = HashSet::default();
    let mut current: Option<(String, SegmentTally)> = None;

    for record in records {
        let (qname, flag) = record?;
        match current.as_mut() {
            Some((name, tally)) if *name == qname => tally.observe(flag),
            _ => {
                if let Some((name, tally)) = current.take() {
                    if tally.ambiguous {
                        ambiguous.insert(name);
                    }
                }
                let mut tally = SegmentTally::default();
                tally.observe(flag);
                current = Some((qname, tally));
            }
        }
    }

    if let Some((name, tally)) = current {
        if tally.ambiguous {
            ambiguous.insert(name);
        }
    }

    Ok(ambiguous)
}
