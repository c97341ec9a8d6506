/// Strand marker of a count: the alignment's reverse-complement flag bit.
///
/// This follows SAM flags 0x10/0x20, so "plus" means the reverse bit is unset.
/// It is not the biological sense strand of a reversed mate.
pub type Strand = bool;

pub const PLUS_STRAND: Strand = false;
pub const MINUS_STRAND: Strand = true;

/// Weight added to the sequence counter of the event's reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeqHit {
    pub strand: Option<Strand>,
    pub weight: f64,
}

/// Weight added to one feature of the event's reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionHit {
    pub begin: u32,
    pub end: u32,
    pub strand: Option<Strand>,
    pub weight: f64,
}

///
/// Everything one counting step contributes for one reference.
///
/// Both the sequence and the region counter consume the same event; the
/// unannotated increment is decided once, by whoever builds the event, so the
/// two counter families cannot disagree about it.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountEvent {
    pub rid: usize,
    pub seq_hits: Vec<SeqHit>,
    pub region_hits: Vec<RegionHit>,
    pub unannotated: u64,
}

impl CountEvent {
    pub fn unannotated(rid: usize, n_reads: u64) -> Self {
        CountEvent {
            rid,
            unannotated: n_reads,
            ..Default::default()
        }
    }
}
