use std::collections::BTreeSet;
use std::fmt::{Debug, Display};

use fxhash::FxHashMap as HashMap;

use crate::events::{CountEvent, PLUS_STRAND, Strand};

/// A count cell: integer for unique counters, real-valued for ambiguous ones.
pub trait Tally: Copy + Default + PartialEq + Display + Debug {
    fn add_weight(&mut self, weight: f64);
}

impl Tally for u64 {
    /// Unique events only ever carry unit weights.
    fn add_weight(&mut self, weight: f64) {
        *self += weight.round() as u64;
    }
}

impl Tally for f64 {
    fn add_weight(&mut self, weight: f64) {
        *self += weight;
    }
}

/// Strand part of a counter key; `None` unless counting strand-specifically.
///
/// Fragments have no strand and are recorded as plus in strand-specific mode.
fn strand_key(strand_specific: bool, strand: Option<Strand>) -> Option<Strand> {
    strand_specific.then(|| strand.unwrap_or(PLUS_STRAND))
}

///
/// Counts per reference sequence, keyed by `(rid, strand)`.
///
#[derive(Debug, Clone, Default)]
pub struct SeqCounter<W: Tally> {
    counts: HashMap<(usize, Option<Strand>), W>,
    strand_specific: bool,
    pub unannotated_reads: u64,
}

impl<W: Tally> SeqCounter<W> {
    pub fn new(strand_specific: bool) -> Self {
        SeqCounter {
            counts: HashMap::default(),
            strand_specific,
            unannotated_reads: 0,
        }
    }

    pub fn apply(&mut self, event: &CountEvent) {
        for hit in event.seq_hits.iter() {
            let key = (event.rid, strand_key(self.strand_specific, hit.strand));
            self.counts.entry(key).or_default().add_weight(hit.weight);
        }
        self.unannotated_reads += event.unannotated;
    }

    ///
    /// Apply each event as it passes through and hand it on unchanged.
    ///
    /// Nothing is counted until the returned iterator is drained.
    ///
    pub fn update_counts<I>(&mut self, events: I) -> impl Iterator<Item = CountEvent>
    where
        I: IntoIterator<Item = CountEvent>,
    {
        events.into_iter().map(move |event| {
            self.apply(&event);
            event
        })
    }

    pub fn get(&self, rid: usize, strand: Option<Strand>) -> W {
        let key = (rid, strand_key(self.strand_specific, strand));
        self.counts.get(&key).copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn rids(&self) -> BTreeSet<usize> {
        self.counts.keys().map(|(rid, _)| *rid).collect()
    }

    /// All cells ordered by rid, then strand.
    pub fn sorted_counts(&self) -> Vec<(usize, Option<Strand>, W)> {
        let mut cells: Vec<_> = self
            .counts
            .iter()
            .map(|(&(rid, strand), &count)| (rid, strand, count))
            .collect();
        cells.sort_by_key(|&(rid, strand, _)| (rid, strand));
        cells
    }
}

type RegionKey = (u32, u32, Option<Strand>);

///
/// Counts per feature, grouped by the reference the feature lives on.
///
#[derive(Debug, Clone, Default)]
pub struct RegionCounter<W: Tally> {
    regions: HashMap<usize, HashMap<RegionKey, W>>,
    strand_specific: bool,
    pub unannotated_reads: u64,
}

impl<W: Tally> RegionCounter<W> {
    pub fn new(strand_specific: bool) -> Self {
        RegionCounter {
            regions: HashMap::default(),
            strand_specific,
            unannotated_reads: 0,
        }
    }

    pub fn apply(&mut self, event: &CountEvent) {
        if !event.region_hits.is_empty() {
            let counter = self.regions.entry(event.rid).or_default();
            for hit in event.region_hits.iter() {
                let key = (
                    hit.begin,
                    hit.end,
                    strand_key(self.strand_specific, hit.strand),
                );
                counter.entry(key).or_default().add_weight(hit.weight);
            }
        }
        self.unannotated_reads += event.unannotated;
    }

    /// See [`SeqCounter::update_counts`].
    pub fn update_counts<I>(&mut self, events: I) -> impl Iterator<Item = CountEvent>
    where
        I: IntoIterator<Item = CountEvent>,
    {
        events.into_iter().map(move |event| {
            self.apply(&event);
            event
        })
    }

    pub fn get(&self, rid: usize) -> Option<&HashMap<RegionKey, W>> {
        self.regions.get(&rid)
    }

    pub fn get_count(&self, rid: usize, region: (u32, u32), strand: Option<Strand>) -> W {
        let key = (region.0, region.1, strand_key(self.strand_specific, strand));
        self.regions
            .get(&rid)
            .and_then(|counter| counter.get(&key))
            .copied()
            .unwrap_or_default()
    }

    /// Feature coordinates recorded under `rid`, strand collapsed.
    pub fn regions(&self, rid: usize) -> BTreeSet<(u32, u32)> {
        self.regions
            .get(&rid)
            .map(|counter| counter.keys().map(|&(begin, end, _)| (begin, end)).collect())
            .unwrap_or_default()
    }

    pub fn rids(&self) -> BTreeSet<usize> {
        self.regions.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// All cells ordered by rid, coordinates, then strand.
    pub fn sorted_counts(&self) -> Vec<(usize, RegionKey, W)> {
        let mut cells: Vec<_> = self
            .regions
            .iter()
            .flat_map(|(&rid, counter)| counter.iter().map(move |(&key, &count)| (rid, key, count)))
            .collect();
        cells.sort_by_key(|&(rid, key, _)| (rid, key));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::events::{MINUS_STRAND, RegionHit, SeqHit};

    #[fixture]
    fn event() -> CountEvent {
        CountEvent {
            rid: 2,
            seq_hits: vec![SeqHit {
                strand: Some(MINUS_STRAND),
                weight: 1.0,
            }],
            region_hits: vec![
                RegionHit {
                    begin: 10,
                    end: 20,
                    strand: Some(MINUS_STRAND),
                    weight: 1.0,
                },
                RegionHit {
                    begin: 15,
                    end: 40,
                    strand: Some(MINUS_STRAND),
                    weight: 1.0,
                },
            ],
            unannotated: 0,
        }
    }

    #[rstest]
    fn test_update_is_lazy(event: CountEvent) {
        let mut counter: SeqCounter<u64> = SeqCounter::new(false);
        let stream = counter.update_counts(vec![event]);
        drop(stream);
        assert!(counter.is_empty());
    }

    #[rstest]
    fn test_chained_stages_apply_once(event: CountEvent) {
        let mut seq: SeqCounter<u64> = SeqCounter::new(true);
        let mut region: RegionCounter<u64> = RegionCounter::new(true);
        let events = vec![event.clone(), event, CountEvent::unannotated(2, 1)];

        let passed = region.update_counts(seq.update_counts(events)).count();

        assert_eq!(passed, 3);
        assert_eq!(seq.get(2, Some(MINUS_STRAND)), 2);
        assert_eq!(seq.get(2, Some(PLUS_STRAND)), 0);
        assert_eq!(region.get_count(2, (10, 20), Some(MINUS_STRAND)), 2);
        assert_eq!(region.get_count(2, (15, 40), Some(MINUS_STRAND)), 2);
        assert_eq!(seq.unannotated_reads, 1);
        assert_eq!(region.unannotated_reads, 1);
        assert_eq!(region.regions(2), BTreeSet::from([(10, 20), (15, 40)]));
    }

    #[rstest]
    fn test_strand_agnostic_collapses(event: CountEvent) {
        let mut seq: SeqCounter<f64> = SeqCounter::new(false);
        let mut plus = event.clone();
        plus.seq_hits[0].strand = Some(PLUS_STRAND);
        seq.apply(&event);
        seq.apply(&plus);
        assert_eq!(seq.get(2, None), 2.0);
        assert_eq!(seq.sorted_counts(), vec![(2, None, 2.0)]);
    }

    #[rstest]
    fn test_fragments_count_as_plus() {
        let mut seq: SeqCounter<u64> = SeqCounter::new(true);
        seq.apply(&CountEvent {
            rid: 0,
            seq_hits: vec![SeqHit {
                strand: None,
                weight: 1.0,
            }],
            ..Default::default()
        });
        assert_eq!(seq.get(0, Some(PLUS_STRAND)), 1);
        assert_eq!(seq.get(0, None), 1);
    }
}
