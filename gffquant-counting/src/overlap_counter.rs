use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::{debug, info};

use gffquant_io::AlignmentSource;
use gffquant_overlaprs::{FeatureLookup, Overlap};

use crate::errors::{CountingError, Result};
use crate::events::{CountEvent, RegionHit, SeqHit, Strand};
use crate::manager::{CountKey, CountManager, reference_name};
use crate::modes::DistributionMode;
use crate::tables::{CountTables, FeatureCountRow, SeqCountRow};

/// Feature hits of one ambiguous read, `(begin, end, reverse_bit)` per reference.
pub type AmbiguousHits = BTreeMap<usize, BTreeSet<(u32, u32, Strand)>>;

///
/// Turns overlap results into count events and owns the resulting counts.
///
/// `unannotated_reads` collects unannotated reads found outside the counters
/// (e.g. ambiguous reads that never overlapped a feature in the first pass).
///
#[derive(Debug, Clone)]
pub struct OverlapCounter {
    counts: CountManager,
    pub unannotated_reads: u64,
}

impl OverlapCounter {
    pub fn new(region_counts: bool, strand_specific: bool) -> Self {
        OverlapCounter {
            counts: CountManager::new(region_counts, strand_specific),
            unannotated_reads: 0,
        }
    }

    pub fn counts(&self) -> &CountManager {
        &self.counts
    }

    ///
    /// Count one unique read (or fragment) against its overlaps.
    ///
    /// `strand` is the reverse bit of a single alignment and `None` for a
    /// merged fragment. Features sharing coordinates are counted once.
    ///
    pub fn update_unique(&mut self, rid: usize, overlaps: &[Overlap], strand: Option<Strand>) {
        let event = if overlaps.is_empty() {
            CountEvent::unannotated(rid, 1)
        } else {
            let regions: BTreeSet<(u32, u32)> =
                overlaps.iter().map(|ovl| (ovl.begin, ovl.end)).collect();
            CountEvent {
                rid,
                seq_hits: vec![SeqHit {
                    strand,
                    weight: 1.0,
                }],
                region_hits: regions
                    .into_iter()
                    .map(|(begin, end)| RegionHit {
                        begin,
                        end,
                        strand,
                        weight: 1.0,
                    })
                    .collect(),
                unannotated: 0,
            }
        };
        self.counts.update_counts(std::iter::once(event), false);
    }

    ///
    /// Distribute one ambiguous read over its feature hits.
    ///
    /// # Arguments
    /// - hits_by_rid: deduplicated feature hits per reference
    /// - n_align: informative alignments of the read, the `1overN` denominator
    /// - n_unannotated: alignments of the read that overlapped nothing
    /// - mode: `dist1` or `1overN`; other modes are not resolved in groups
    pub fn update_ambiguous(
        &mut self,
        hits_by_rid: &AmbiguousHits,
        n_align: usize,
        n_unannotated: usize,
        mode: DistributionMode,
    ) -> Result<()> {
        if !mode.requires_grouping() {
            return Err(CountingError::UngroupedMode(mode));
        }

        if n_align == 0 || hits_by_rid.values().all(BTreeSet::is_empty) {
            if n_unannotated > 0 {
                // the read counts once, whichever reference it sits on
                let rid = hits_by_rid.keys().next().copied().unwrap_or_default();
                self.counts
                    .update_counts(std::iter::once(CountEvent::unannotated(rid, 1)), true);
            }
            return Ok(());
        }

        let events: Vec<CountEvent> = match mode {
            DistributionMode::OneOverN => one_over_n_events(hits_by_rid, n_align),
            _ => dist1_events(hits_by_rid),
        };
        self.counts.update_counts(events, true);

        Ok(())
    }

    /// Unannotated reads from the counters plus the externally added ones.
    pub fn total_unannotated(&self) -> u64 {
        self.counts.unannotated_reads() + self.unannotated_reads
    }

    ///
    /// Assemble the count tables, naming references through `source` and
    /// features through `lookup`.
    ///
    pub fn finalize(
        &self,
        source: &dyn AlignmentSource,
        lookup: &mut dyn FeatureLookup,
    ) -> Result<CountTables> {
        let strand_specific = self.counts.strand_specific();
        let rids = self.counts.rids();

        let mut seq_rows = Vec::with_capacity(rids.len());
        for &rid in rids.iter() {
            let reference = source
                .get_reference(rid)
                .ok_or(CountingError::UnknownReference(rid))?;
            let (uniq, ambig) = self.counts.counts_for(CountKey::Sequence(rid), strand_specific);
            seq_rows.push(SeqCountRow {
                seqid: reference.name.clone(),
                length: reference.length,
                uniq,
                ambig,
            });
        }

        let feature_rows = match self.counts.region_counts() {
            true => {
                let mut rows = Vec::new();
                for &rid in rids.iter() {
                    let seqid = reference_name(source, rid)?;
                    for (begin, end) in self.counts.regions_for(rid) {
                        let (uniq, ambig) = self
                            .counts
                            .counts_for(CountKey::Region(rid, (begin, end)), strand_specific);
                        rows.push(FeatureCountRow {
                            seqid: seqid.to_string(),
                            start: begin + 1,
                            end,
                            feature_id: feature_label(lookup, seqid, begin, end)?,
                            uniq,
                            ambig,
                        });
                    }
                }
                Some(rows)
            }
            false => None,
        };

        let unannotated = self.total_unannotated();
        info!("Unannotated reads: {unannotated}");

        Ok(CountTables {
            strand_specific,
            unannotated,
            seq_rows,
            feature_rows,
        })
    }

    ///
    /// Finalize and write the count tables under `prefix`.
    ///
    pub fn dump(
        &self,
        prefix: &str,
        source: &dyn AlignmentSource,
        lookup: &mut dyn FeatureLookup,
        compress: bool,
    ) -> Result<Vec<PathBuf>> {
        self.finalize(source, lookup)?.write(prefix, compress)
    }
}

///
/// Each hit gets `1/n_align`; a feature hit by k alignments ends up with k/n_align.
///
/// Hits are kept per strand while `n_align` counts positions only, so a read
/// hitting one feature on both strands gives that feature `2/n_align`. Mates
/// of an ambiguous pair landing on the same feature are not reconciled either;
/// `dist1` caps the feature at its single share.
///
fn one_over_n_events(hits_by_rid: &AmbiguousHits, n_align: usize) -> Vec<CountEvent> {
    let weight = 1.0 / n_align as f64;

    hits_by_rid
        .iter()
        .filter(|(_, hits)| !hits.is_empty())
        .map(|(&rid, hits)| CountEvent {
            rid,
            seq_hits: hits
                .iter()
                .map(|&(_, _, strand)| SeqHit {
                    strand: Some(strand),
                    weight,
                })
                .collect(),
            region_hits: hits
                .iter()
                .map(|&(begin, end, strand)| RegionHit {
                    begin,
                    end,
                    strand: Some(strand),
                    weight,
                })
                .collect(),
            unannotated: 0,
        })
        .collect()
}

/// Each distinct feature gets an equal share of one read, split over its strands.
fn dist1_events(hits_by_rid: &AmbiguousHits) -> Vec<CountEvent> {
    let features: BTreeMap<(usize, u32, u32), Vec<Strand>> =
        hits_by_rid
            .iter()
            .fold(BTreeMap::new(), |mut features, (&rid, hits)| {
                for &(begin, end, strand) in hits.iter() {
                    features
                        .entry((rid, begin, end))
                        .or_insert_with(Vec::new)
                        .push(strand);
                }
                features
            });
    let feature_weight = 1.0 / features.len() as f64;

    let mut events: BTreeMap<usize, CountEvent> = BTreeMap::new();
    for ((rid, begin, end), strands) in features {
        let weight = feature_weight / strands.len() as f64;
        let event = events.entry(rid).or_insert_with(|| CountEvent {
            rid,
            ..Default::default()
        });
        for strand in strands {
            event.seq_hits.push(SeqHit {
                strand: Some(strand),
                weight,
            });
            event.region_hits.push(RegionHit {
                begin,
                end,
                strand: Some(strand),
                weight,
            });
        }
    }

    events.into_values().collect()
}

/// Ids of the features at exactly `[begin, end)`, comma-joined, or `.`.
fn feature_label(
    lookup: &mut dyn FeatureLookup,
    seqid: &str,
    begin: u32,
    end: u32,
) -> Result<String> {
    let ids: BTreeSet<String> = lookup
        .overlaps(seqid, begin, end)?
        .into_iter()
        .filter(|ovl| ovl.begin == begin && ovl.end == end)
        .filter_map(|ovl| ovl.feature_id.map(|id| id.to_string()))
        .collect();

    if ids.is_empty() {
        debug!("No feature id for {seqid}:{begin}-{end}");
        return Ok(".".to_string());
    }
    Ok(ids.into_iter().collect::<Vec<_>>().join(","))
}
