use std::path::Path;
use std::time::Instant;

use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
use log::{info, warn};

use gffquant_core::consts::SUPPL_ALN_FLAG;
use gffquant_core::models::AlignmentRecord;
use gffquant_counting::{DistributionMode, OverlapCounter, Strand};
use gffquant_io::{AlignmentFilter, AlignmentSource};
use gffquant_overlaprs::FeatureLookup;

use crate::errors::{QuantError, Result};
use crate::mates::{FlushOutcome, MergeOutcome, UniqueCache};
use crate::spill::{SpillRow, SpillWriter};

/// What the first pass saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhaseOneSummary {
    /// alignments taken from the source after filtering
    pub alignments: u64,
    /// multi-mapped reads none of whose alignments overlapped a feature
    pub unannotated_ambiguous: u64,
    pub spill_rows: u64,
}

///
/// The first pass over the alignment archive.
///
/// Unique reads are counted right away; properly paired unique mates are
/// merged into fragments first. With a grouping distribution mode, the
/// feature hits of multi-mapped reads go to the spill file instead, keyed by a
/// per-run read id.
///
pub struct UniquePass<'a, L: FeatureLookup + ?Sized> {
    mode: DistributionMode,
    lookup: &'a mut L,
    counter: &'a mut OverlapCounter,
    spill: Option<SpillWriter>,
    cache: UniqueCache,
    qname_ids: HashMap<String, u64>,
    unannotated_candidates: HashSet<String>,
}

impl<'a, L: FeatureLookup + ?Sized> UniquePass<'a, L> {
    ///
    /// Set up the pass. The spill file at `spill_path` is only created when
    /// `mode` defers multi-mapped reads.
    ///
    pub fn new(
        mode: DistributionMode,
        lookup: &'a mut L,
        counter: &'a mut OverlapCounter,
        spill_path: &Path,
    ) -> Result<Self> {
        let spill = match mode.requires_grouping() {
            true => Some(SpillWriter::create(spill_path)?),
            false => None,
        };

        Ok(UniquePass {
            mode,
            lookup,
            counter,
            spill,
            cache: UniqueCache::new(),
            qname_ids: HashMap::default(),
            unannotated_candidates: HashSet::default(),
        })
    }

    fn count(
        &mut self,
        rid: usize,
        reference: &str,
        start: u32,
        end: u32,
        strand: Option<Strand>,
    ) -> Result<()> {
        let overlaps = self.lookup.overlaps(reference, start, end)?;
        self.counter.update_unique(rid, &overlaps, strand);
        Ok(())
    }

    /// Count what is left in the mate cache for `rid`, then empty it.
    fn flush(&mut self, rid: usize, reference: &str) -> Result<()> {
        for (_, outcome) in self.cache.flush() {
            match outcome {
                FlushOutcome::Counted { start, end, strand } => {
                    self.count(rid, reference, start, end, strand)?
                }
                FlushOutcome::Skipped(reason) => warn!("{reason}"),
            }
        }
        Ok(())
    }

    /// Look up a multi-mapped alignment now and spill its feature hits.
    fn spill_ambiguous(
        &mut self,
        ordinal: u64,
        aln: &AlignmentRecord,
        reference: &str,
    ) -> Result<()> {
        let overlaps = self.lookup.overlaps(reference, aln.start, aln.end)?;
        if overlaps.is_empty() {
            self.unannotated_candidates.insert(aln.qname.clone());
            return Ok(());
        }

        let next_id = self.qname_ids.len() as u64;
        let qname_id = *self.qname_ids.entry(aln.qname.clone()).or_insert(next_id);

        if let Some(spill) = self.spill.as_mut() {
            for ovl in overlaps.iter() {
                spill.write_row(&SpillRow {
                    qname_id,
                    ordinal,
                    rid: aln.rid,
                    overlap: Some((ovl.begin, ovl.end)),
                    flag: aln.flag,
                })?;
            }
        }
        Ok(())
    }

    ///
    /// Stream `source` once, in archive order.
    ///
    /// Records of one reference must be contiguous; the mate cache is flushed
    /// every time the reference changes.
    ///
    pub fn process(mut self, source: &dyn AlignmentSource) -> Result<PhaseOneSummary> {
        let start_time = Instant::now();
        let filter = AlignmentFilter {
            allow_multiple: self.mode.allows_multiple(),
            allow_unique: true,
            excluded_flags: SUPPL_ALN_FLAG,
        };

        let mut current_rid: Option<usize> = None;
        let mut reference = String::new();
        let mut n_alignments = 0u64;

        for item in source.alignments(filter)? {
            let (ordinal, aln) = item?;
            n_alignments += 1;

            if current_rid != Some(aln.rid) {
                if let Some(rid) = current_rid {
                    self.flush(rid, &reference)?;
                }
                reference = source
                    .get_reference(aln.rid)
                    .ok_or(QuantError::UnknownReference(aln.rid))?
                    .name
                    .clone();
                info!(
                    "New reference: {} ({}/{}). {} alignments processed.",
                    reference,
                    aln.rid,
                    source.n_references(),
                    ordinal
                );
                current_rid = Some(aln.rid);
            }

            if aln.is_ambiguous() && self.spill.is_some() {
                self.spill_ambiguous(ordinal, &aln, &reference)?;
                continue;
            }

            let (start, end, strand) = if aln.is_properly_paired_unique() {
                match self.cache.merge_mate(&aln) {
                    MergeOutcome::Deferred => continue,
                    MergeOutcome::Skipped(reason) => {
                        warn!("{reason}");
                        continue;
                    }
                    MergeOutcome::Counted(fragment) => (fragment.start, fragment.end, None),
                }
            } else {
                // single-end unique reads, and multi-mapped ones under all1
                (aln.start, aln.end, Some(aln.is_reverse()))
            };

            self.count(aln.rid, &reference, start, end, strand)?;
        }

        if let Some(rid) = current_rid {
            self.flush(rid, &reference)?;
        }

        let spill_rows = match self.spill.take() {
            Some(spill) => spill.finish()?,
            None => 0,
        };

        let unannotated_ambiguous = self
            .unannotated_candidates
            .iter()
            .filter(|qname| !self.qname_ids.contains_key(*qname))
            .count() as u64;

        info!(
            "Processed {} alignments in {:.3}s.",
            n_alignments,
            start_time.elapsed().as_secs_f64()
        );

        Ok(PhaseOneSummary {
            alignments: n_alignments,
            unannotated_ambiguous,
            spill_rows,
        })
    }
}
