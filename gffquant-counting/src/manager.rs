use std::collections::BTreeSet;
use std::io::Write;
use std::path::PathBuf;

use log::debug;

use gffquant_core::utils::get_dynamic_writer;
use gffquant_io::AlignmentSource;

use crate::consts::{
    AMBIG_REGION_COUNTER, AMBIG_SEQ_COUNTER, RAW_COUNTER_SUFFIX, UNIQ_REGION_COUNTER,
    UNIQ_SEQ_COUNTER,
};
use crate::counters::{RegionCounter, SeqCounter, Tally};
use crate::errors::{CountingError, Result};
use crate::events::{CountEvent, MINUS_STRAND, PLUS_STRAND, Strand};

/// What [`CountManager::counts_for`] should look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKey {
    /// the sequence counter cell of a reference
    Sequence(usize),
    /// one feature `(begin, end)` inside the region counter of a reference
    Region(usize, (u32, u32)),
}

///
/// Owns the unique and ambiguous counter pairs.
///
/// Region counters are optional; with region counting disabled only the
/// sequence counters are fed.
///
#[derive(Debug, Clone)]
pub struct CountManager {
    strand_specific: bool,
    uniq_seqcounts: SeqCounter<u64>,
    ambig_seqcounts: SeqCounter<f64>,
    uniq_regioncounts: Option<RegionCounter<u64>>,
    ambig_regioncounts: Option<RegionCounter<f64>>,
}

/// Push `events` through a sequence counter and, if present, a region
/// counter, then drain the stream so every stage sees every event.
fn windup_stream<S, R, I>(
    seq_counter: &mut SeqCounter<S>,
    region_counter: Option<&mut RegionCounter<R>>,
    events: I,
) -> usize
where
    S: Tally,
    R: Tally,
    I: IntoIterator<Item = CountEvent>,
{
    let stream = seq_counter.update_counts(events);
    match region_counter {
        Some(region_counter) => region_counter.update_counts(stream).count(),
        None => stream.count(),
    }
}

fn strand_label(strand: Option<Strand>) -> &'static str {
    match strand {
        None => ".",
        Some(PLUS_STRAND) => "+",
        Some(MINUS_STRAND) => "-",
    }
}

pub(crate) fn reference_name(source: &dyn AlignmentSource, rid: usize) -> Result<&str> {
    source
        .get_reference(rid)
        .map(|reference| reference.name.as_str())
        .ok_or(CountingError::UnknownReference(rid))
}

impl CountManager {
    pub fn new(region_counts: bool, strand_specific: bool) -> Self {
        CountManager {
            strand_specific,
            uniq_seqcounts: SeqCounter::new(strand_specific),
            ambig_seqcounts: SeqCounter::new(strand_specific),
            uniq_regioncounts: region_counts.then(|| RegionCounter::new(strand_specific)),
            ambig_regioncounts: region_counts.then(|| RegionCounter::new(strand_specific)),
        }
    }

    pub fn strand_specific(&self) -> bool {
        self.strand_specific
    }

    pub fn region_counts(&self) -> bool {
        self.uniq_regioncounts.is_some()
    }

    ///
    /// Apply a stream of count events to the unique or the ambiguous counters.
    ///
    /// The stream is drained completely. Returns the number of events applied.
    ///
    pub fn update_counts<I>(&mut self, events: I, ambiguous: bool) -> usize
    where
        I: IntoIterator<Item = CountEvent>,
    {
        if ambiguous {
            windup_stream(
                &mut self.ambig_seqcounts,
                self.ambig_regioncounts.as_mut(),
                events,
            )
        } else {
            windup_stream(
                &mut self.uniq_seqcounts,
                self.uniq_regioncounts.as_mut(),
                events,
            )
        }
    }

    pub fn has_ambiguous_counts(&self) -> bool {
        !self.ambig_seqcounts.is_empty()
            || self
                .ambig_regioncounts
                .as_ref()
                .is_some_and(|counter| !counter.is_empty())
    }

    ///
    /// Reads that hit no feature.
    ///
    /// Both counter families receive the same events, so asking the region
    /// counters (when present) or the sequence counters gives the same number.
    ///
    pub fn unannotated_reads(&self) -> u64 {
        match (&self.uniq_regioncounts, &self.ambig_regioncounts) {
            (Some(uniq), Some(ambig)) => uniq.unannotated_reads + ambig.unannotated_reads,
            _ => self.uniq_seqcounts.unannotated_reads + self.ambig_seqcounts.unannotated_reads,
        }
    }

    ///
    /// Unique and ambiguous counts for `key`.
    ///
    /// Strand-agnostic lookups return one value per side, strand-specific
    /// ones return `[plus, minus]`.
    ///
    pub fn counts_for(&self, key: CountKey, strand_specific: bool) -> (Vec<u64>, Vec<f64>) {
        let strands: Vec<Option<Strand>> = match strand_specific {
            true => vec![Some(PLUS_STRAND), Some(MINUS_STRAND)],
            false => vec![None],
        };

        match key {
            CountKey::Sequence(rid) => (
                strands
                    .iter()
                    .map(|&strand| self.uniq_seqcounts.get(rid, strand))
                    .collect(),
                strands
                    .iter()
                    .map(|&strand| self.ambig_seqcounts.get(rid, strand))
                    .collect(),
            ),
            CountKey::Region(rid, region) => (
                strands
                    .iter()
                    .map(|&strand| {
                        self.uniq_regioncounts
                            .as_ref()
                            .map(|counter| counter.get_count(rid, region, strand))
                            .unwrap_or_default()
                    })
                    .collect(),
                strands
                    .iter()
                    .map(|&strand| {
                        self.ambig_regioncounts
                            .as_ref()
                            .map(|counter| counter.get_count(rid, region, strand))
                            .unwrap_or_default()
                    })
                    .collect(),
            ),
        }
    }

    /// Feature coordinates counted under `rid` by either region counter.
    pub fn regions_for(&self, rid: usize) -> BTreeSet<(u32, u32)> {
        let mut regions = BTreeSet::new();
        if let Some(counter) = &self.uniq_regioncounts {
            regions.extend(counter.regions(rid));
        }
        if let Some(counter) = &self.ambig_regioncounts {
            regions.extend(counter.regions(rid));
        }
        regions
    }

    /// References with any count in any counter.
    pub fn rids(&self) -> BTreeSet<usize> {
        let mut rids = self.uniq_seqcounts.rids();
        rids.extend(self.ambig_seqcounts.rids());
        for counter in self.uniq_regioncounts.iter() {
            rids.extend(counter.rids());
        }
        for counter in self.ambig_regioncounts.iter() {
            rids.extend(counter.rids());
        }
        rids
    }

    ///
    /// Write every non-empty counter to `<prefix>.<counter>.raw.txt`.
    ///
    /// Returns the paths written.
    ///
    pub fn dump(&self, prefix: &str, source: &dyn AlignmentSource) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        if !self.uniq_seqcounts.is_empty() {
            written.push(dump_seq_counter(
                prefix,
                UNIQ_SEQ_COUNTER,
                &self.uniq_seqcounts,
                source,
            )?);
        }
        if !self.ambig_seqcounts.is_empty() {
            written.push(dump_seq_counter(
                prefix,
                AMBIG_SEQ_COUNTER,
                &self.ambig_seqcounts,
                source,
            )?);
        }
        if let Some(counter) = self.uniq_regioncounts.as_ref().filter(|c| !c.is_empty()) {
            written.push(dump_region_counter(
                prefix,
                UNIQ_REGION_COUNTER,
                counter,
                source,
            )?);
        }
        if let Some(counter) = self.ambig_regioncounts.as_ref().filter(|c| !c.is_empty()) {
            written.push(dump_region_counter(
                prefix,
                AMBIG_REGION_COUNTER,
                counter,
                source,
            )?);
        }

        Ok(written)
    }
}

fn raw_counter_path(prefix: &str, name: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}.{name}.{RAW_COUNTER_SUFFIX}"))
}

fn dump_seq_counter<W: Tally>(
    prefix: &str,
    name: &str,
    counter: &SeqCounter<W>,
    source: &dyn AlignmentSource,
) -> Result<PathBuf> {
    let path = raw_counter_path(prefix, name);
    debug!("Writing {}", path.display());

    let mut writer = get_dynamic_writer(&path, false)?;
    for (rid, strand, count) in counter.sorted_counts() {
        writeln!(
            writer,
            "{}\t{}\t{}",
            reference_name(source, rid)?,
            strand_label(strand),
            count
        )?;
    }
    writeln!(writer, "unannotated\t.\t{}", counter.unannotated_reads)?;
    writer.flush()?;

    Ok(path)
}

fn dump_region_counter<W: Tally>(
    prefix: &str,
    name: &str,
    counter: &RegionCounter<W>,
    source: &dyn AlignmentSource,
) -> Result<PathBuf> {
    let path = raw_counter_path(prefix, name);
    debug!("Writing {}", path.display());

    let mut writer = get_dynamic_writer(&path, false)?;
    for (rid, (begin, end, strand), count) in counter.sorted_counts() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            reference_name(source, rid)?,
            begin,
            end,
            strand_label(strand),
            count
        )?;
    }
    writeln!(writer, "unannotated\t.\t.\t.\t{}", counter.unannotated_reads)?;
    writer.flush()?;

    Ok(path)
}
