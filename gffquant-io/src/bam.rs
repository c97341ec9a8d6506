use std::cell::OnceCell;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use fxhash::FxHashSet as HashSet;
use log::info;
use noodles::bam;
use noodles::bgzf;
use noodles::sam::alignment::Record as SamRecord;

use gffquant_core::consts::SUPPL_ALN_FLAG;
use gffquant_core::models::AlignmentRecord;

use crate::error::{AlignmentSourceError, Result};
use crate::multimappers::{scan_name_sorted, scan_unordered};
use crate::source::{AlignmentFilter, AlignmentIter, AlignmentSource, ReferenceInfo};

type BamReader = bam::io::Reader<bgzf::Reader<File>>;

///
/// A BAM archive read with noodles.
///
/// Read names that map more than once are determined by a pre-scan the first
/// time alignments are requested. The pre-scan reads the name-sorted copy of
/// the archive when one is given, which keeps its memory bounded.
///
pub struct BamFile {
    path: PathBuf,
    name_sorted_path: Option<PathBuf>,
    references: Vec<ReferenceInfo>,
    multimappers: OnceCell<HashSet<String>>,
}

fn open_reader(path: &Path) -> Result<(BamReader, noodles::sam::Header)> {
    let mut reader = bam::io::reader::Builder::default().build_from_path(path)?;
    let header = reader
        .read_header()
        .map_err(|err| AlignmentSourceError::Header {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
    Ok((reader, header))
}

/// A 0-based coordinate as stored in an [`AlignmentRecord`].
fn coordinate(qname: &str, position: usize) -> Result<u32> {
    u32::try_from(position).map_err(|_| AlignmentSourceError::PositionOutOfRange {
        qname: qname.to_string(),
        position,
    })
}

fn record_name(record: &bam::Record) -> String {
    record
        .name()
        .map(|name| name.to_string())
        .unwrap_or_default()
}

impl BamFile {
    pub fn open(path: &Path, name_sorted_path: Option<&Path>) -> Result<BamFile> {
        let (_, header) = open_reader(path)?;

        let references = header
            .reference_sequences()
            .iter()
            .map(|(name, reference)| ReferenceInfo {
                name: name.to_string(),
                length: reference.length().get(),
            })
            .collect();

        Ok(BamFile {
            path: path.to_path_buf(),
            name_sorted_path: name_sorted_path.map(Path::to_path_buf),
            references,
            multimappers: OnceCell::new(),
        })
    }

    /// `(qname, flag)` of every mapped, non-supplementary record in `path`.
    fn scan_records(path: &Path) -> Result<impl Iterator<Item = io::Result<(String, u16)>>> {
        let (mut reader, _) = open_reader(path)?;
        let mut record = bam::Record::default();

        Ok(std::iter::from_fn(move || {
            loop {
                match reader.read_record(&mut record) {
                    Ok(0) => return None,
                    Ok(_) => {
                        let flags = record.flags();
                        if flags.is_unmapped() || flags.bits() & SUPPL_ALN_FLAG != 0 {
                            continue;
                        }
                        return Some(Ok((record_name(&record), flags.bits())));
                    }
                    Err(err) => return Some(Err(err)),
                }
            }
        }))
    }

    fn multimappers(&self) -> Result<&HashSet<String>> {
        if let Some(multimappers) = self.multimappers.get() {
            return Ok(multimappers);
        }

        let multimappers = match &self.name_sorted_path {
            Some(name_sorted) => {
                info!("Scanning {} for multimapped reads", name_sorted.display());
                scan_name_sorted(Self::scan_records(name_sorted)?)?
            }
            None => {
                info!("Scanning {} for multimapped reads", self.path.display());
                scan_unordered(Self::scan_records(&self.path)?)?
            }
        };
        info!("Found {} multimapped reads", multimappers.len());

        Ok(self.multimappers.get_or_init(|| multimappers))
    }
}

/// Streams filtered records from an open BAM reader.
struct BamRecords<'a> {
    reader: BamReader,
    record: bam::Record,
    ordinal: u64,
    filter: AlignmentFilter,
    multimappers: &'a HashSet<String>,
    n_references: usize,
}

impl BamRecords<'_> {
    fn convert(&self) -> Result<Option<AlignmentRecord>> {
        let record = &self.record;
        let flags = record.flags();
        if flags.is_unmapped() {
            return Ok(None);
        }

        let (Some(rid), Some(start), Some(end)) = (
            record.reference_sequence_id().transpose()?,
            record.alignment_start().transpose()?,
            SamRecord::alignment_end(record).transpose()?,
        ) else {
            return Ok(None);
        };

        let qname = record_name(record);
        let ambiguous = flags.is_secondary() || self.multimappers.contains(&qname);
        // noodles positions are 1-based and inclusive
        let start = coordinate(&qname, usize::from(start) - 1)?;
        let end = coordinate(&qname, usize::from(end))?;

        Ok(Some(AlignmentRecord {
            qname,
            rid,
            start,
            end,
            flag: flags.bits(),
            rnext: record.mate_reference_sequence_id().transpose()?,
            ambiguous,
        }))
    }
}

impl Iterator for BamRecords<'_> {
    type Item = Result<(u64, AlignmentRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read_record(&mut self.record) {
                Ok(0) => return None,
                Ok(_) => {
                    self.ordinal += 1;
                    let alignment = match self.convert() {
                        Ok(Some(alignment)) => alignment,
                        Ok(None) => continue,
                        Err(err) => return Some(Err(err)),
                    };
                    if alignment.rid >= self.n_references {
                        return Some(Err(AlignmentSourceError::UnknownReference {
                            qname: alignment.qname,
                            rid: alignment.rid,
                        }));
                    }
                    if self.filter.accepts(&alignment) {
                        return Some(Ok((self.ordinal, alignment)));
                    }
                }
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

impl AlignmentSource for BamFile {
    fn n_references(&self) -> usize {
        self.references.len()
    }

    fn get_reference(&self, rid: usize) -> Option<&ReferenceInfo> {
        self.references.get(rid)
    }

    fn alignments(&self, filter: AlignmentFilter) -> Result<AlignmentIter<'_>> {
        let multimappers = self.multimappers()?;
        let (reader, _) = open_reader(&self.path)?;

        Ok(Box::new(BamRecords {
            reader,
            record: bam::Record::default(),
            ordinal: 0,
            filter,
            multimappers,
            n_references: self.references.len(),
        }))
    }
}
