use gffquant_core::models::AlignmentRecord;

use crate::error::{AlignmentSourceError, Result};
use crate::source::{AlignmentFilter, AlignmentIter, AlignmentSource, ReferenceInfo};

///
/// Serves alignments held in memory, in the order given.
///
/// Multiplicity is taken from each record's `ambiguous` field.
///
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlignmentSource {
    references: Vec<ReferenceInfo>,
    records: Vec<AlignmentRecord>,
}

impl InMemoryAlignmentSource {
    pub fn new(references: Vec<ReferenceInfo>, records: Vec<AlignmentRecord>) -> Self {
        InMemoryAlignmentSource {
            references,
            records,
        }
    }

    pub fn push(&mut self, record: AlignmentRecord) {
        self.records.push(record);
    }
}

impl AlignmentSource for InMemoryAlignmentSource {
    fn n_references(&self) -> usize {
        self.references.len()
    }

    fn get_reference(&self, rid: usize) -> Option<&ReferenceInfo> {
        self.references.get(rid)
    }

    fn alignments(&self, filter: AlignmentFilter) -> Result<AlignmentIter<'_>> {
        let n_references = self.references.len();
        Ok(Box::new(
            self.records
                .iter()
                .enumerate()
                .filter(move |(_, record)| record.rid >= n_references || filter.accepts(record))
                .map(move |(index, record)| {
                    if record.rid >= n_references {
                        return Err(AlignmentSourceError::UnknownReference {
                            qname: record.qname.clone(),
                            rid: record.rid,
                        });
                    }
                    Ok((index as u64 + 1, record.clone()))
                }),
        ))
    }
}
