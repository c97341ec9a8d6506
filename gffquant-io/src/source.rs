use gffquant_core::models::AlignmentRecord;

use crate::error::Result;

/// Which records an alignment pass wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentFilter {
    pub allow_multiple: bool,
    pub allow_unique: bool,
    /// records with any of these flag bits set are dropped
    pub excluded_flags: u16,
}

impl AlignmentFilter {
    pub fn accepts(&self, record: &AlignmentRecord) -> bool {
        if record.flag & self.excluded_flags != 0 {
            return false;
        }
        match record.is_ambiguous() {
            true => self.allow_multiple,
            false => self.allow_unique,
        }
    }
}

/// Name and length of one reference sequence of the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceInfo {
    pub name: String,
    pub length: usize,
}

/// Records paired with their 1-based ordinal in the archive.
pub type AlignmentIter<'a> = Box<dyn Iterator<Item = Result<(u64, AlignmentRecord)>> + 'a>;

///
/// An ordered archive of alignments of one sequencing run.
///
/// Records of one reference are expected to be contiguous; sources do not
/// check this.
///
pub trait AlignmentSource {
    /// Total number of reference sequences in the archive header.
    fn n_references(&self) -> usize;

    /// Look up a reference sequence by id.
    fn get_reference(&self, rid: usize) -> Option<&ReferenceInfo>;

    ///
    /// Stream the mapped records accepted by `filter` in archive order.
    ///
    /// The ordinal counts every record read so far, including the ones the
    /// filter dropped.
    ///
    fn alignments(&self, filter: AlignmentFilter) -> Result<AlignmentIter<'_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn record(flag: u16, ambiguous: bool) -> AlignmentRecord {
        AlignmentRecord {
            qname: "r1".to_string(),
            rid: 0,
            start: 0,
            end: 10,
            flag,
            rnext: None,
            ambiguous,
        }
    }

    #[rstest]
    #[case(0x0, false, true)]
    #[case(0x0, true, false)]
    #[case(0x800, false, false)]
    #[case(0x100, true, false)]
    fn test_unique_only_filter(#[case] flag: u16, #[case] ambiguous: bool, #[case] expected: bool) {
        let filter = AlignmentFilter {
            allow_multiple: false,
            allow_unique: true,
            excluded_flags: 0x800,
        };
        assert_eq!(filter.accepts(&record(flag, ambiguous)), expected);
    }

    #[rstest]
    fn test_multi_filter() {
        let filter = AlignmentFilter {
            allow_multiple: true,
            allow_unique: true,
            excluded_flags: 0x800,
        };
        assert!(filter.accepts(&record(0x100, true)));
        assert!(!filter.accepts(&record(0x900, true)));
    }
}
