use std::fmt::{self, Display};

use crate::consts::{
    FIRST_IN_PAIR_FLAG, MATE_UNMAPPED_FLAG, PAIRED_FLAG, REVCOMP_ALIGNMENT, SECONDARY_ALN_FLAG,
};

///
/// One alignment of a read against a reference sequence.
///
/// Coordinates are 0-based, half-open. `ambiguous` is decided by the
/// alignment source (multi-mapped read) and never recomputed here.
///
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AlignmentRecord {
    pub qname: String,
    pub rid: usize,
    pub start: u32,
    pub end: u32,
    pub flag: u16,
    pub rnext: Option<usize>,
    pub ambiguous: bool,
}

impl AlignmentRecord {
    #[inline]
    fn has_flag(&self, bits: u16) -> bool {
        self.flag & bits != 0
    }

    pub fn is_paired(&self) -> bool {
        self.has_flag(PAIRED_FLAG)
    }

    pub fn is_first_in_pair(&self) -> bool {
        self.has_flag(FIRST_IN_PAIR_FLAG)
    }

    pub fn is_reverse(&self) -> bool {
        self.has_flag(REVCOMP_ALIGNMENT)
    }

    pub fn is_secondary(&self) -> bool {
        self.has_flag(SECONDARY_ALN_FLAG)
    }

    pub fn is_mate_unmapped(&self) -> bool {
        self.has_flag(MATE_UNMAPPED_FLAG)
    }

    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }

    pub fn is_unique(&self) -> bool {
        !self.ambiguous
    }

    ///
    /// A uniquely mapped pair whose mate sits on the same reference and is
    /// itself mapped. Only these go through mate merging.
    ///
    pub fn is_properly_paired_unique(&self) -> bool {
        self.is_unique()
            && self.is_paired()
            && self.rnext == Some(self.rid)
            && !self.is_mate_unmapped()
    }
}

impl Display for AlignmentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rid={} [{}, {}) flag={:#x} rnext={}",
            self.qname,
            self.rid,
            self.start,
            self.end,
            self.flag,
            self.rnext
                .map_or_else(|| "*".to_string(), |rnext| rnext.to_string())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn mate1() -> AlignmentRecord {
        AlignmentRecord {
            qname: "r2".to_string(),
            rid: 0,
            start: 100,
            end: 150,
            flag: 0x41,
            rnext: Some(0),
            ambiguous: false,
        }
    }

    #[rstest]
    fn test_properly_paired(mate1: AlignmentRecord) {
        assert!(mate1.is_paired());
        assert!(mate1.is_first_in_pair());
        assert!(!mate1.is_reverse());
        assert!(mate1.is_properly_paired_unique());
    }

    #[rstest]
    #[case(Some(1), 0x41, false)]
    #[case(None, 0x41, false)]
    #[case(Some(0), 0x49, false)]
    #[case(Some(0), 0x0, false)]
    fn test_not_mergeable(
        mut mate1: AlignmentRecord,
        #[case] rnext: Option<usize>,
        #[case] flag: u16,
        #[case] expected: bool,
    ) {
        mate1.rnext = rnext;
        mate1.flag = flag;
        assert_eq!(mate1.is_properly_paired_unique(), expected);
    }

    #[rstest]
    fn test_ambiguous_is_never_merged(mut mate1: AlignmentRecord) {
        mate1.ambiguous = true;
        assert!(!mate1.is_properly_paired_unique());
    }

    #[rstest]
    fn test_display(mate1: AlignmentRecord) {
        assert_eq!(mate1.to_string(), "r2 rid=0 [100, 150) flag=0x41 rnext=0");
    }
}
