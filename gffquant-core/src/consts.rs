//! SAM flag bits consulted while counting.

pub const PAIRED_FLAG: u16 = 0x1;
pub const MATE_UNMAPPED_FLAG: u16 = 0x8;
pub const REVCOMP_ALIGNMENT: u16 = 0x10;
pub const FIRST_IN_PAIR_FLAG: u16 = 0x40;
pub const SECOND_IN_PAIR_FLAG: u16 = 0x80;
pub const SECONDARY_ALN_FLAG: u16 = 0x100;
pub const SUPPL_ALN_FLAG: u16 = 0x800;
