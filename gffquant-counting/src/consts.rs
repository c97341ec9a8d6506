pub const SEQNAME_TABLE_SUFFIX: &str = "seqname.txt";
pub const FEATURE_TABLE_SUFFIX: &str = "feature_counts.txt";
pub const UNANNOTATED_ROW: &str = "unannotated";
pub const RAW_COUNTER_SUFFIX: &str = "raw.txt";

pub const UNIQ_SEQ_COUNTER: &str = "uniq_seqcounts";
pub const AMBIG_SEQ_COUNTER: &str = "ambig_seqcounts";
pub const UNIQ_REGION_COUNTER: &str = "uniq_regioncounts";
pub const AMBIG_REGION_COUNTER: &str = "ambig_regioncounts";
