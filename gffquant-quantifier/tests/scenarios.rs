use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use pretty_assertions::assert_eq;
use rstest::*;
use tempfile::{TempDir, tempdir};

use gffquant_core::models::AlignmentRecord;
use gffquant_counting::{CountKey, DistributionMode, MINUS_STRAND, PLUS_STRAND};
use gffquant_io::{InMemoryAlignmentSource, ReferenceInfo};
use gffquant_overlaprs::{
    CacheStats, FeatureIndex, FeatureIndexError, FeatureLookup, Overlap, write_gff_index,
};
use gffquant_quantifier::{CountConfig, FeatureQuantifier, QuantError};

const GFF: &str = "##gff-version 3
chr1\ttest\tgene\t101\t300\t.\t+\t.\tID=F1
chr1\ttest\tgene\t501\t700\t.\t+\t.\tID=F2
chr2\ttest\tgene\t1\t100\t.\t-\t.\tID=F3;Name=three
";

const F1: (u32, u32) = (100, 300);
const F2: (u32, u32) = (500, 700);
const F3: (u32, u32) = (0, 100);

struct Workspace {
    dir: TempDir,
    gff: PathBuf,
    index: PathBuf,
}

impl Workspace {
    fn feature_index(&self) -> FeatureIndex {
        FeatureIndex::open(&self.gff, &self.index).unwrap()
    }

    fn prefix(&self, name: &str) -> String {
        self.dir.path().join("out").join(name).display().to_string()
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = tempdir().unwrap();
    let gff = dir.path().join("features.gff3");
    let index = dir.path().join("features.gff3.index");
    fs::write(&gff, GFF).unwrap();
    write_gff_index(&gff, &index).unwrap();
    Workspace { dir, gff, index }
}

fn unique(qname: &str, rid: usize, start: u32, end: u32, flag: u16) -> AlignmentRecord {
    AlignmentRecord {
        qname: qname.to_string(),
        rid,
        start,
        end,
        flag,
        rnext: None,
        ambiguous: false,
    }
}

fn mate(qname: &str, start: u32, end: u32, flag: u16) -> AlignmentRecord {
    AlignmentRecord {
        rnext: Some(0),
        ..unique(qname, 0, start, end, flag)
    }
}

fn multi(qname: &str, rid: usize, start: u32, end: u32, flag: u16) -> AlignmentRecord {
    AlignmentRecord {
        ambiguous: true,
        ..unique(qname, rid, start, end, flag)
    }
}

fn source(records: Vec<AlignmentRecord>) -> InMemoryAlignmentSource {
    InMemoryAlignmentSource::new(
        vec![
            ReferenceInfo {
                name: "chr1".to_string(),
                length: 1000,
            },
            ReferenceInfo {
                name: "chr2".to_string(),
                length: 400,
            },
        ],
        records,
    )
}

fn config(mode: DistributionMode, strand_specific: bool) -> CountConfig {
    CountConfig {
        ambig_mode: mode,
        strand_specific,
        ..Default::default()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[rstest]
fn test_single_end_unique_read(workspace: Workspace) {
    let mut quantifier = FeatureQuantifier::new(
        workspace.feature_index(),
        config(DistributionMode::UniqueOnly, true),
        &workspace.prefix("a"),
    );
    quantifier
        .process_data(&source(vec![unique("r1", 0, 100, 150, 0)]))
        .unwrap();

    let counts = quantifier.counts();
    let (uniq, ambig) = counts.counts_for(CountKey::Sequence(0), true);
    assert_eq!(uniq[usize::from(PLUS_STRAND)], 1);
    assert_eq!(uniq[usize::from(MINUS_STRAND)], 0);
    assert_eq!(ambig, vec![0.0, 0.0]);
    assert_eq!(counts.counts_for(CountKey::Region(0, F1), true).0, vec![1, 0]);
}

#[rstest]
fn test_pair_counted_once_as_fragment(workspace: Workspace) {
    let mut quantifier = FeatureQuantifier::new(
        workspace.feature_index(),
        config(DistributionMode::UniqueOnly, false),
        &workspace.prefix("b"),
    );
    let summary = quantifier
        .process_data(&source(vec![
            mate("r2", 100, 150, 0x41),
            mate("r2", 200, 250, 0x91),
        ]))
        .unwrap();

    assert_eq!(summary.alignments, 2);
    let counts = quantifier.counts();
    assert_eq!(counts.counts_for(CountKey::Sequence(0), false).0, vec![1]);
    assert_eq!(counts.counts_for(CountKey::Region(0, F1), false).0, vec![1]);
    assert_eq!(counts.regions_for(0).len(), 1);
}

#[rstest]
fn test_one_over_n_splits_between_alignments(workspace: Workspace) {
    let prefix = workspace.prefix("d");
    let mut quantifier = FeatureQuantifier::new(
        workspace.feature_index(),
        config(DistributionMode::OneOverN, false),
        &prefix,
    );
    let summary = quantifier
        .process_data(&source(vec![
            multi("r4", 0, 150, 200, 0),
            multi("r4", 1, 10, 60, 0x100),
        ]))
        .unwrap();

    assert_eq!(summary.spill_rows, 2);
    assert_eq!(summary.ambiguous_alignments, 2);
    let counts = quantifier.counts();
    assert_eq!(counts.counts_for(CountKey::Region(0, F1), false).1, vec![0.5]);
    assert_eq!(counts.counts_for(CountKey::Region(1, F3), false).1, vec![0.5]);
    assert!(!quantifier.spill_path().exists());
}

#[rstest]
fn test_dist1_shares_per_feature(workspace: Workspace) {
    let mut quantifier = FeatureQuantifier::new(
        workspace.feature_index(),
        config(DistributionMode::Dist1, false),
        &workspace.prefix("e"),
    );
    quantifier
        .process_data(&source(vec![
            multi("r5", 0, 120, 170, 0),
            multi("r5", 0, 200, 250, 0x110),
            multi("r5", 0, 550, 600, 0x100),
        ]))
        .unwrap();

    let counts = quantifier.counts();
    assert_eq!(counts.counts_for(CountKey::Region(0, F1), false).1, vec![0.5]);
    assert_eq!(counts.counts_for(CountKey::Region(0, F2), false).1, vec![0.5]);
    assert_eq!(counts.counts_for(CountKey::Sequence(0), false).1, vec![1.0]);
}

#[rstest]
fn test_all1_counts_every_alignment(workspace: Workspace) {
    let mut quantifier = FeatureQuantifier::new(
        workspace.feature_index(),
        config(DistributionMode::All1, false),
        &workspace.prefix("all1"),
    );
    let summary = quantifier
        .process_data(&source(vec![
            multi("r4", 0, 150, 200, 0),
            multi("r4", 1, 10, 60, 0x100),
        ]))
        .unwrap();

    assert_eq!(summary.spill_rows, 0);
    let counts = quantifier.counts();
    assert!(!counts.has_ambiguous_counts());
    assert_eq!(counts.counts_for(CountKey::Region(0, F1), false).0, vec![1]);
    assert_eq!(counts.counts_for(CountKey::Region(1, F3), false).0, vec![1]);
}

#[rstest]
fn test_unannotated_reads(workspace: Workspace) {
    let prefix = workspace.prefix("unannotated");
    let mut quantifier = FeatureQuantifier::new(
        workspace.feature_index(),
        config(DistributionMode::OneOverN, false),
        &prefix,
    );
    let summary = quantifier
        .process_data(&source(vec![
            unique("r12", 0, 800, 850, 0),
            multi("r13", 0, 850, 900, 0),
            multi("r14", 0, 850, 900, 0),
            multi("r13", 1, 300, 350, 0x100),
            multi("r14", 1, 10, 60, 0x100),
        ]))
        .unwrap();

    // r12 hits nothing, r13 hits nothing anywhere, r14 hits F3
    assert_eq!(summary.unannotated_reads, 2);
    assert_eq!(quantifier.counts().unannotated_reads(), 1);

    let table = read(&PathBuf::from(format!("{prefix}.seqname.txt")));
    assert_eq!(table.lines().nth(1), Some("unannotated\t2"));
}

#[rstest]
fn test_count_tables(workspace: Workspace) {
    let prefix = workspace.prefix("tables");
    let mut quantifier = FeatureQuantifier::new(
        workspace.feature_index(),
        config(DistributionMode::OneOverN, false),
        &prefix,
    );
    let summary = quantifier
        .process_data(&source(vec![
            unique("r1", 0, 100, 150, 0),
            multi("r4", 0, 550, 600, 0),
            multi("r4", 1, 10, 60, 0x100),
        ]))
        .unwrap();

    assert_eq!(
        summary.outputs,
        vec![
            PathBuf::from(format!("{prefix}.seqname.txt")),
            PathBuf::from(format!("{prefix}.feature_counts.txt")),
        ]
    );
    assert_eq!(
        read(&summary.outputs[0]),
        "seqid\tlength\tuniq_raw\tambig_raw\tcombined_raw\n\
         unannotated\t0\n\
         chr1\t1000\t1\t0.5\t1.5\n\
         chr2\t400\t0\t0.5\t0.5\n"
    );
    assert_eq!(
        read(&summary.outputs[1]),
        "seqid\tstart\tend\tfeature_id\tuniq_raw\tambig_raw\tcombined_raw\n\
         chr1\t101\t300\tF1\t1\t0\t1\n\
         chr1\t501\t700\tF2\t0\t0.5\t0.5\n\
         chr2\t1\t100\tF3\t0\t0.5\t0.5\n"
    );
}

#[rstest]
fn test_runs_are_deterministic(workspace: Workspace) {
    let records = vec![
        unique("r1", 0, 100, 150, 0x10),
        mate("r2", 100, 150, 0x41),
        multi("r4", 0, 550, 600, 0),
        mate("r2", 520, 570, 0x91),
        multi("r5", 0, 150, 200, 0x100),
        multi("r4", 1, 10, 60, 0x100),
        multi("r5", 1, 50, 90, 0x110),
        unique("r8", 1, 20, 70, 0),
    ];

    let outputs: Vec<Vec<String>> = ["run1", "run2"]
        .iter()
        .map(|run| {
            let cfg = CountConfig {
                dump_raw_counts: true,
                ..config(DistributionMode::OneOverN, true)
            };
            let mut quantifier =
                FeatureQuantifier::new(workspace.feature_index(), cfg, &workspace.prefix(run));
            let summary = quantifier.process_data(&source(records.clone())).unwrap();
            summary.outputs.iter().map(|path| read(path)).collect()
        })
        .collect();

    assert_eq!(outputs[0].len(), 6);
    assert_eq!(outputs[0], outputs[1]);
}

#[rstest]
fn test_keep_spill_file(workspace: Workspace) {
    let cfg = CountConfig {
        keep_ambig_tmp: true,
        ..config(DistributionMode::Dist1, false)
    };
    let mut quantifier =
        FeatureQuantifier::new(workspace.feature_index(), cfg, &workspace.prefix("keep"));
    quantifier
        .process_data(&source(vec![multi("r4", 0, 150, 200, 0)]))
        .unwrap();

    let spill = read(&quantifier.spill_path());
    assert_eq!(spill, "0\t1\t0\t100\t300\t0\n");
}

#[rstest]
fn test_compressed_output(workspace: Workspace) {
    let cfg = CountConfig {
        compress_output: true,
        region_counts: false,
        ..Default::default()
    };
    let prefix = workspace.prefix("gz");
    let mut quantifier = FeatureQuantifier::new(workspace.feature_index(), cfg, &prefix);
    let summary = quantifier
        .process_data(&source(vec![unique("r1", 0, 100, 150, 0)]))
        .unwrap();

    assert_eq!(
        summary.outputs,
        vec![PathBuf::from(format!("{prefix}.seqname.txt.gz"))]
    );
    assert!(summary.outputs[0].exists());
}

#[derive(Debug, Default)]
struct LookupLog {
    queries: usize,
    queries_before_clear: Option<usize>,
    clears: usize,
}

/// Wraps a [`FeatureIndex`], recording queries and cache clears.
struct RecordingLookup {
    inner: FeatureIndex,
    log: Rc<RefCell<LookupLog>>,
    failing_reference: Option<&'static str>,
}

impl FeatureLookup for RecordingLookup {
    fn overlaps(
        &mut self,
        reference: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<Overlap>, FeatureIndexError> {
        self.log.borrow_mut().queries += 1;
        if self.failing_reference == Some(reference) {
            return Err(FeatureIndexError::TruncatedBlock {
                seqid: reference.to_string(),
            });
        }
        self.inner.overlaps(reference, start, end)
    }

    fn clear_cache(&mut self) {
        let mut log = self.log.borrow_mut();
        log.clears += 1;
        if log.queries_before_clear.is_none() {
            log.queries_before_clear = Some(log.queries);
        }
        self.inner.clear_cache();
    }

    fn cache_stats(&self) -> CacheStats {
        self.inner.cache_stats()
    }
}

fn recording_lookup(
    workspace: &Workspace,
    failing_reference: Option<&'static str>,
) -> (RecordingLookup, Rc<RefCell<LookupLog>>) {
    let log = Rc::new(RefCell::new(LookupLog::default()));
    let lookup = RecordingLookup {
        inner: workspace.feature_index(),
        log: Rc::clone(&log),
        failing_reference,
    };
    (lookup, log)
}

#[rstest]
fn test_feature_cache_cleared_between_passes(workspace: Workspace) {
    let (lookup, log) = recording_lookup(&workspace, None);
    let mut quantifier = FeatureQuantifier::new(
        lookup,
        config(DistributionMode::OneOverN, false),
        &workspace.prefix("cache"),
    );
    quantifier
        .process_data(&source(vec![
            multi("r4", 0, 150, 200, 0),
            multi("r4", 1, 10, 60, 0x100),
        ]))
        .unwrap();

    let log = log.borrow();
    assert_eq!(log.clears, 1);
    // one query per alignment in the first pass, feature labels after the clear
    assert_eq!(log.queries_before_clear, Some(2));
    assert!(log.queries > 2);
}

#[rstest]
fn test_spill_removed_when_run_fails(workspace: Workspace) {
    let (lookup, _) = recording_lookup(&workspace, Some("chr2"));
    let mut quantifier = FeatureQuantifier::new(
        lookup,
        config(DistributionMode::Dist1, false),
        &workspace.prefix("failed"),
    );
    let result = quantifier.process_data(&source(vec![
        multi("r4", 0, 150, 200, 0),
        multi("r4", 1, 10, 60, 0x100),
    ]));

    assert!(matches!(result, Err(QuantError::FeatureIndex(_))));
    assert!(!quantifier.spill_path().exists());
}

#[rstest]
fn test_spill_kept_when_run_fails(workspace: Workspace) {
    let (lookup, _) = recording_lookup(&workspace, Some("chr2"));
    let cfg = CountConfig {
        keep_ambig_tmp: true,
        ..config(DistributionMode::Dist1, false)
    };
    let mut quantifier = FeatureQuantifier::new(lookup, cfg, &workspace.prefix("failed_keep"));
    let result = quantifier.process_data(&source(vec![
        multi("r4", 0, 150, 200, 0),
        multi("r4", 1, 10, 60, 0x100),
    ]));

    assert!(result.is_err());
    assert_eq!(read(&quantifier.spill_path()), "0\t1\t0\t100\t300\t0\n");
}
