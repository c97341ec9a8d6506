use std::path::PathBuf;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use gffquant_core::utils::create_prefix_dir;
use gffquant_counting::{CountManager, OverlapCounter};
use gffquant_io::AlignmentSource;
use gffquant_overlaprs::FeatureLookup;

use crate::ambiguous::resolve_all;
use crate::config::CountConfig;
use crate::errors::Result;
use crate::spill::{SPILL_SUFFIX, SpillCleanup, read_sorted_spill};
use crate::unique::UniquePass;

/// What one run of [`FeatureQuantifier::process_data`] did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub alignments: u64,
    /// informative alignments of multi-mapped reads resolved in the second pass
    pub ambiguous_alignments: usize,
    pub unannotated_reads: u64,
    pub spill_rows: u64,
    /// count tables (and raw counter dumps) written
    pub outputs: Vec<PathBuf>,
}

///
/// Counts the alignments of one archive against a feature annotation.
///
/// # Example
/// ```no_run
/// use std::path::Path;
///
/// use gffquant_io::BamFile;
/// use gffquant_overlaprs::FeatureIndex;
/// use gffquant_quantifier::{CountConfig, FeatureQuantifier};
///
/// let index = FeatureIndex::open(Path::new("genes.gff3"), Path::new("genes.gff3.index")).unwrap();
/// let bam = BamFile::open(Path::new("sample.bam"), None).unwrap();
///
/// let mut quantifier = FeatureQuantifier::new(index, CountConfig::default(), "out/sample");
/// let summary = quantifier.process_data(&bam).unwrap();
/// println!("{} unannotated reads", summary.unannotated_reads);
/// ```
pub struct FeatureQuantifier<L: FeatureLookup> {
    lookup: L,
    config: CountConfig,
    out_prefix: String,
    counter: OverlapCounter,
}

impl<L: FeatureLookup> FeatureQuantifier<L> {
    pub fn new(feature_lookup: L, config: CountConfig, out_prefix: &str) -> Self {
        info!("Ambig mode: {}", config.ambig_mode);
        let counter = OverlapCounter::new(config.region_counts, config.strand_specific);
        FeatureQuantifier {
            lookup: feature_lookup,
            config,
            out_prefix: out_prefix.to_string(),
            counter,
        }
    }

    pub fn config(&self) -> &CountConfig {
        &self.config
    }

    pub fn counts(&self) -> &CountManager {
        self.counter.counts()
    }

    pub fn spill_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}", self.out_prefix, SPILL_SUFFIX))
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_message("Resolving ambiguous alignments");
        pb
    }

    /// The second pass: sort the spill file and resolve it read by read.
    fn process_ambiguous(&mut self) -> Result<usize> {
        let start_time = Instant::now();
        let spill_path = self.spill_path();

        let rows = read_sorted_spill(&spill_path)?;
        let pb = self.progress_bar(rows.len() as u64);
        let n_align = resolve_all(rows, &mut self.counter, self.config.ambig_mode, &pb)?;
        pb.finish_and_clear();

        info!(
            "Processed {} secondary alignments in {:.3}s.",
            n_align,
            start_time.elapsed().as_secs_f64()
        );
        Ok(n_align)
    }

    ///
    /// Run both passes over `source` and write the count tables.
    ///
    /// The feature cache is cleared between the passes. The spill file is
    /// removed once the run ends, also when it fails, unless `keep_ambig_tmp`
    /// is set.
    ///
    pub fn process_data(&mut self, source: &dyn AlignmentSource) -> Result<RunSummary> {
        create_prefix_dir(&self.out_prefix)?;
        let spill_path = self.spill_path();
        let _cleanup = SpillCleanup::new(&spill_path, self.config.keep_ambig_tmp);

        let phase_one = UniquePass::new(
            self.config.ambig_mode,
            &mut self.lookup,
            &mut self.counter,
            &spill_path,
        )?
        .process(source)?;

        info!("{}", self.lookup.cache_stats());
        self.lookup.clear_cache();

        let ambiguous_alignments = match self.config.ambig_mode.requires_grouping() {
            true => self.process_ambiguous()?,
            false => 0,
        };

        self.counter.unannotated_reads += phase_one.unannotated_ambiguous;

        let mut outputs = self.counter.dump(
            &self.out_prefix,
            source,
            &mut self.lookup,
            self.config.compress_output,
        )?;
        if self.config.dump_raw_counts {
            outputs.extend(self.counter.counts().dump(&self.out_prefix, source)?);
        }

        info!("Finished.");

        Ok(RunSummary {
            alignments: phase_one.alignments,
            ambiguous_alignments,
            unannotated_reads: self.counter.total_unannotated(),
            spill_rows: phase_one.spill_rows,
            outputs,
        })
    }
}
