use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::ArgMatches;
use log::info;

use gffquant_core::utils::create_prefix_dir;
use gffquant_io::BamFile;
use gffquant_overlaprs::FeatureIndex;
use gffquant_overlaprs::consts::INDEX_SUFFIX;
use gffquant_quantifier::{CountConfig, FeatureQuantifier};

/// Input paths of one run, checked before any work starts.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantInputs {
    pub gff_file: PathBuf,
    pub gff_index: PathBuf,
    pub bam_file: PathBuf,
    pub name_sorted_bam: Option<PathBuf>,
}

fn index_path(gff_file: &Path) -> PathBuf {
    let mut index = gff_file.as_os_str().to_owned();
    index.push(INDEX_SUFFIX);
    PathBuf::from(index)
}

///
/// Create the output directory and make sure every input exists.
///
pub fn check_inputs(
    gff_file: &Path,
    bam_file: &Path,
    name_sorted_bam: Option<&Path>,
    out_prefix: &str,
) -> Result<QuantInputs> {
    create_prefix_dir(out_prefix)
        .with_context(|| format!("Cannot create output directory for {out_prefix}"))?;

    ensure!(gff_file.exists(), "gff database {} does not exist", gff_file.display());

    let gff_index = index_path(gff_file);
    ensure!(
        gff_index.exists(),
        "gff index {} does not exist",
        gff_index.display()
    );

    ensure!(bam_file.exists(), "bam file {} does not exist", bam_file.display());

    if let Some(name_sorted_bam) = name_sorted_bam {
        ensure!(
            name_sorted_bam.exists(),
            "name-sorted bam file {} does not exist",
            name_sorted_bam.display()
        );
    }

    Ok(QuantInputs {
        gff_file: gff_file.to_path_buf(),
        gff_index,
        bam_file: bam_file.to_path_buf(),
        name_sorted_bam: name_sorted_bam.map(Path::to_path_buf),
    })
}

pub fn run_quant(matches: &ArgMatches) -> Result<()> {
    let gff_file = matches
        .get_one::<String>("gff_file")
        .context("A path to a gff database is required.")?;
    let bam_file = matches
        .get_one::<String>("bam_file")
        .context("A path to a bam file is required.")?;
    let out_prefix = matches
        .get_one::<String>("out_prefix")
        .context("An output prefix is required.")?;
    let count_config = matches.get_one::<String>("count_config").map(Path::new);
    let name_sorted_bam = matches.get_one::<String>("name_sorted_bam").map(Path::new);

    let inputs = check_inputs(
        Path::new(gff_file),
        Path::new(bam_file),
        name_sorted_bam,
        out_prefix,
    )?;

    let config = CountConfig::load(count_config).context("Failed to load count config")?;

    let feature_index = FeatureIndex::open(&inputs.gff_file, &inputs.gff_index)
        .with_context(|| format!("Failed to open gff database {gff_file}"))?;
    let bam = BamFile::open(&inputs.bam_file, inputs.name_sorted_bam.as_deref())
        .with_context(|| format!("Failed to open bam file {bam_file}"))?;

    let mut quantifier = FeatureQuantifier::new(feature_index, config, out_prefix);
    let summary = quantifier.process_data(&bam)?;

    info!(
        "Counted {} alignments ({} ambiguous alignments resolved, {} unannotated reads)",
        summary.alignments, summary.ambiguous_alignments, summary.unannotated_reads
    );
    for output in summary.outputs.iter() {
        info!("Output: {}", output.display());
    }

    Ok(())
}
