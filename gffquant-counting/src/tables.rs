use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;

use gffquant_core::utils::get_dynamic_writer;

use crate::consts::{FEATURE_TABLE_SUFFIX, SEQNAME_TABLE_SUFFIX, UNANNOTATED_ROW};
use crate::errors::Result;

/// Counts of one reference sequence; one value per strand column group.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqCountRow {
    pub seqid: String,
    pub length: usize,
    pub uniq: Vec<u64>,
    pub ambig: Vec<f64>,
}

/// Counts of one feature. `start` is 1-based inclusive, `end` inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCountRow {
    pub seqid: String,
    pub start: u32,
    pub end: u32,
    pub feature_id: String,
    pub uniq: Vec<u64>,
    pub ambig: Vec<f64>,
}

///
/// The finished count tables of one run, ready to be written.
///
/// Rows are in reference-id order, features additionally in coordinate order.
///
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CountTables {
    pub strand_specific: bool,
    pub unannotated: u64,
    pub seq_rows: Vec<SeqCountRow>,
    /// `None` when region counting is disabled
    pub feature_rows: Option<Vec<FeatureCountRow>>,
}

fn count_header(strand_specific: bool) -> String {
    let columns = ["uniq_raw", "ambig_raw", "combined_raw"];
    match strand_specific {
        true => ["plus", "minus"]
            .iter()
            .flat_map(|strand| columns.iter().map(move |col| format!("{col}_{strand}")))
            .collect::<Vec<_>>()
            .join("\t"),
        false => columns.join("\t"),
    }
}

fn count_columns(uniq: &[u64], ambig: &[f64]) -> String {
    uniq.iter()
        .zip(ambig.iter())
        .map(|(&uniq, &ambig)| format!("{uniq}\t{ambig}\t{}", uniq as f64 + ambig))
        .collect::<Vec<_>>()
        .join("\t")
}

fn table_path(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{prefix}.{suffix}"))
}

fn final_path(path: &Path, compress: bool) -> PathBuf {
    match compress {
        true => PathBuf::from(format!("{}.gz", path.display())),
        false => path.to_path_buf(),
    }
}

impl CountTables {
    pub fn write_seqname_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "seqid\tlength\t{}", count_header(self.strand_specific))?;
        writeln!(writer, "{UNANNOTATED_ROW}\t{}", self.unannotated)?;
        for row in self.seq_rows.iter() {
            writeln!(
                writer,
                "{}\t{}\t{}",
                row.seqid,
                row.length,
                count_columns(&row.uniq, &row.ambig)
            )?;
        }
        Ok(())
    }

    pub fn write_feature_table<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(
            writer,
            "seqid\tstart\tend\tfeature_id\t{}",
            count_header(self.strand_specific)
        )?;
        for row in self.feature_rows.iter().flatten() {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                row.seqid,
                row.start,
                row.end,
                row.feature_id,
                count_columns(&row.uniq, &row.ambig)
            )?;
        }
        Ok(())
    }

    ///
    /// Write `<prefix>.seqname.txt` and, with region counting,
    /// `<prefix>.feature_counts.txt`. Returns the paths written.
    ///
    /// # Arguments
    /// - prefix: output prefix, may contain a directory part
    /// - compress: gzip the tables and append `.gz` to their names
    pub fn write(&self, prefix: &str, compress: bool) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        let path = table_path(prefix, SEQNAME_TABLE_SUFFIX);
        let mut writer = get_dynamic_writer(&path, compress)?;
        self.write_seqname_table(&mut writer)?;
        writer.flush()?;
        written.push(final_path(&path, compress));

        if self.feature_rows.is_some() {
            let path = table_path(prefix, FEATURE_TABLE_SUFFIX);
            let mut writer = get_dynamic_writer(&path, compress)?;
            self.write_feature_table(&mut writer)?;
            writer.flush()?;
            written.push(final_path(&path, compress));
        }

        for path in written.iter() {
            info!("Wrote {}", path.display());
        }

        Ok(written)
    }
}
