//! The spill channel between the two passes.
//!
//! Feature hits of multi-mapped reads are appended to `<prefix>.ambig_tmp.txt`
//! as tab-separated integer rows
//! `qname_id ordinal rid overlap_begin overlap_end flag`. A missing overlap is
//! written as `-1` in both coordinate columns.

use std::fmt::{self, Display};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, warn};

use crate::errors::{QuantError, Result};

pub const SPILL_SUFFIX: &str = ".ambig_tmp.txt";

const NO_OVERLAP: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpillRow {
    pub qname_id: u64,
    /// 1-based position of the alignment in the archive
    pub ordinal: u64,
    pub rid: usize,
    /// `(begin, end)` of the overlapped feature, `None` if there was none
    pub overlap: Option<(u32, u32)>,
    pub flag: u16,
}

impl Display for SpillRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (begin, end) = match self.overlap {
            Some((begin, end)) => (i64::from(begin), i64::from(end)),
            None => (NO_OVERLAP, NO_OVERLAP),
        };
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.qname_id, self.ordinal, self.rid, begin, end, self.flag
        )
    }
}

fn parse_column<T: FromStr>(value: Option<&str>, name: &str) -> std::result::Result<T, String> {
    let value = value.ok_or_else(|| format!("missing column {name}"))?;
    value
        .parse()
        .map_err(|_| format!("column {name} is not a valid integer: {value}"))
}

impl FromStr for SpillRow {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut columns = line.split('\t');

        let qname_id = parse_column(columns.next(), "qname_id")?;
        let ordinal = parse_column(columns.next(), "ordinal")?;
        let rid = parse_column(columns.next(), "rid")?;
        let begin: i64 = parse_column(columns.next(), "overlap_begin")?;
        let end: i64 = parse_column(columns.next(), "overlap_end")?;
        let flag = parse_column(columns.next(), "flag")?;

        if columns.next().is_some() {
            return Err("too many columns".to_string());
        }

        let overlap = match (begin, end) {
            (NO_OVERLAP, NO_OVERLAP) => None,
            (begin, end) => match (u32::try_from(begin), u32::try_from(end)) {
                (Ok(begin), Ok(end)) => Some((begin, end)),
                _ => return Err(format!("invalid overlap [{begin}, {end})")),
            },
        };

        Ok(SpillRow {
            qname_id,
            ordinal,
            rid,
            overlap,
            flag,
        })
    }
}

/// Appends spill rows during the first pass.
pub struct SpillWriter {
    writer: BufWriter<File>,
    rows: u64,
}

impl SpillWriter {
    pub fn create(path: &Path) -> Result<SpillWriter> {
        debug!("Spilling ambiguous alignments to {}", path.display());
        Ok(SpillWriter {
            writer: BufWriter::new(File::create(path)?),
            rows: 0,
        })
    }

    pub fn write_row(&mut self, row: &SpillRow) -> Result<()> {
        writeln!(self.writer, "{row}")?;
        self.rows += 1;
        Ok(())
    }

    /// Flush and close the file. Returns the number of rows written.
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

///
/// Deletes the spill file when dropped, on success and error paths alike,
/// unless it is to be kept.
///
pub struct SpillCleanup {
    path: PathBuf,
    keep: bool,
}

impl SpillCleanup {
    pub fn new(path: &Path, keep: bool) -> Self {
        SpillCleanup {
            path: path.to_path_buf(),
            keep,
        }
    }
}

impl Drop for SpillCleanup {
    fn drop(&mut self) {
        if self.keep {
            debug!("Keeping {}", self.path.display());
            return;
        }
        if !self.path.exists() {
            return;
        }
        if let Err(err) = fs::remove_file(&self.path) {
            warn!("Could not remove {}: {}", self.path.display(), err);
        }
    }
}

///
/// Read a spill file completely and sort it by `qname_id`.
///
/// The sort is stable: rows of one read keep their file order.
///
pub fn read_sorted_spill(path: &Path) -> Result<Vec<SpillRow>> {
    let reader = BufReader::new(File::open(path)?);
    let mut rows = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let row = line
            .parse::<SpillRow>()
            .map_err(|reason| QuantError::MalformedSpill {
                path: path.to_path_buf(),
                line: index + 1,
                reason,
            })?;
        rows.push(row);
    }

    rows.sort_by_key(|row| row.qname_id);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;
    use tempfile::tempdir;

    fn row(qname_id: u64, ordinal: u64, overlap: Option<(u32, u32)>) -> SpillRow {
        SpillRow {
            qname_id,
            ordinal,
            rid: 1,
            overlap,
            flag: 0x100,
        }
    }

    #[rstest]
    #[case(row(3, 17, Some((100, 200))), "3\t17\t1\t100\t200\t256")]
    #[case(row(0, 2, None), "0\t2\t1\t-1\t-1\t256")]
    fn test_row_format(#[case] row: SpillRow, #[case] line: &str) {
        assert_eq!(row.to_string(), line);
        assert_eq!(line.parse::<SpillRow>().unwrap(), row);
    }

    #[rstest]
    #[case("1\t2\t0\t100\t200")]
    #[case("1\t2\t0\t100\t200\t0\t7")]
    #[case("1\tx\t0\t100\t200\t0")]
    #[case("1\t2\t0\t-5\t200\t0")]
    fn test_malformed_row(#[case] line: &str) {
        assert!(line.parse::<SpillRow>().is_err());
    }

    #[rstest]
    fn test_sort_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.ambig_tmp.txt");

        let mut writer = SpillWriter::create(&path).unwrap();
        let written = [
            row(1, 1, Some((10, 20))),
            row(0, 2, Some((30, 40))),
            row(1, 3, Some((50, 60))),
            row(0, 4, Some((70, 80))),
            row(1, 5, Some((10, 20))),
        ];
        for row in written.iter() {
            writer.write_row(row).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 5);

        let ordinals: Vec<(u64, u64)> = read_sorted_spill(&path)
            .unwrap()
            .iter()
            .map(|row| (row.qname_id, row.ordinal))
            .collect();
        assert_eq!(ordinals, vec![(0, 2), (0, 4), (1, 1), (1, 3), (1, 5)]);
    }

    #[rstest]
    #[case(false, false)]
    #[case(true, true)]
    fn test_cleanup(#[case] keep: bool, #[case] exists_after: bool) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.ambig_tmp.txt");
        let mut writer = SpillWriter::create(&path).unwrap();
        writer.write_row(&row(0, 1, None)).unwrap();
        writer.finish().unwrap();

        drop(SpillCleanup::new(&path, keep));
        assert_eq!(path.exists(), exists_after);
    }

    #[rstest]
    fn test_cleanup_without_file() {
        let dir = tempdir().unwrap();
        drop(SpillCleanup::new(&dir.path().join("never_written.txt"), false));
    }

    #[rstest]
    fn test_malformed_file_reports_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.ambig_tmp.txt");
        std::fs::write(&path, "0\t1\t0\t10\t20\t0\nnot a row\n").unwrap();

        assert!(matches!(
            read_sorted_spill(&path),
            Err(QuantError::MalformedSpill { line: 2, .. })
        ));
    }
}
