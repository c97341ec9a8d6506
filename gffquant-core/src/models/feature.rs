use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::CoreError;

///
/// One annotated feature of a GFF database.
///
/// GFF coordinates are 1-based and inclusive; a `Feature` stores them
/// 0-based, half-open so they can be compared with alignments directly.
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Feature {
    pub seqid: String,
    pub start: u32,
    pub end: u32,
    pub feature_id: Option<String>,
}

impl Feature {
    pub fn width(&self) -> u32 {
        self.end - self.start
    }

    ///
    /// Parse one GFF line. Comments and blank lines yield `Ok(None)`.
    ///
    pub fn from_gff_line(line: &str) -> Result<Option<Feature>, CoreError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        line.parse().map(Some)
    }
}

/// Pull `ID=` (or, failing that, `Name=`) out of a GFF attribute column.
fn parse_feature_id(attributes: &str) -> Option<String> {
    let mut name = None;
    for attr in attributes.split(';') {
        match attr.trim().split_once('=') {
            Some(("ID", value)) => return Some(value.to_string()),
            Some(("Name", value)) if name.is_none() => name = Some(value.to_string()),
            _ => {}
        }
    }
    name
}

impl FromStr for Feature {
    type Err = CoreError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: &str| CoreError::FeatureParseError {
            line: line.to_string(),
            reason: reason.to_string(),
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            return Err(parse_error("expected at least 8 tab-separated columns"));
        }

        let start = fields[3]
            .parse::<u32>()
            .map_err(|_| parse_error("start is not an unsigned integer"))?;
        let end = fields[4]
            .parse::<u32>()
            .map_err(|_| parse_error("end is not an unsigned integer"))?;
        if start == 0 || end < start {
            return Err(CoreError::InvalidInterval { start, end });
        }

        Ok(Feature {
            seqid: fields[0].to_string(),
            start: start - 1,
            end,
            feature_id: fields.get(8).and_then(|attrs| parse_feature_id(attrs)),
        })
    }
}

impl Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.seqid,
            self.start + 1,
            self.end,
            self.feature_id.as_deref().unwrap_or(".")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_parse_gff_line() {
        let line = "contig_1\tprodigal\tCDS\t101\t200\t.\t+\t0\tID=gene_1;Name=abc";
        let feature = Feature::from_gff_line(line).unwrap().unwrap();
        assert_eq!(feature.seqid, "contig_1");
        assert_eq!(feature.start, 100);
        assert_eq!(feature.end, 200);
        assert_eq!(feature.width(), 100);
        assert_eq!(feature.feature_id.as_deref(), Some("gene_1"));
    }

    #[rstest]
    #[case("##gff-version 3")]
    #[case("")]
    fn test_skipped_lines(#[case] line: &str) {
        assert!(Feature::from_gff_line(line).unwrap().is_none());
    }

    #[rstest]
    #[case("contig_1\tsrc\tCDS\tabc\t200\t.\t+\t0\tID=x")]
    #[case("contig_1\tsrc\tCDS\t100")]
    fn test_malformed_lines(#[case] line: &str) {
        assert!(matches!(
            Feature::from_gff_line(line),
            Err(CoreError::FeatureParseError { .. })
        ));
    }

    #[rstest]
    #[case("contig_1\tsrc\tCDS\t300\t200\t.\t+\t0\tID=x", 300, 200)]
    #[case("contig_1\tsrc\tCDS\t0\t200\t.\t+\t0\tID=x", 0, 200)]
    fn test_invalid_coordinates(#[case] line: &str, #[case] start: u32, #[case] end: u32) {
        assert!(matches!(
            Feature::from_gff_line(line),
            Err(CoreError::InvalidInterval { start: s, end: e }) if s == start && e == end
        ));
    }

    #[rstest]
    #[case("Name=abc;Note=x", Some("abc"))]
    #[case("Name=abc;ID=gene_9", Some("gene_9"))]
    #[case("Note=x", None)]
    fn test_feature_id(#[case] attributes: &str, #[case] expected: Option<&str>) {
        assert_eq!(parse_feature_id(attributes).as_deref(), expected);
    }
}
