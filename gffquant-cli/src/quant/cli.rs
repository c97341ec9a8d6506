use clap::{Arg, Command};

use crate::consts::BIN_NAME;

pub const DEFAULT_OUT_PREFIX: &str = "gffquant";

pub fn create_quant_cli() -> Command {
    Command::new(BIN_NAME)
        .author("gffquant developers")
        .about("Count alignments against the features of a GFF database")
        .arg_required_else_help(true)
        .arg(
            Arg::new("gff_file")
                .required(true)
                .help("GFF3 feature database; <gff_file>.index must sit next to it"),
        )
        .arg(
            Arg::new("bam_file")
                .required(true)
                .help("Position-sorted alignments"),
        )
        .arg(
            Arg::new("out_prefix")
                .short('o')
                .long("out_prefix")
                .default_value(DEFAULT_OUT_PREFIX)
                .help("Prefix of the output files, may include a directory"),
        )
        .arg(
            Arg::new("count_config")
                .long("count_config")
                .help("TOML file with counting options"),
        )
        .arg(
            Arg::new("name_sorted_bam")
                .short('n')
                .long("name_sorted_bam")
                .help("Name-sorted copy of the alignments, used to find multimapped reads"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    fn test_parse_defaults() {
        let matches = create_quant_cli()
            .try_get_matches_from(["gffquant", "genes.gff3", "sample.bam"])
            .unwrap();
        assert_eq!(
            matches.get_one::<String>("out_prefix").map(String::as_str),
            Some(DEFAULT_OUT_PREFIX)
        );
        assert!(matches.get_one::<String>("count_config").is_none());
    }

    #[rstest]
    fn test_parse_options() {
        let matches = create_quant_cli()
            .try_get_matches_from([
                "gffquant",
                "genes.gff3",
                "sample.bam",
                "-o",
                "out/sample",
                "--count_config",
                "counts.toml",
                "-n",
                "sample.qname.bam",
            ])
            .unwrap();
        assert_eq!(matches.get_one::<String>("bam_file").unwrap(), "sample.bam");
        assert_eq!(matches.get_one::<String>("out_prefix").unwrap(), "out/sample");
        assert_eq!(
            matches.get_one::<String>("name_sorted_bam").unwrap(),
            "sample.qname.bam"
        );
    }

    #[rstest]
    fn test_missing_bam() {
        assert!(
            create_quant_cli()
                .try_get_matches_from(["gffquant", "genes.gff3"])
                .is_err()
        );
    }
}
