use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use gffquant_core::utils::get_dynamic_reader;
use gffquant_counting::DistributionMode;

use crate::errors::{QuantError, Result};

///
/// Settings of one counting run, read from a TOML file.
///
/// Every key is optional; unknown keys are rejected. The file may be gzipped.
///
/// ```toml
/// ambig_mode = "1overN"
/// strand_specific = true
/// ```
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CountConfig {
    pub ambig_mode: DistributionMode,
    pub strand_specific: bool,
    pub region_counts: bool,
    /// keep `<prefix>.ambig_tmp.txt` after the second pass
    pub keep_ambig_tmp: bool,
    pub compress_output: bool,
    pub show_progress: bool,
    /// also write the raw counters as `<prefix>.<counter>.raw.txt`
    pub dump_raw_counts: bool,
}

impl Default for CountConfig {
    fn default() -> Self {
        CountConfig {
            ambig_mode: DistributionMode::UniqueOnly,
            strand_specific: false,
            region_counts: true,
            keep_ambig_tmp: false,
            compress_output: false,
            show_progress: false,
            dump_raw_counts: false,
        }
    }
}

impl TryFrom<&Path> for CountConfig {
    type Error = QuantError;

    fn try_from(path: &Path) -> Result<Self> {
        let mut toml_str = String::new();
        get_dynamic_reader(path)?.read_to_string(&mut toml_str)?;
        toml::from_str(&toml_str).map_err(|source| QuantError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl CountConfig {
    /// Read `path` if given, otherwise fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => CountConfig::try_from(path),
            None => Ok(CountConfig::default()),
        }
    }
}
