use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

///
/// How the weight of a multi-mapped read is spread over its candidates.
///
/// - `unique_only`: ambiguous alignments are not read at all.
/// - `dist1`: every distinct candidate feature gets an equal share of one read.
/// - `1overN`: every informative alignment hit gets `1/n_align`.
/// - `all1`: every alignment counts in full, immediately, without grouping.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DistributionMode {
    #[default]
    #[serde(rename = "unique_only")]
    UniqueOnly,
    #[serde(rename = "dist1")]
    Dist1,
    #[serde(rename = "1overN")]
    OneOverN,
    #[serde(rename = "all1")]
    All1,
}

impl DistributionMode {
    /// Whether ambiguous alignments are read from the archive at all.
    pub fn allows_multiple(&self) -> bool {
        !matches!(self, DistributionMode::UniqueOnly)
    }

    /// Whether ambiguous alignments are deferred and resolved per read group.
    pub fn requires_grouping(&self) -> bool {
        matches!(self, DistributionMode::Dist1 | DistributionMode::OneOverN)
    }
}

impl FromStr for DistributionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unique_only" => Ok(DistributionMode::UniqueOnly),
            "dist1" => Ok(DistributionMode::Dist1),
            "1overN" => Ok(DistributionMode::OneOverN),
            "all1" => Ok(DistributionMode::All1),
            _ => Err(format!(
                "Invalid distribution mode: {s}. Valid options are unique_only, dist1, 1overN, all1"
            )),
        }
    }
}

impl Display for DistributionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            DistributionMode::UniqueOnly => "unique_only",
            DistributionMode::Dist1 => "dist1",
            DistributionMode::OneOverN => "1overN",
            DistributionMode::All1 => "all1",
        };
        write!(f, "{token}")
    }
}
