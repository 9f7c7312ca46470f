use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A sales region. `Total` is the composite network view, a store-count
/// weighted blend of the two concrete regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    Total,
    #[serde(rename = "SH")]
    Sh,
    #[serde(rename = "JS")]
    Js,
}

impl Region {
    pub const CONCRETE: [Region; 2] = [Region::Sh, Region::Js];

    /// Display and rendering order: composite first.
    pub const ALL: [Region; 3] = [Region::Total, Region::Sh, Region::Js];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Total => "Total",
            Self::Sh => "SH",
            Self::Js => "JS",
        }
    }

    /// Name of the region's root row.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Total => "Network (store-weighted)",
            Self::Sh => "Shanghai Region",
            Self::Js => "Jiangsu Region",
        }
    }

    pub fn is_concrete(&self) -> bool {
        !matches!(self, Self::Total)
    }
}

impl FromStr for Region {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Total" => Ok(Self::Total),
            "SH" => Ok(Self::Sh),
            "JS" => Ok(Self::Js),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Depth of a row in the region × category hierarchy. Serialized as 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Level {
    Root = 1,
    Group = 2,
    Leaf = 3,
}

impl From<Level> for u8 {
    fn from(level: Level) -> u8 {
        level as u8
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Root),
            2 => Ok(Self::Group),
            3 => Ok(Self::Leaf),
            other => Err(format!("invalid hierarchy level {}", other)),
        }
    }
}

/// One node of the hierarchy within one region.
///
/// `plan_values` is defined at every date position; `actual_values` is `None`
/// for any date that is not strictly before today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRow {
    pub id: String,
    /// Hierarchy node key shared by the same node in every region.
    pub key: String,
    pub name: String,
    pub parent_id: Option<String>,
    pub level: Level,
    pub region: Region,
    pub plan_values: Vec<f64>,
    pub actual_values: Vec<Option<f64>>,
}

impl SalesRow {
    pub fn row_id(region: Region, key: &str) -> String {
        format!("{}_{}", region.as_str(), key)
    }

    pub fn is_root(&self) -> bool {
        self.level == Level::Root
    }
}

/// Operating store count per date for one concrete region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreCountSeries {
    pub region: Region,
    pub counts: Vec<i64>,
}

/// Round to one decimal place. Applied wherever a value is computed so
/// repeated recomputation does not drift.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Store-count weighted mean of two regional values, 0 when no stores operate.
///
/// Weights are taken in `f64` so arbitrarily large counts cannot overflow.
pub fn weighted_mean(value_a: f64, value_b: f64, count_a: i64, count_b: i64) -> f64 {
    let total = count_a as f64 + count_b as f64;
    if total == 0.0 {
        return 0.0;
    }
    round1(value_a * (count_a as f64 / total) + value_b * (count_b as f64 / total))
}
