//! Core domain records for RMVF.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CRATE_NAME: &str = "rmvf-core";

/// Leaderboard score categories. The benchmark page renders one table per
/// category, each under a section carrying the category's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreCategory {
    SingleCore,
    MultiCore,
    OpenCl,
    Metal,
}

impl ScoreCategory {
    pub const ALL: [ScoreCategory; 4] = [
        ScoreCategory::SingleCore,
        ScoreCategory::MultiCore,
        ScoreCategory::OpenCl,
        ScoreCategory::Metal,
    ];

    /// The `id` attribute of the category's section on the leaderboard page.
    pub fn section_id(self) -> &'static str {
        match self {
            ScoreCategory::SingleCore => "single-core",
            ScoreCategory::MultiCore => "multi-core",
            ScoreCategory::OpenCl => "opencl",
            ScoreCategory::Metal => "metal",
        }
    }
}

/// One machine on the benchmark leaderboard, with scores merged across the
/// category tables it appears in. `clock_ghz` is `-1.0` when the description
/// carries no parseable clock speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub url: Option<String>,
    pub product_family: String,
    pub processor: String,
    pub clock_ghz: f64,
    pub cpu_cores: u32,
    pub gpu_cores: u32,
    pub size_inches: Option<f64>,
    pub model: String,
    pub single_core: Option<u32>,
    pub multi_core: Option<u32>,
    pub opencl: Option<u32>,
    pub metal: Option<u32>,
}

impl BenchmarkRecord {
    pub fn score(&self, category: ScoreCategory) -> Option<u32> {
        match category {
            ScoreCategory::SingleCore => self.single_core,
            ScoreCategory::MultiCore => self.multi_core,
            ScoreCategory::OpenCl => self.opencl,
            ScoreCategory::Metal => self.metal,
        }
    }

    pub fn set_score(&mut self, category: ScoreCategory, score: Option<u32>) {
        match category {
            ScoreCategory::SingleCore => self.single_core = score,
            ScoreCategory::MultiCore => self.multi_core = score,
            ScoreCategory::OpenCl => self.opencl = score,
            ScoreCategory::Metal => self.metal = score,
        }
    }

    /// Sum across all categories, with absent scores counting as zero.
    pub fn combined_score(&self) -> u32 {
        ScoreCategory::ALL
            .iter()
            .map(|category| self.score(*category).unwrap_or(0))
            .sum()
    }
}

/// One item on the refurbished-Mac listing grid. `price` is the numeric
/// reading of `price_text`, `0.0` when no leading number could be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub id: Uuid,
    pub name: String,
    pub price_text: String,
    pub url: Option<String>,
    pub product_family: String,
    pub processor: String,
    pub cpu_cores: u32,
    pub gpu_cores: u32,
    pub size_inches: Option<f64>,
    pub price: f64,
}

/// A listing joined against its benchmark evidence, carrying the
/// points-per-dollar value metric. Unmatched listings keep a metric of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub price: String,
    pub description: Option<String>,
    pub listing_url: Option<String>,
    pub benchmark_url: Option<String>,
    pub points_per_dollar: f64,
}
