use crate::error::ConfigError;
use crate::subjects::SubjectVocabulary;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::warn;

/// institution -> program -> record for a single admission year.
pub type DepartmentDataset = BTreeMap<String, BTreeMap<String, DepartmentRecord>>;

/// group id -> subject group with its cumulative percentile table.
pub type PercentileTables = BTreeMap<String, SubjectGroup>;

/// institution -> program -> year -> record snapshot.
pub type HistoricalArchive = BTreeMap<String, BTreeMap<String, BTreeMap<String, DepartmentRecord>>>;

/// school name -> region name.
pub type SchoolRegions = BTreeMap<String, String>;

pub const DEFAULT_YEARS_TO_KEEP: u32 = 3;
pub const DEFAULT_INDIGENOUS_BONUS_FACTOR: f64 = 1.35;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub current_year: u32,
    #[serde(default = "default_years_to_keep")]
    pub years_to_keep: u32,
    #[serde(default = "default_bonus_factor")]
    pub indigenous_bonus_factor: f64,
    #[serde(default)]
    pub reject_duplicate_groups: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub region_pages: Vec<RegionPage>,
    #[serde(default)]
    pub subjects: SubjectVocabulary,
}

fn default_years_to_keep() -> u32 {
    DEFAULT_YEARS_TO_KEEP
}

fn default_bonus_factor() -> f64 {
    DEFAULT_INDIGENOUS_BONUS_FACTOR
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locations of every document the pipeline reads or writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub exam_csv: Option<PathBuf>,
    pub distribution_csv: Option<PathBuf>,
    pub department_data: PathBuf,
    pub score_distribution: PathBuf,
    pub matched_output: PathBuf,
    pub matched_csv: Option<PathBuf>,
    pub historical_archive: PathBuf,
    pub school_regions: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            exam_csv: None,
            distribution_csv: None,
            department_data: PathBuf::from("division_exam_data.json"),
            score_distribution: PathBuf::from("score_distribution.json"),
            matched_output: PathBuf::from("matched_result.json"),
            matched_csv: None,
            historical_archive: PathBuf::from("historical_results.json"),
            school_regions: PathBuf::from("schools_by_region.json"),
        }
    }
}

/// A saved (or remote) school listing page for one region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionPage {
    pub region: String,
    pub file: Option<PathBuf>,
    pub url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            current_year: 114,
            years_to_keep: DEFAULT_YEARS_TO_KEEP,
            indigenous_bonus_factor: DEFAULT_INDIGENOUS_BONUS_FACTOR,
            reject_duplicate_groups: false,
            log_level: default_log_level(),
            paths: PathsConfig::default(),
            region_pages: vec![RegionPage {
                region: "嘉南".to_string(),
                file: Some(PathBuf::from("datas/areas/嘉南.html")),
                url: None,
            }],
            subjects: SubjectVocabulary::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = file_path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = file_path.as_ref();
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.current_year == 0 {
            return Err(ConfigError::Invalid(
                "current_year must be a positive integer".to_string(),
            ));
        }
        if self.years_to_keep == 0 {
            return Err(ConfigError::Invalid(
                "years_to_keep must be at least 1".to_string(),
            ));
        }
        if !self.indigenous_bonus_factor.is_finite() || self.indigenous_bonus_factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "indigenous_bonus_factor must be a positive number, got {}",
                self.indigenous_bonus_factor
            )));
        }
        Ok(())
    }
}

/// Subject name -> multiplier. The key set is the program's subject combination.
/// Loaded maps go through [`SubjectMultipliers::insert`], so stored data
/// obeys the same positivity rule as freshly parsed criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, f64>",
    into = "BTreeMap<String, f64>"
)]
pub struct SubjectMultipliers(BTreeMap<String, f64>);

impl SubjectMultipliers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-positive or non-finite multipliers are rejected and `false` returned.
    pub fn insert(&mut self, subject: impl Into<String>, multiplier: f64) -> bool {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return false;
        }
        self.0.insert(subject.into(), multiplier);
        true
    }

    pub fn get(&self, subject: &str) -> Option<f64> {
        self.0.get(subject).copied()
    }

    /// `W`: the sum of all multipliers.
    pub fn weighted_sum(&self) -> f64 {
        self.0.values().sum()
    }

    /// `N`: the number of subjects.
    pub fn subject_count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn subject_set(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(subject, multiplier)| (subject.as_str(), *multiplier))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for SubjectMultipliers {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut multipliers = Self::new();
        for (subject, multiplier) in iter {
            multipliers.insert(subject, multiplier);
        }
        multipliers
    }
}

impl From<BTreeMap<String, f64>> for SubjectMultipliers {
    fn from(raw: BTreeMap<String, f64>) -> Self {
        let mut multipliers = Self::new();
        for (subject, multiplier) in raw {
            if !multipliers.insert(subject.as_str(), multiplier) {
                warn!(%subject, multiplier, "dropping non-positive stored multiplier");
            }
        }
        multipliers
    }
}

impl From<SubjectMultipliers> for BTreeMap<String, f64> {
    fn from(multipliers: SubjectMultipliers) -> Self {
        multipliers.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    #[serde(rename = "科目倍數", default)]
    pub subject_multipliers: SubjectMultipliers,
    #[serde(rename = "錄取人數", default)]
    pub admitted_count: u32,
    #[serde(rename = "一般考生錄取標準", default)]
    pub general_score: Option<f64>,
    #[serde(
        rename = "原住民考生錄取標準",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub indigenous_score: Option<f64>,
    #[serde(rename = "組別代號", default)]
    pub group_id: Option<String>,
    #[serde(rename = "達標比例", default)]
    pub percentile_rank: Option<f64>,
}

impl DepartmentRecord {
    pub fn new(subject_multipliers: SubjectMultipliers, admitted_count: u32) -> Self {
        Self {
            subject_multipliers,
            admitted_count,
            general_score: None,
            indigenous_score: None,
            group_id: None,
            percentile_rank: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectGroup {
    #[serde(rename = "科目組合", default)]
    pub subjects: Vec<String>,
    /// Integer score threshold (as a string) -> % of candidates at or above it.
    #[serde(rename = "累積百分比", default)]
    pub cumulative_percentiles: BTreeMap<String, f64>,
}

impl SubjectGroup {
    pub fn subject_set(&self) -> BTreeSet<String> {
        self.subjects.iter().cloned().collect()
    }

    pub fn percentile_at(&self, threshold: u64) -> Option<f64> {
        self.cumulative_percentiles
            .get(&threshold.to_string())
            .copied()
    }
}

/// Two-decimal rounding used for every stored score and percentile.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
