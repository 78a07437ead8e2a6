//! Admission cut-off normalization, cohort percentile matching and a rolling
//! multi-year archive of the results.

pub mod analyzer;
pub mod distribution;
pub mod error;
pub mod exam_csv;
pub mod groups;
pub mod history;
pub mod models;
pub mod normalizer;
pub mod percentile;
pub mod pipeline;
pub mod report;
pub mod scraper;
pub mod storage;
pub mod subjects;
pub mod telemetry;

pub use analyzer::{MatchSummary, PercentileAnalyzer};
pub use error::{ConfigError, PipelineError};
pub use groups::SubjectGroupIndex;
pub use history::{EvictionSummary, HistoryMerger, MergeOutcome};
pub use models::{
    Config, DepartmentDataset, DepartmentRecord, HistoricalArchive, PercentileTables,
    SubjectGroup, SubjectMultipliers,
};
pub use normalizer::{Normalized, ScoreNormalizer};
pub use percentile::PercentileResolver;
pub use pipeline::{Pipeline, RunReport};
pub use subjects::SubjectVocabulary;
