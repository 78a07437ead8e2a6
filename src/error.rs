use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole import, match or archive run.
///
/// Per-record problems (bad rows, missing groups, unknown thresholds) never
/// surface here; they are logged and counted in the stage summaries.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON document {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "subject combination {subjects:?} is shared by groups {previous} and {current}"
    )]
    DuplicateSubjectGroup {
        subjects: Vec<String>,
        previous: String,
        current: String,
    },

    #[error("invalid HTML selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    #[error("failed to fetch {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingInput(path)
        } else {
            Self::Io { path, source }
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write configuration {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unable to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration value: {0}")]
    Invalid(String),
}
