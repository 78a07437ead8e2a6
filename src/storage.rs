use crate::error::PipelineError;
use crate::models::HistoricalArchive;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Load a required JSON document. A missing file is `MissingInput`.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, PipelineError> {
    let path = path.as_ref();
    let file = fs::File::open(path).map_err(|source| PipelineError::io(path, source))?;
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        PipelineError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!(path = %path.display(), "loaded JSON document");
    Ok(value)
}

/// Pretty-printed UTF-8 output, parent directories created as needed.
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), PipelineError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| PipelineError::io(parent, source))?;
    }
    let content = serde_json::to_string_pretty(value).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, content).map_err(|source| PipelineError::io(path, source))?;
    info!(path = %path.display(), "saved JSON document");
    Ok(())
}

/// The archive may not exist yet on the first run; a corrupt one is an error.
pub fn load_archive(path: impl AsRef<Path>) -> Result<HistoricalArchive, PipelineError> {
    match load_json(path.as_ref()) {
        Err(PipelineError::MissingInput(path)) => {
            info!(path = %path.display(), "no historical archive yet, starting empty");
            Ok(HistoricalArchive::new())
        }
        other => other,
    }
}
