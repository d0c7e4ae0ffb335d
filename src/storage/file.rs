use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::{
    domain::State,
    storage::{Store, StoreError},
};

/// A store that keeps the state in a single pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// A store backed by the file at `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Option<Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("No state at {}: {e}", self.path.display());
                return None;
            }
        };
        serde_json::from_str(&content)
            .map_err(|e| {
                tracing::warn!(
                    "Ignoring malformed state file {}: {e}",
                    self.path.display()
                );
            })
            .ok()
    }

    /// Writes to a temporary file next to the target and persists it over
    /// the target, so a failed write never leaves a truncated state file.
    fn save(&self, state: &State) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(state)?;
        let directory = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(directory).map_err(|e| self.io_error(e))?;

        let mut temp = NamedTempFile::new_in(directory).map_err(|e| self.io_error(e))?;
        temp.write_all(content.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| self.io_error(e))?;
        temp.persist(&self.path).map_err(|e| self.io_error(e.error))?;
        tracing::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}
