//! Durable per-backend checkpoints and final result documents.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::AppError;
use crate::models::Backend;
use crate::state::{FinalReport, SearchState};

/// JSON checkpoint file for one backend.
///
/// The file exists exactly while that backend's run is incomplete.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/checkpoint_<backend>.json`.
    pub fn for_backend(dir: &Path, backend: Backend) -> Self {
        Self::new(dir.join(backend.checkpoint_file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Reads the checkpoint. A missing file means a fresh run.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SerializationError` if the file is not a valid checkpoint.
    pub fn load(&self) -> Result<Option<SearchState>, AppError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = serde_json::from_str(&text)?;
        debug!(path = %self.path.display(), "Loaded checkpoint");
        Ok(Some(state))
    }

    /// Writes the whole state, replacing any previous checkpoint.
    ///
    /// The state is written to a sibling temp file and renamed into place, so
    /// a crash mid-write leaves the previous checkpoint intact.
    pub fn save(&self, state: &SearchState) -> Result<(), AppError> {
        let json = serde_json::to_string(state)?;
        write_replacing(&self.path, json.as_bytes())
    }

    /// Removes the checkpoint. Removing a missing checkpoint is not an error.
    pub fn clear(&self) -> Result<(), AppError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Writes the indented final result document.
pub fn write_report(path: &Path, report: &FinalReport) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(report)?;
    write_replacing(path, json.as_bytes())
}

fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
