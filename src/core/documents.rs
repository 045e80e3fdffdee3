//! Source document loading from the data folder

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
}

/// Resolve `filename` inside `data_folder`
///
/// Only plain relative paths are accepted; anything that could escape the
/// data folder is rejected.
pub fn resolve_path(data_folder: &Path, filename: &str) -> Result<PathBuf, DocumentError> {
    if filename.trim().is_empty() {
        return Err(DocumentError::InvalidFilename(
            "filename must not be empty".to_string(),
        ));
    }

    let relative = Path::new(filename);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(DocumentError::InvalidFilename(filename.to_string()));
    }

    Ok(data_folder.join(relative))
}

/// Read a UTF-8 document from the data folder
pub async fn read_file(data_folder: &Path, filename: &str) -> Result<String, DocumentError> {
    let path = resolve_path(data_folder, filename)?;
    let display = path.display().to_string();

    match tokio::fs::read_to_string(&path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(DocumentError::NotFound(display)),
        Err(e) => Err(DocumentError::Read {
            path: display,
            message: e.to_string(),
        }),
    }
}
