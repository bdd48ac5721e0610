//! Local copies of uploaded documents.
//!
//! The upload API reads from a path, so incoming bytes are written to a temp
//! file that outlives this call. The session removes it when the document is
//! cleared, replaced, or its upload fails.

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Suffix for the temp file, taken from the uploaded file's extension.
pub fn suffix_for(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_else(|| ".pdf".to_string())
}

/// Write `bytes` to a persistent temp file and return its path.
pub fn save_uploaded_file(bytes: &[u8], suffix: &str) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("docquery-")
        .suffix(suffix)
        .tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;

    let (_, path) = file.keep().map_err(|e| e.error)?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved uploaded file");
    Ok(path)
}

/// Remove a temp file. Missing files and removal errors are not surfaced.
pub fn cleanup_local_file(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if !path.exists() {
        return;
    }
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed local file"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove local file"),
    }
}
