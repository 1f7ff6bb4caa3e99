//! Input file discovery

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Lists the regular files directly inside `directory` whose name ends with
/// `extension` (case-sensitive), sorted by file name.
///
/// `None` or an empty extension disables filtering. A missing directory is
/// a `NotFound` error, while a directory without matches yields an empty list.
pub fn list_files<P: AsRef<Path>>(directory: P, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    let directory = directory.as_ref();
    if !directory.is_dir() {
        return Err(ConversionError::NotFound(directory.display().to_string()));
    }

    let suffix = extension.filter(|ext| !ext.is_empty()).map(str::as_bytes);

    let entries = std::fs::read_dir(directory)
        .map_err(|e| ConversionError::NotFound(format!("{}: {}", directory.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name() else {
            continue;
        };
        if let Some(suffix) = suffix {
            if !name.as_encoded_bytes().ends_with(suffix) {
                continue;
            }
        }
        files.push(path);
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!(
        "Found {} file(s) in {} matching {:?}",
        files.len(),
        directory.display(),
        extension.unwrap_or("")
    );
    Ok(files)
}
