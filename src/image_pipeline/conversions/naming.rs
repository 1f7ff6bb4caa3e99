use std::path::{Path, PathBuf};

/// Source file name with its last extension stripped.
pub fn source_basename(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `<results_dir>/C<channel>_<basename>.tif` with a 1-based channel index.
pub fn output_path(results_dir: &Path, channel: usize, basename: &str) -> PathBuf {
    results_dir.join(format!("C{}_{}.tif", channel, basename))
}
