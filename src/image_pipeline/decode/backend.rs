use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::volume::ImageVolume;

/// A format plugin able to turn one file into an [`ImageVolume`].
pub trait ImageBackend {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Cheap check (signature or extension) whether this backend handles `path`.
    fn can_open(&self, path: &Path) -> bool;

    /// Number of independent image series stored in the file.
    fn series_count(&self, _path: &Path) -> Result<usize> {
        Ok(1)
    }

    /// Decodes the zero-based `series` of the file.
    fn decode(&self, path: &Path, series: usize) -> Result<ImageVolume>;
}

/// Reads up to `len` leading bytes of a file, `None` if it cannot be opened.
pub fn read_signature(path: &Path, len: usize) -> Option<Vec<u8>> {
    let file = File::open(path).ok()?;
    let mut buf = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut buf).ok()?;
    Some(buf)
}

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
