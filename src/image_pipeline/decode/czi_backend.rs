use std::path::Path;

use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::czi::CziFile;
use crate::image_pipeline::decode::{ImageBackend, read_signature};
use crate::image_pipeline::volume::ImageVolume;

const CZI_MAGIC: &[u8] = b"ZISRAWFILE";

/// Zeiss CZI containers; scenes are series.
pub struct CziBackend;

impl ImageBackend for CziBackend {
    fn name(&self) -> &'static str {
        "czi"
    }

    fn can_open(&self, path: &Path) -> bool {
        read_signature(path, CZI_MAGIC.len()).is_some_and(|sig| sig == CZI_MAGIC)
    }

    fn series_count(&self, path: &Path) -> Result<usize> {
        Ok(CziFile::open(path)?.series_count())
    }

    fn decode(&self, path: &Path, series: usize) -> Result<ImageVolume> {
        CziFile::open(path)?.read_volume(series)
    }
}
