use std::path::Path;

use tracing::{debug, info};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::decode::{CziBackend, ImageBackend, RawLoaderBackend, TiffBackend};
use crate::image_pipeline::volume::{ImageVolume, SeriesDescriptor};

/// Decodes files through the first registered backend that accepts them.
pub struct ImageDecoder {
    backends: Vec<Box<dyn ImageBackend>>,
    series: usize,
}

impl Default for ImageDecoder {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ImageDecoder {
    /// Standard registry (CZI, camera RAW, TIFF) reading series `series`
    /// whenever a file holds more than one.
    pub fn new(series: usize) -> Self {
        Self::with_backends(
            vec![
                Box::new(CziBackend),
                Box::new(RawLoaderBackend),
                Box::new(TiffBackend),
            ],
            series,
        )
    }

    pub fn with_backends(backends: Vec<Box<dyn ImageBackend>>, series: usize) -> Self {
        Self { backends, series }
    }

    pub fn set_series(&mut self, series: usize) {
        self.series = series;
    }

    pub fn backend_for(&self, path: &Path) -> Result<&dyn ImageBackend> {
        self.backends
            .iter()
            .find(|backend| backend.can_open(path))
            .map(|backend| backend.as_ref())
            .ok_or_else(|| {
                ConversionError::DecodeError(format!(
                    "{}: no backend recognises this file",
                    path.display()
                ))
            })
    }

    /// Counts the series of `path` and picks the one to decode.
    pub fn probe(&self, path: &Path) -> Result<SeriesDescriptor> {
        let backend = self.backend_for(path)?;
        self.probe_with(backend, path)
    }

    fn probe_with(&self, backend: &dyn ImageBackend, path: &Path) -> Result<SeriesDescriptor> {
        let count = backend
            .series_count(path)
            .map_err(|e| into_decode_error(path, e))?;
        if count == 0 {
            return Err(ConversionError::DecodeError(format!(
                "{}: no image series found",
                path.display()
            )));
        }

        let index = if count > 1 {
            info!(
                "Found series data. Image series count = {}, reading series {}",
                count, self.series
            );
            self.series
        } else {
            0
        };

        if index >= count {
            return Err(ConversionError::DecodeError(format!(
                "{}: series {} requested but only {} present",
                path.display(),
                index,
                count
            )));
        }

        Ok(SeriesDescriptor { index, count })
    }

    /// Decodes the selected series of `path`.
    pub fn decode(&self, path: &Path) -> Result<ImageVolume> {
        let backend = self.backend_for(path)?;
        debug!("Decoding {} with {} backend", path.display(), backend.name());

        let series = self.probe_with(backend, path)?;
        backend
            .decode(path, series.index)
            .map_err(|e| into_decode_error(path, e))
    }
}

/// Folds I/O failures while reading into the decode category.
fn into_decode_error(path: &Path, error: ConversionError) -> ConversionError {
    match error {
        ConversionError::IoError(e) => {
            ConversionError::DecodeError(format!("{}: {}", path.display(), e))
        }
        other => other,
    }
}
