//! Camera RAW reading using the rawloader library.
//!
//! Some acquisition setups record through consumer cameras. Their RAW files
//! (ARW, CR2, NEF, DNG, etc.) are decoded as undemosaiced sensor data: a
//! one-channel 16-bit volume, or one channel per colour component when the
//! file already stores several components per pixel.

use std::io::Cursor;
use std::path::Path;

use rawloader::RawImageData as RawloaderImageData;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::decode::{ImageBackend, has_extension};
use crate::image_pipeline::volume::{ImageVolume, PixelType, PlaneData, VolumeShape};

const RAW_EXTENSIONS: [&str; 14] = [
    "arw", "srf", "sr2", "cr2", "crw", "nef", "nrw", "dng", "raf", "orf", "rw2", "pef", "srw",
    "3fr",
];

/// Default bit depth when no white level information is available from the RAW file.
const DEFAULT_BITS_PER_SAMPLE: u32 = 16;

/// The bit width of the u16 data type, used for calculating actual bits per sample.
const U16_BITS: u32 = 16;

pub struct RawLoaderBackend;

impl RawLoaderBackend {
    /// Decodes RAW bytes into a volume.
    ///
    /// Integer sensor data is kept as is, float data (normalised 0.0-1.0) is
    /// scaled to the u16 range. The significant bit depth comes from the
    /// sensor white level.
    pub fn decode_bytes(&self, data: &[u8]) -> Result<ImageVolume> {
        debug!("Decoding RAW image, {} bytes", data.len());

        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        let width = decoded.width;
        let height = decoded.height;
        let components = decoded.cpp.max(1);

        debug!("Decoded RAW frame: {}x{}, {} component(s)", width, height, components);

        let samples: Vec<u16> = match decoded.data {
            RawloaderImageData::Integer(values) => values,
            RawloaderImageData::Float(values) => {
                values.iter().map(|&v| (v * u16::MAX as f32) as u16).collect()
            }
        };

        // e.g. a white level of 4095 means a 12-bit sensor
        let max_white_level = decoded.whitelevels.iter().max().copied().unwrap_or(u16::MAX);
        let bits_per_sample = if max_white_level == 0 {
            DEFAULT_BITS_PER_SAMPLE
        } else {
            U16_BITS - max_white_level.leading_zeros()
        };

        let mut planes = vec![Vec::with_capacity(width * height * 2); components];
        for (i, sample) in samples.iter().enumerate() {
            planes[i % components].extend_from_slice(&sample.to_le_bytes());
        }

        ImageVolume::new(
            VolumeShape::new(width, height, components, 1, 1),
            PixelType::U16,
            bits_per_sample,
            planes.into_iter().map(PlaneData::Owned).collect(),
        )
    }
}

impl ImageBackend for RawLoaderBackend {
    fn name(&self) -> &'static str {
        "rawloader"
    }

    fn can_open(&self, path: &Path) -> bool {
        has_extension(path, &RAW_EXTENSIONS)
    }

    fn decode(&self, path: &Path, _series: usize) -> Result<ImageVolume> {
        let data = std::fs::read(path)
            .map_err(|e| ConversionError::DecodeError(format!("{}: {}", path.display(), e)))?;
        self.decode_bytes(&data)
    }
}
