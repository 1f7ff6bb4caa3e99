//! Volume data types

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::volume::{PixelType, PlaneData};

/// Extent of a hyperstack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeShape {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
}

impl VolumeShape {
    pub fn new(width: usize, height: usize, channels: usize, slices: usize, frames: usize) -> Self {
        Self {
            width,
            height,
            channels,
            slices,
            frames,
        }
    }

    pub fn plane_count(&self) -> usize {
        self.channels * self.slices * self.frames
    }

    pub fn plane_pixels(&self) -> usize {
        self.width * self.height
    }

    /// `plane_count` without overflow, `None` when it would wrap.
    pub fn checked_plane_count(&self) -> Option<usize> {
        self.channels.checked_mul(self.slices)?.checked_mul(self.frames)
    }

    /// Bytes per plane for `pixel_type`, `None` when it would wrap.
    pub fn checked_plane_len(&self, pixel_type: PixelType) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(pixel_type.bytes_per_sample())
    }
}

/// Linear display mapping for one channel. Never applied to stored samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
}

/// Series layout of a container file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesDescriptor {
    /// Zero-based series chosen for decoding
    pub index: usize,
    /// Number of series found in the file
    pub count: usize,
}

/// Multi-channel hyperstack.
///
/// Planes are stored channel-fastest, then slice, then frame, which is the
/// order ImageJ hyperstacks use on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageVolume {
    shape: VolumeShape,
    pixel_type: PixelType,
    bits_per_sample: u32,
    planes: Vec<PlaneData>,
    display_ranges: Vec<Option<DisplayRange>>,
}

/// Owned pieces of a volume, used when planes change hands.
pub(crate) struct VolumeParts {
    pub shape: VolumeShape,
    pub pixel_type: PixelType,
    pub bits_per_sample: u32,
    pub planes: Vec<PlaneData>,
    pub display_ranges: Vec<Option<DisplayRange>>,
}

impl ImageVolume {
    /// Builds a volume after checking that every plane matches the shape.
    pub fn new(
        shape: VolumeShape,
        pixel_type: PixelType,
        bits_per_sample: u32,
        planes: Vec<PlaneData>,
    ) -> Result<Self> {
        if shape.width == 0 || shape.height == 0 {
            return Err(ConversionError::InvalidDimensions(shape.width, shape.height));
        }
        if shape.channels == 0 || shape.slices == 0 || shape.frames == 0 {
            return Err(ConversionError::DecodeError(format!(
                "empty hyperstack: channels={}, slices={}, frames={}",
                shape.channels, shape.slices, shape.frames
            )));
        }
        let (Some(plane_count), Some(plane_len)) =
            (shape.checked_plane_count(), shape.checked_plane_len(pixel_type))
        else {
            return Err(ConversionError::InvalidDimensions(shape.width, shape.height));
        };
        if planes.len() != plane_count {
            return Err(ConversionError::DecodeError(format!(
                "expected {} planes, got {}",
                plane_count,
                planes.len()
            )));
        }
        if let Some(bad) = planes.iter().find(|p| p.len() != plane_len) {
            return Err(ConversionError::DecodeError(format!(
                "plane holds {} bytes, expected {}",
                bad.len(),
                plane_len
            )));
        }
        let bits_per_sample = if bits_per_sample == 0 {
            pixel_type.container_bits()
        } else {
            bits_per_sample.min(pixel_type.container_bits())
        };

        Ok(Self {
            shape,
            pixel_type,
            bits_per_sample,
            planes,
            display_ranges: vec![None; shape.channels],
        })
    }

    pub fn shape(&self) -> VolumeShape {
        self.shape
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn slices(&self) -> usize {
        self.shape.slices
    }

    pub fn frames(&self) -> usize {
        self.shape.frames
    }

    pub fn pixel_type(&self) -> PixelType {
        self.pixel_type
    }

    /// Significant bits per sample (e.g. 12 for a 12-bit camera in a 16-bit container).
    pub fn bits_per_sample(&self) -> u32 {
        self.bits_per_sample
    }

    /// Zero-based plane position of (channel, slice, frame).
    pub fn plane_index(&self, channel: usize, slice: usize, frame: usize) -> usize {
        debug_assert!(channel < self.shape.channels);
        debug_assert!(slice < self.shape.slices);
        debug_assert!(frame < self.shape.frames);
        (frame * self.shape.slices + slice) * self.shape.channels + channel
    }

    /// Raw little-endian bytes of one plane, zero-based indices.
    pub fn plane(&self, channel: usize, slice: usize, frame: usize) -> &[u8] {
        self.planes[self.plane_index(channel, slice, frame)].as_bytes()
    }

    pub fn planes(&self) -> &[PlaneData] {
        &self.planes
    }

    pub fn display_range(&self, channel: usize) -> Option<DisplayRange> {
        self.display_ranges.get(channel).copied().flatten()
    }

    pub fn set_display_range(&mut self, channel: usize, range: Option<DisplayRange>) {
        if let Some(slot) = self.display_ranges.get_mut(channel) {
            *slot = range;
        }
    }

    pub(crate) fn into_parts(self) -> VolumeParts {
        VolumeParts {
            shape: self.shape,
            pixel_type: self.pixel_type,
            bits_per_sample: self.bits_per_sample,
            planes: self.planes,
            display_ranges: self.display_ranges,
        }
    }

    pub(crate) fn from_parts(parts: VolumeParts) -> Result<Self> {
        let mut volume = Self::new(
            parts.shape,
            parts.pixel_type,
            parts.bits_per_sample,
            parts.planes,
        )?;
        for (channel, range) in parts.display_ranges.into_iter().enumerate() {
            volume.set_display_range(channel, range);
        }
        Ok(volume)
    }
}

/// One channel of a source image, ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelImage {
    /// Single-channel volume holding the full slice/frame stack
    pub volume: ImageVolume,
    /// 1-based channel index in the source image
    pub channel: usize,
    /// Source file name without its extension
    pub source_name: String,
}
