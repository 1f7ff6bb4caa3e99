//! Display contrast normalization
//!
//! Computes a per-channel display range with a saturation-based contrast
//! stretch. Only the display metadata of the volume changes; sample values
//! are left untouched.

use tracing::debug;

use crate::image_pipeline::volume::{DisplayRange, ImageVolume, PixelType};

/// Percentage of pixels allowed to saturate, split evenly between both ends.
pub const DEFAULT_SATURATED: f64 = 0.35;

const HISTOGRAM_BINS: usize = 256;

pub struct DisplayNormalizer {
    saturated: f64,
}

impl Default for DisplayNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SATURATED)
    }
}

impl DisplayNormalizer {
    pub fn new(saturated: f64) -> Self {
        Self {
            saturated: saturated.max(0.0),
        }
    }

    pub fn saturated(&self) -> f64 {
        self.saturated
    }

    /// 1-based slice position sampled for the stretch.
    ///
    /// Computed as `slices / 2` when that is 0 and `slices / 2 + 1`
    /// otherwise, then clamped to `1..=slices`. For stacks of two or more
    /// slices this lands one past the arithmetic middle of even stacks
    /// (2 of 2, 3 of 4). Kept as is so display ranges match earlier runs.
    pub fn representative_slice(slices: usize) -> usize {
        let half = slices / 2;
        let position = if half == 0 { half } else { half + 1 };
        position.clamp(1, slices.max(1))
    }

    /// Sets a display range on every channel, sampling the representative
    /// slice of the first frame.
    pub fn normalize(&self, mut volume: ImageVolume) -> ImageVolume {
        let slice = Self::representative_slice(volume.slices()) - 1;
        for channel in 0..volume.channels() {
            let range = self.stretch(volume.pixel_type(), volume.plane(channel, slice, 0));
            debug!(
                "Channel {} display range from slice {}: {:?}",
                channel + 1,
                slice + 1,
                range
            );
            volume.set_display_range(channel, range);
        }
        volume
    }

    /// Saturation stretch of one plane.
    ///
    /// Builds a 256-bin histogram (fixed 0..=255 bins for 8-bit data, the
    /// plane's own [min, max] otherwise), then walks in from both ends until
    /// more than `saturated / 2` percent of the pixels have been passed.
    /// Returns `None` when the plane is flat or the walk from both ends meets.
    pub fn stretch(&self, pixel_type: PixelType, plane: &[u8]) -> Option<DisplayRange> {
        let values: Vec<f64> = pixel_type.samples(plane).filter(|v| v.is_finite()).collect();
        if values.is_empty() {
            return None;
        }

        let (hist_min, bin_size) = match pixel_type {
            PixelType::U8 => (0.0, 1.0),
            _ => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (min, (max - min) / HISTOGRAM_BINS as f64)
            }
        };

        let mut histogram = [0usize; HISTOGRAM_BINS];
        for &value in &values {
            let bin = if bin_size > 0.0 {
                ((value - hist_min) / bin_size) as usize
            } else {
                0
            };
            histogram[bin.min(HISTOGRAM_BINS - 1)] += 1;
        }

        let threshold = if self.saturated > 0.0 {
            (values.len() as f64 * self.saturated / 200.0) as usize
        } else {
            0
        };

        let mut count = 0;
        let mut hmin = 0;
        for (i, &bin) in histogram.iter().enumerate() {
            hmin = i;
            count += bin;
            if count > threshold {
                break;
            }
        }

        count = 0;
        let mut hmax = HISTOGRAM_BINS - 1;
        for (i, &bin) in histogram.iter().enumerate().rev() {
            hmax = i;
            count += bin;
            if count > threshold {
                break;
            }
        }

        if hmax > hmin {
            Some(DisplayRange {
                min: hist_min + hmin as f64 * bin_size,
                max: hist_min + hmax as f64 * bin_size,
            })
        } else {
            None
        }
    }
}
