//! Channel decomposition

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::volume::types::VolumeParts;
use crate::image_pipeline::volume::{ChannelImage, ImageVolume, VolumeShape};

/// Splits hyperstacks into single-channel stacks and back.
///
/// Planes move into the channel images without copying, so a mapped plane
/// stays mapped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelSplitter;

impl ChannelSplitter {
    /// One image per channel, ordered by 1-based channel index.
    pub fn split(&self, volume: ImageVolume, source_name: &str) -> Result<Vec<ChannelImage>> {
        let VolumeParts {
            shape,
            pixel_type,
            bits_per_sample,
            planes,
            display_ranges,
        } = volume.into_parts();

        let per_channel = shape.slices * shape.frames;
        let mut buckets: Vec<Vec<_>> = (0..shape.channels)
            .map(|_| Vec::with_capacity(per_channel))
            .collect();
        for (i, plane) in planes.into_iter().enumerate() {
            buckets[i % shape.channels].push(plane);
        }

        let channel_shape = VolumeShape {
            channels: 1,
            ..shape
        };
        buckets
            .into_iter()
            .zip(display_ranges)
            .enumerate()
            .map(|(index, (planes, range))| {
                let mut volume =
                    ImageVolume::new(channel_shape, pixel_type, bits_per_sample, planes)?;
                volume.set_display_range(0, range);
                Ok(ChannelImage {
                    volume,
                    channel: index + 1,
                    source_name: source_name.to_string(),
                })
            })
            .collect()
    }

    /// Interleaves channel images back into one hyperstack by channel index.
    pub fn merge(&self, mut channels: Vec<ChannelImage>) -> Result<ImageVolume> {
        channels.sort_by_key(|c| c.channel);
        let first = channels
            .first()
            .ok_or_else(|| ConversionError::DecodeError("no channels to merge".to_string()))?;
        let base = first.volume.shape();
        let pixel_type = first.volume.pixel_type();
        let bits_per_sample = first.volume.bits_per_sample();

        if let Some(bad) = channels.iter().find(|c| {
            c.volume.shape() != base || c.volume.pixel_type() != pixel_type
        }) {
            return Err(ConversionError::InvalidDimensions(
                bad.volume.width(),
                bad.volume.height(),
            ));
        }

        let count = channels.len();
        let mut display_ranges = Vec::with_capacity(count);
        let mut sources = Vec::with_capacity(count);
        for channel in channels {
            let parts = channel.volume.into_parts();
            display_ranges.push(parts.display_ranges.into_iter().next().flatten());
            sources.push(parts.planes.into_iter());
        }

        let mut planes = Vec::with_capacity(base.plane_count() * count);
        for _ in 0..base.slices * base.frames {
            for source in sources.iter_mut() {
                planes.extend(source.next());
            }
        }

        ImageVolume::from_parts(VolumeParts {
            shape: VolumeShape {
                channels: count,
                ..base
            },
            pixel_type,
            bits_per_sample,
            planes,
            display_ranges,
        })
    }
}
