use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::czi::directory::{CziPixelType, DirectoryEntry};

/// Geometry and plane coordinates of one scene, derived from its tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLayout {
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: usize,
    pub height: usize,
    /// Sorted distinct `C` coordinates
    pub channels: Vec<i32>,
    /// Sorted distinct `Z` coordinates
    pub slices: Vec<i32>,
    /// Sorted distinct `T` coordinates
    pub frames: Vec<i32>,
    pub pixel_type: CziPixelType,
}

fn distinct(entries: &[&DirectoryEntry], name: &str) -> Vec<i32> {
    let mut values: Vec<i32> = entries.iter().map(|e| e.start(name)).collect();
    values.sort_unstable();
    values.dedup();
    values
}

impl SceneLayout {
    pub fn from_entries(entries: &[&DirectoryEntry]) -> Result<Self> {
        let first = entries
            .first()
            .ok_or_else(|| ConversionError::DecodeError("scene has no subblocks".to_string()))?;
        let pixel_type = first.pixel_type;

        let mut min_x = i32::MAX;
        let mut min_y = i32::MAX;
        let mut max_x = i64::MIN;
        let mut max_y = i64::MIN;
        for entry in entries {
            if entry.pixel_type != pixel_type {
                return Err(ConversionError::DecodeError(format!(
                    "mixed pixel types {:?} and {:?} in one scene",
                    pixel_type, entry.pixel_type
                )));
            }
            let (Some(x), Some(y)) = (entry.dimension("X"), entry.dimension("Y")) else {
                return Err(ConversionError::DecodeError(
                    "subblock without X/Y extent".to_string(),
                ));
            };
            min_x = min_x.min(x.start);
            min_y = min_y.min(y.start);
            max_x = max_x.max(x.start as i64 + x.size as i64);
            max_y = max_y.max(y.start as i64 + y.size as i64);
        }

        let width = (max_x - min_x as i64) as usize;
        let height = (max_y - min_y as i64) as usize;
        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        Ok(Self {
            origin_x: min_x,
            origin_y: min_y,
            width,
            height,
            channels: distinct(entries, "C"),
            slices: distinct(entries, "Z"),
            frames: distinct(entries, "T"),
            pixel_type,
        })
    }

    /// Position of the entry's (c, z, t) plane among the scene's planes, channel fastest.
    pub fn plane_slot(&self, entry: &DirectoryEntry) -> Option<usize> {
        let c = self.channels.binary_search(&entry.start("C")).ok()?;
        let z = self.slices.binary_search(&entry.start("Z")).ok()?;
        let t = self.frames.binary_search(&entry.start("T")).ok()?;
        Some((t * self.slices.len() + z) * self.channels.len() + c)
    }

    pub fn plane_count(&self) -> usize {
        self.channels.len() * self.slices.len() * self.frames.len()
    }

    /// Whether a single tile covers the whole scene.
    pub fn covered_by(&self, entry: &DirectoryEntry) -> bool {
        match (entry.dimension("X"), entry.dimension("Y")) {
            (Some(x), Some(y)) => {
                x.start == self.origin_x
                    && y.start == self.origin_y
                    && x.size == self.width
                    && y.size == self.height
            }
            _ => false,
        }
    }
}
