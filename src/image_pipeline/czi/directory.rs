use crate::image_pipeline::common::bytes::LeBytes;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::czi::segment::{DIRECTORY_SEGMENT, SEGMENT_HEADER_LEN, read_segment};
use crate::image_pipeline::volume::PixelType;

/// Entry count plus reserved bytes before the first directory entry.
const DIRECTORY_HEADER_LEN: usize = 128;
/// Fixed part of a `DV` directory entry.
const ENTRY_FIXED_LEN: usize = 32;
const DIMENSION_ENTRY_LEN: usize = 20;

/// Pixel layouts of CZI subblocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CziPixelType {
    Gray8,
    Gray16,
    Gray32Float,
    Bgr24,
    Bgr48,
    Bgr96Float,
    Other(i32),
}

impl CziPixelType {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => CziPixelType::Gray8,
            1 => CziPixelType::Gray16,
            2 => CziPixelType::Gray32Float,
            3 => CziPixelType::Bgr24,
            4 => CziPixelType::Bgr48,
            8 => CziPixelType::Bgr96Float,
            other => CziPixelType::Other(other),
        }
    }

    /// Sample storage type and samples per pixel, `None` if unsupported.
    pub fn layout(self) -> Option<(PixelType, usize)> {
        match self {
            CziPixelType::Gray8 => Some((PixelType::U8, 1)),
            CziPixelType::Gray16 => Some((PixelType::U16, 1)),
            CziPixelType::Gray32Float => Some((PixelType::F32, 1)),
            CziPixelType::Bgr24 => Some((PixelType::U8, 3)),
            CziPixelType::Bgr48 => Some((PixelType::U16, 3)),
            CziPixelType::Bgr96Float => Some((PixelType::F32, 3)),
            CziPixelType::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionEntry {
    pub name: String,
    pub start: i32,
    pub size: usize,
    pub stored_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryEntry {
    pub pixel_type: CziPixelType,
    pub file_position: usize,
    pub file_part: i32,
    pub compression: i32,
    pub pyramid_type: u8,
    pub dimensions: Vec<DimensionEntry>,
}

impl DirectoryEntry {
    pub fn dimension(&self, name: &str) -> Option<&DimensionEntry> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Start coordinate of a dimension, 0 when the entry lacks it.
    pub fn start(&self, name: &str) -> i32 {
        self.dimension(name).map_or(0, |d| d.start)
    }

    /// True for full-resolution tiles; pyramid levels are stored subsampled.
    pub fn is_full_resolution(&self) -> bool {
        self.pyramid_type == 0
            && ["X", "Y"]
                .iter()
                .all(|axis| self.dimension(axis).is_some_and(|d| d.size == d.stored_size))
    }
}

/// Dimension count of the `DV` entry at `offset`, checked against the
/// bytes actually present.
fn dimension_count(view: &LeBytes<'_>, offset: usize) -> Result<usize> {
    let count = view.len32_at(offset + 28)?;
    let end = count
        .checked_mul(DIMENSION_ENTRY_LEN)
        .and_then(|len| len.checked_add(ENTRY_FIXED_LEN))
        .and_then(|len| len.checked_add(offset));
    match end {
        Some(end) if end <= view.len() => Ok(count),
        _ => Err(ConversionError::DecodeError(format!(
            "directory entry at offset {} declares {} dimensions past the end of the file",
            offset, count
        ))),
    }
}

/// Byte length of the `DV` entry at `offset`.
pub fn entry_len(view: &LeBytes<'_>, offset: usize) -> Result<usize> {
    let count = dimension_count(view, offset)?;
    Ok(ENTRY_FIXED_LEN + count * DIMENSION_ENTRY_LEN)
}

pub fn read_entry(view: &LeBytes<'_>, offset: usize) -> Result<DirectoryEntry> {
    let schema = view.ascii_at(offset, 2)?;
    if schema != "DV" {
        return Err(ConversionError::DecodeError(format!(
            "unknown directory entry schema {:?} at offset {}",
            schema, offset
        )));
    }

    let count = dimension_count(view, offset)?;
    let mut dimensions = Vec::with_capacity(count);
    for i in 0..count {
        let dim = offset + ENTRY_FIXED_LEN + i * DIMENSION_ENTRY_LEN;
        dimensions.push(DimensionEntry {
            name: view.ascii_at(dim, 4)?,
            start: view.i32_at(dim + 4)?,
            size: view.len32_at(dim + 8)?,
            stored_size: view.len32_at(dim + 16)?,
        });
    }

    Ok(DirectoryEntry {
        pixel_type: CziPixelType::from_code(view.i32_at(offset + 2)?),
        file_position: view.len64_at(offset + 6)?,
        file_part: view.i32_at(offset + 14)?,
        compression: view.i32_at(offset + 18)?,
        pyramid_type: view.u8_at(offset + 22)?,
        dimensions,
    })
}

/// Reads every entry of the subblock directory at `position`.
pub fn read_directory(view: &LeBytes<'_>, position: usize) -> Result<Vec<DirectoryEntry>> {
    read_segment(view, position, DIRECTORY_SEGMENT)?;
    let data = position + SEGMENT_HEADER_LEN;
    let count = view.len32_at(data)?;

    let mut entries = Vec::with_capacity(count.min(view.len() / ENTRY_FIXED_LEN));
    let mut offset = data + DIRECTORY_HEADER_LEN;
    for _ in 0..count {
        let entry = read_entry(view, offset)?;
        offset += ENTRY_FIXED_LEN + entry.dimensions.len() * DIMENSION_ENTRY_LEN;
        entries.push(entry);
    }
    Ok(entries)
}
