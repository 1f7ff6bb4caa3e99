use crate::image_pipeline::common::bytes::LeBytes;
use crate::image_pipeline::common::error::{ConversionError, Result};

/// Every segment starts with a 16-byte id and two 64-bit sizes.
pub const SEGMENT_HEADER_LEN: usize = 32;

pub const FILE_SEGMENT: &str = "ZISRAWFILE";
pub const DIRECTORY_SEGMENT: &str = "ZISRAWDIRECTORY";
pub const SUBBLOCK_SEGMENT: &str = "ZISRAWSUBBLOCK";
pub const METADATA_SEGMENT: &str = "ZISRAWMETADATA";

/// Fixed part of a subblock before its directory entry.
const SUBBLOCK_FIXED_LEN: usize = 16;
/// Minimum size of the subblock header area, padding included.
const SUBBLOCK_HEADER_MIN: usize = 256;
/// Size of the metadata segment header area before the XML.
const METADATA_HEADER_LEN: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub allocated_size: usize,
    pub used_size: usize,
}

/// Checks the id of the segment at `offset` and reads its sizes.
pub fn read_segment(view: &LeBytes<'_>, offset: usize, expected: &str) -> Result<SegmentHeader> {
    let id = view.ascii_at(offset, 16)?;
    if id != expected {
        return Err(ConversionError::DecodeError(format!(
            "expected segment {} at offset {}, found {:?}",
            expected, offset, id
        )));
    }
    Ok(SegmentHeader {
        allocated_size: view.len64_at(offset + 16)?,
        used_size: view.len64_at(offset + 24)?,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub major: i32,
    pub minor: i32,
    pub file_part: i32,
    pub directory_position: usize,
    pub metadata_position: usize,
}

pub fn read_file_header(view: &LeBytes<'_>) -> Result<FileHeader> {
    read_segment(view, 0, FILE_SEGMENT)?;
    let data = SEGMENT_HEADER_LEN;
    Ok(FileHeader {
        major: view.i32_at(data)?,
        minor: view.i32_at(data + 4)?,
        // two reserved i32 and two 16-byte GUIDs precede the part number
        file_part: view.i32_at(data + 48)?,
        directory_position: view.len64_at(data + 52)?,
        metadata_position: view.len64_at(data + 60)?,
    })
}

/// Location of the pixel payload inside a subblock segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubBlockData {
    pub offset: usize,
    pub len: usize,
}

pub fn read_subblock_data(view: &LeBytes<'_>, position: usize) -> Result<SubBlockData> {
    read_segment(view, position, SUBBLOCK_SEGMENT)?;
    let data = position + SEGMENT_HEADER_LEN;
    let metadata_size = view.len32_at(data)?;
    let data_size = view.len64_at(data + 8)?;

    let entry_len = super::directory::entry_len(view, data + SUBBLOCK_FIXED_LEN)?;
    let header_len = (SUBBLOCK_FIXED_LEN + entry_len).max(SUBBLOCK_HEADER_MIN);
    let offset = data + header_len + metadata_size;

    // bounds check the payload up front so planes can be sliced freely later
    view.slice(offset, data_size)?;
    Ok(SubBlockData {
        offset,
        len: data_size,
    })
}

/// Returns the metadata XML, if the file has a metadata segment.
pub fn read_metadata_xml(view: &LeBytes<'_>, position: usize) -> Result<Option<String>> {
    if position == 0 {
        return Ok(None);
    }
    read_segment(view, position, METADATA_SEGMENT)?;
    let data = position + SEGMENT_HEADER_LEN;
    let xml_size = view.len32_at(data)?;
    let xml = view.slice(data + METADATA_HEADER_LEN, xml_size)?;
    Ok(Some(String::from_utf8_lossy(xml).into_owned()))
}

/// Significant bit count recorded by the acquisition software.
pub fn bit_count_from_xml(xml: &str) -> Option<u32> {
    ["BitCountRange", "ComponentBitCount"].iter().find_map(|tag| {
        let open = format!("<{}>", tag);
        let start = xml.find(&open)? + open.len();
        let end = start + xml[start..].find('<')?;
        xml[start..end].trim().parse().ok().filter(|&bits| bits > 0)
    })
}
