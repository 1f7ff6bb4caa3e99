use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::image_pipeline::common::bytes::LeBytes;
use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::czi::compression::{UNCOMPRESSED, decode_payload};
use crate::image_pipeline::czi::directory::{DirectoryEntry, read_directory};
use crate::image_pipeline::czi::scene::SceneLayout;
use crate::image_pipeline::czi::segment::{
    bit_count_from_xml, read_file_header, read_metadata_xml, read_subblock_data,
};
use crate::image_pipeline::volume::{ImageVolume, PixelType, PlaneData, VolumeShape};

/// A memory-mapped CZI file with its parsed directory.
///
/// Scenes (`S` coordinate) are exposed as series. Only full-resolution
/// subblocks of the first file part are used.
pub struct CziFile {
    map: Arc<Mmap>,
    entries: Vec<DirectoryEntry>,
    bits_per_sample: Option<u32>,
}

impl CziFile {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: mapped planes assume the source file is not truncated or
        // rewritten while the conversion runs; otherwise reads fault (SIGBUS).
        let map = unsafe {
            Mmap::map(&file).map_err(|e| {
                ConversionError::DecodeError(format!("{}: cannot map file: {}", path.display(), e))
            })?
        };
        Self::from_map(Arc::new(map))
    }

    pub fn from_map(map: Arc<Mmap>) -> Result<Self> {
        let view = LeBytes::new(&map[..]);
        let header = read_file_header(&view)?;
        debug!(
            "CZI version {}.{}, directory at {}",
            header.major, header.minor, header.directory_position
        );

        let entries = read_directory(&view, header.directory_position)?;
        let bits_per_sample = match read_metadata_xml(&view, header.metadata_position) {
            Ok(xml) => xml.as_deref().and_then(bit_count_from_xml),
            Err(e) => {
                warn!("Ignoring unreadable CZI metadata: {}", e);
                None
            }
        };

        Ok(Self {
            map,
            entries,
            bits_per_sample,
        })
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn bits_per_sample(&self) -> Option<u32> {
        self.bits_per_sample
    }

    fn usable_entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.file_part == 0 && e.is_full_resolution())
    }

    /// Sorted distinct scene coordinates; each one is a series.
    pub fn scenes(&self) -> Vec<i32> {
        let mut scenes: Vec<i32> = self.usable_entries().map(|e| e.start("S")).collect();
        scenes.sort_unstable();
        scenes.dedup();
        scenes
    }

    pub fn series_count(&self) -> usize {
        self.scenes().len()
    }

    fn scene_entries(&self, series: usize) -> Result<Vec<&DirectoryEntry>> {
        let scenes = self.scenes();
        let scene = *scenes.get(series).ok_or_else(|| {
            ConversionError::DecodeError(format!(
                "series {} requested, file has {} scene(s)",
                series,
                scenes.len()
            ))
        })?;
        Ok(self.usable_entries().filter(|e| e.start("S") == scene).collect())
    }

    pub fn scene_layout(&self, series: usize) -> Result<SceneLayout> {
        SceneLayout::from_entries(&self.scene_entries(series)?)
    }

    /// Decodes one scene into a volume. BGR subblocks yield three channels
    /// per `C` coordinate in R, G, B order.
    pub fn read_volume(&self, series: usize) -> Result<ImageVolume> {
        let entries = self.scene_entries(series)?;
        let layout = SceneLayout::from_entries(&entries)?;
        let (pixel_type, components) = layout.pixel_type.layout().ok_or_else(|| {
            ConversionError::UnsupportedFormat(format!("CZI pixel type {:?}", layout.pixel_type))
        })?;

        let mut tiles: Vec<Vec<&DirectoryEntry>> = vec![Vec::new(); layout.plane_count()];
        for entry in entries {
            if let Some(slot) = layout.plane_slot(entry) {
                tiles[slot].push(entry);
            }
        }

        let source_channels = layout.channels.len();
        let shape = VolumeShape::new(
            layout.width,
            layout.height,
            source_channels * components,
            layout.slices.len(),
            layout.frames.len(),
        );

        let mut planes: Vec<PlaneData> = Vec::with_capacity(shape.plane_count());
        for (slot, mut group) in tiles.into_iter().enumerate() {
            if group.is_empty() {
                warn!("Scene {} has no data for plane {}, filling with zeros", series, slot);
            }
            group.sort_by_key(|e| e.start("M"));
            // slot order is channel fastest, so component planes append in order
            planes.extend(self.assemble_plane(&layout, &group, pixel_type, components)?);
        }

        debug!(
            "CZI scene {}: {}x{}, {} channel(s), {} slice(s), {} frame(s), {} mapped plane(s)",
            series,
            shape.width,
            shape.height,
            shape.channels,
            shape.slices,
            shape.frames,
            planes.iter().filter(|p| p.is_mapped()).count()
        );

        ImageVolume::new(shape, pixel_type, self.bits_per_sample.unwrap_or(0), planes)
    }

    /// Builds the component planes of one (c, z, t) position from its tiles.
    ///
    /// Every tile is decoded and checked against its declared extent before
    /// the output planes are allocated.
    fn assemble_plane(
        &self,
        layout: &SceneLayout,
        tiles: &[&DirectoryEntry],
        pixel_type: PixelType,
        components: usize,
    ) -> Result<Vec<PlaneData>> {
        let view = LeBytes::new(&self.map[..]);
        let bps = pixel_type.bytes_per_sample();
        let plane_len = layout
            .width
            .checked_mul(layout.height)
            .and_then(|pixels| pixels.checked_mul(bps))
            .ok_or(ConversionError::InvalidDimensions(layout.width, layout.height))?;

        if let [tile] = tiles {
            if components == 1 && tile.compression == UNCOMPRESSED && layout.covered_by(tile) {
                let data = read_subblock_data(&view, tile.file_position)?;
                if data.len == plane_len {
                    return Ok(vec![PlaneData::Mapped {
                        map: Arc::clone(&self.map),
                        offset: data.offset,
                        len: data.len,
                    }]);
                }
            }
        }

        let mut decoded = Vec::with_capacity(tiles.len());
        for tile in tiles {
            let (Some(x), Some(y)) = (tile.dimension("X"), tile.dimension("Y")) else {
                continue;
            };
            let (Some(row_len), Some(tile_len)) = tile_extent(x.size, y.size, components * bps)
            else {
                return Err(ConversionError::InvalidDimensions(x.size, y.size));
            };
            if tile_len == 0 {
                continue;
            }

            let data = read_subblock_data(&view, tile.file_position)?;
            let payload = view.slice(data.offset, data.len)?;
            let pixels = decode_payload(tile.compression, payload, tile_len, bps).map_err(|e| {
                match e {
                    ConversionError::DecodeError(msg) => ConversionError::DecodeError(format!(
                        "subblock at {}: {}",
                        tile.file_position, msg
                    )),
                    other => other,
                }
            })?;

            let x0 = (x.start as i64 - layout.origin_x as i64) as usize;
            let y0 = (y.start as i64 - layout.origin_y as i64) as usize;
            decoded.push((x0, y0, row_len, pixels));
        }

        let mut out = Vec::with_capacity(components);
        for _ in 0..components {
            out.push(zeroed_plane(plane_len)?);
        }

        for (x0, y0, row_len, pixels) in decoded {
            for (row, src) in pixels.chunks_exact(row_len).enumerate() {
                let dst_start = ((y0 + row) * layout.width + x0) * bps;
                if components == 1 {
                    out[0][dst_start..dst_start + row_len].copy_from_slice(src);
                    continue;
                }
                for (col, pixel) in src.chunks_exact(components * bps).enumerate() {
                    let dst = dst_start + col * bps;
                    for (k, sample) in pixel.chunks_exact(bps).enumerate() {
                        // stored as B, G, R
                        let target = components - 1 - k;
                        out[target][dst..dst + bps].copy_from_slice(sample);
                    }
                }
            }
        }

        Ok(out.into_iter().map(PlaneData::Owned).collect())
    }
}

/// Row and total byte length of a tile, `None` on overflow.
fn tile_extent(width: usize, height: usize, pixel_len: usize) -> (Option<usize>, Option<usize>) {
    let row_len = width.checked_mul(pixel_len);
    (row_len, row_len.and_then(|row| row.checked_mul(height)))
}

fn zeroed_plane(len: usize) -> Result<Vec<u8>> {
    let mut plane = Vec::new();
    plane.try_reserve_exact(len).map_err(|_| {
        ConversionError::DecodeError(format!("cannot allocate a {} byte plane", len))
    })?;
    plane.resize(len, 0);
    Ok(plane)
}
