//! Plain and ImageJ TIFF reading via the `tiff` crate.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::decode::{ImageBackend, read_signature};
use crate::image_pipeline::tiff::imagej::ImageJLayout;
use crate::image_pipeline::volume::{ImageVolume, PixelType, PlaneData, VolumeShape};

const TIFF_SIGNATURES: [&[u8]; 4] = [b"II*\0", b"MM\0*", b"II+\0", b"MM\0+"];

/// Reads TIFF files page by page.
///
/// An ImageJ description on the first page defines the hyperstack layout of
/// the first series. Without one, every run of consecutive pages sharing
/// size and colour type is a series whose pages are slices. Interleaved
/// RGB(A) or gray+alpha samples become separate channels.
pub struct TiffBackend;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PageInfo {
    width: u32,
    height: u32,
    color: ColorType,
}

#[derive(Debug, Clone, PartialEq)]
struct TiffSeries {
    first_page: usize,
    page_count: usize,
    info: PageInfo,
    imagej: Option<ImageJLayout>,
}

type TiffDecoder = Decoder<BufReader<File>>;

fn tiff_err(e: tiff::TiffError) -> ConversionError {
    ConversionError::DecodeError(e.to_string())
}

fn open_decoder(path: &Path) -> Result<TiffDecoder> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))
        .map_err(tiff_err)?
        .with_limits(Limits::unlimited()))
}

fn components(color: ColorType) -> Result<usize> {
    match color {
        ColorType::Gray(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) => Ok(4),
        other => Err(ConversionError::UnsupportedFormat(format!(
            "TIFF colour type {:?}",
            other
        ))),
    }
}

fn significant_bits(color: ColorType) -> u32 {
    match color {
        ColorType::Gray(b) | ColorType::GrayA(b) | ColorType::RGB(b) | ColorType::RGBA(b) => {
            b as u32
        }
        _ => 0,
    }
}

fn page_info(decoder: &mut TiffDecoder) -> Result<PageInfo> {
    let (width, height) = decoder.dimensions().map_err(tiff_err)?;
    let color = decoder.colortype().map_err(tiff_err)?;
    Ok(PageInfo {
        width,
        height,
        color,
    })
}

/// Walks every IFD and groups pages into series.
fn scan_series(path: &Path) -> Result<Vec<TiffSeries>> {
    let mut decoder = open_decoder(path)?;

    let imagej = decoder
        .get_tag_ascii_string(Tag::ImageDescription)
        .ok()
        .and_then(|text| ImageJLayout::parse(&text));

    let mut pages = vec![page_info(&mut decoder)?];
    while decoder.more_images() {
        decoder.next_image().map_err(tiff_err)?;
        pages.push(page_info(&mut decoder)?);
    }

    let mut series: Vec<TiffSeries> = Vec::new();
    let mut index = 0;

    if let Some(layout) = imagej {
        let count = layout.images.clamp(1, pages.len());
        if pages[..count].iter().all(|p| *p == pages[0]) {
            series.push(TiffSeries {
                first_page: 0,
                page_count: count,
                info: pages[0],
                imagej: Some(layout),
            });
            index = count;
        }
    }

    while index < pages.len() {
        let info = pages[index];
        let run = pages[index..].iter().take_while(|p| **p == info).count();
        series.push(TiffSeries {
            first_page: index,
            page_count: run,
            info,
            imagej: None,
        });
        index += run;
    }

    debug!("{}: {} page(s) in {} series", path.display(), pages.len(), series.len());
    Ok(series)
}

/// Splits interleaved samples into one little-endian byte plane per component.
fn deinterleave<T: Copy, const N: usize>(
    samples: &[T],
    components: usize,
    to_le: fn(T) -> [u8; N],
) -> Vec<Vec<u8>> {
    let per_plane = samples.len() / components;
    let mut planes = vec![Vec::with_capacity(per_plane * N); components];
    for (i, &sample) in samples.iter().enumerate() {
        planes[i % components].extend_from_slice(&to_le(sample));
    }
    planes
}

fn page_planes(result: DecodingResult, components: usize) -> Result<(PixelType, Vec<Vec<u8>>)> {
    match result {
        DecodingResult::U8(buf) => Ok((PixelType::U8, deinterleave(&buf, components, u8::to_le_bytes))),
        DecodingResult::U16(buf) => Ok((PixelType::U16, deinterleave(&buf, components, u16::to_le_bytes))),
        DecodingResult::U32(buf) => Ok((PixelType::U32, deinterleave(&buf, components, u32::to_le_bytes))),
        DecodingResult::F32(buf) => Ok((PixelType::F32, deinterleave(&buf, components, f32::to_le_bytes))),
        _ => Err(ConversionError::UnsupportedFormat(
            "TIFF sample format (only u8, u16, u32 and f32 are read)".to_string(),
        )),
    }
}

impl ImageBackend for TiffBackend {
    fn name(&self) -> &'static str {
        "tiff"
    }

    fn can_open(&self, path: &Path) -> bool {
        read_signature(path, 4).is_some_and(|sig| TIFF_SIGNATURES.iter().any(|s| sig == *s))
    }

    fn series_count(&self, path: &Path) -> Result<usize> {
        Ok(scan_series(path)?.len())
    }

    fn decode(&self, path: &Path, series: usize) -> Result<ImageVolume> {
        let all = scan_series(path)?;
        let selected = all.get(series).ok_or_else(|| {
            ConversionError::DecodeError(format!("series {} not present", series))
        })?;

        let info = selected.info;
        let per_page = components(info.color)?;
        let (stack_channels, slices, frames) = match selected.imagej {
            Some(layout) if layout.stack_size() == Some(selected.page_count) => {
                (layout.channels, layout.slices, layout.frames)
            }
            _ => (1, selected.page_count, 1),
        };
        let channels = stack_channels * per_page;
        let expected = info.width as usize * info.height as usize * per_page;

        let mut decoder = open_decoder(path)?;
        let mut pixel_type = None;
        let mut planes: Vec<Option<PlaneData>> = vec![None; channels * slices * frames];

        for page in 0..selected.page_count {
            decoder
                .seek_to_image(selected.first_page + page)
                .map_err(tiff_err)?;
            let result = decoder.read_image().map_err(tiff_err)?;
            let (page_type, components) = page_planes(result, per_page)?;

            if *pixel_type.get_or_insert(page_type) != page_type {
                return Err(ConversionError::DecodeError(format!(
                    "page {} changes sample type",
                    page
                )));
            }
            let sample_bytes = page_type.bytes_per_sample();
            if components.iter().any(|c| c.len() != expected / per_page * sample_bytes) {
                return Err(ConversionError::DecodeError(format!(
                    "page {} holds fewer samples than {}x{}",
                    page, info.width, info.height
                )));
            }

            // ImageJ page order: channel fastest, then slice, then frame
            let stack_channel = page % stack_channels;
            let rest = page / stack_channels;
            let slice = rest % slices;
            let frame = rest / slices;
            for (component, bytes) in components.into_iter().enumerate() {
                let channel = stack_channel * per_page + component;
                let index = (frame * slices + slice) * channels + channel;
                planes[index] = Some(PlaneData::Owned(bytes));
            }
        }

        let pixel_type = pixel_type.unwrap_or(PixelType::U8);
        let planes = planes
            .into_iter()
            .map(|p| p.ok_or_else(|| ConversionError::DecodeError("missing page".to_string())))
            .collect::<Result<Vec<_>>>()?;

        let mut volume = ImageVolume::new(
            VolumeShape::new(info.width as usize, info.height as usize, channels, slices, frames),
            pixel_type,
            significant_bits(info.color),
            planes,
        )?;

        // ImageJ stores a single min/max, only meaningful for one channel
        if channels == 1 {
            let range = selected.imagej.and_then(|layout| layout.display_range);
            volume.set_display_range(0, range);
        }
        Ok(volume)
    }
}
