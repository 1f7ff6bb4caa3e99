use std::io::{Seek, Write};

use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::debug;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::tiff::imagej::ImageJLayout;
use crate::image_pipeline::tiff::types::{ConversionConfig, TiffCompression};
use crate::image_pipeline::tiff::writer::TiffWriter;
use crate::image_pipeline::volume::{ChannelImage, ImageVolume, PixelType};

/// Writes one IFD per plane (frames outer, slices inner) in the volume's
/// own sample type, with an ImageJ description on the first IFD.
pub struct StandardTiffWriter;

fn encode_err(e: tiff::TiffError) -> ConversionError {
    ConversionError::WriteError(e.to_string())
}

fn le_samples<T, const N: usize>(bytes: &[u8], from_le: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(chunk);
            from_le(raw)
        })
        .collect()
}

fn write_pages<C, W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    volume: &ImageVolume,
    description: &str,
    samples: fn(&[u8]) -> Vec<C::Inner>,
) -> Result<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let width = volume.width() as u32;
    let height = volume.height() as u32;
    let mut first = true;

    for frame in 0..volume.frames() {
        for slice in 0..volume.slices() {
            let mut page = encoder.new_image::<C>(width, height).map_err(encode_err)?;
            if first {
                page.encoder()
                    .write_tag(Tag::ImageDescription, description)
                    .map_err(encode_err)?;
                first = false;
            }
            let data = samples(volume.plane(0, slice, frame));
            page.write_data(&data).map_err(encode_err)?;
        }
    }
    Ok(())
}

impl TiffWriter for StandardTiffWriter {
    fn write_tiff<W: Write + Seek>(
        &self,
        image: &ChannelImage,
        output: &mut W,
        config: &ConversionConfig,
    ) -> Result<()> {
        let volume = &image.volume;
        if volume.channels() != 1 {
            return Err(ConversionError::WriteError(format!(
                "expected a single-channel image, got {} channels",
                volume.channels()
            )));
        }

        debug!(
            "Encoding TIFF stack for channel {}: {}x{}, {} plane(s)",
            image.channel,
            volume.width(),
            volume.height(),
            volume.slices() * volume.frames()
        );

        let compression = match config.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Best),
        };

        let start = output.stream_position().map_err(|e| ConversionError::WriteError(e.to_string()))?;
        let mut encoder = TiffEncoder::new(&mut *output)
            .map_err(encode_err)?
            .with_compression(compression);

        if config.predictor == Some(2) && !volume.pixel_type().is_float() {
            encoder = encoder.with_predictor(tiff::tags::Predictor::Horizontal);
        }

        let description = ImageJLayout::new(1, volume.slices(), volume.frames())
            .with_display_range(volume.display_range(0))
            .describe();

        match volume.pixel_type() {
            PixelType::U8 => {
                write_pages::<colortype::Gray8, _>(&mut encoder, volume, &description, |b| b.to_vec())?
            }
            PixelType::U16 => write_pages::<colortype::Gray16, _>(&mut encoder, volume, &description, |b| {
                le_samples(b, u16::from_le_bytes)
            })?,
            PixelType::U32 => write_pages::<colortype::Gray32, _>(&mut encoder, volume, &description, |b| {
                le_samples(b, u32::from_le_bytes)
            })?,
            PixelType::F32 => write_pages::<colortype::Gray32Float, _>(&mut encoder, volume, &description, |b| {
                le_samples(b, f32::from_le_bytes)
            })?,
        }
        drop(encoder);

        let end = output.stream_position().map_err(|e| ConversionError::WriteError(e.to_string()))?;
        debug!("TIFF encoding complete, {} bytes", end - start);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_pipeline::volume::{DisplayRange, PlaneData, VolumeShape};
    use std::io::Cursor;
    use tiff::decoder::{Decoder, DecodingResult};

    fn channel(pixel_type: PixelType, slices: usize, frames: usize) -> ChannelImage {
        let shape = VolumeShape::new(4, 3, 1, slices, frames);
        let len = shape.plane_pixels() * pixel_type.bytes_per_sample();
        let planes = (0..shape.plane_count())
            .map(|i| PlaneData::Owned((0..len).map(|b| (b * 7 + i) as u8).collect()))
            .collect();
        ChannelImage {
            volume: ImageVolume::new(shape, pixel_type, 0, planes).unwrap(),
            channel: 1,
            source_name: "sample".to_string(),
        }
    }

    fn encode(image: &ChannelImage, config: &ConversionConfig) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        StandardTiffWriter.write_tiff(image, &mut out, config).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_stack_round_trips_through_decoder() {
        let image = channel(PixelType::U16, 3, 2);
        let bytes = encode(&image, &ConversionConfig::default());

        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        let mut pages = 0;
        loop {
            let DecodingResult::U16(data) = decoder.read_image().unwrap() else {
                panic!("expected 16-bit samples");
            };
            let (slice, frame) = (pages % 3, pages / 3);
            let expected: Vec<u16> = le_samples(image.volume.plane(0, slice, frame), u16::from_le_bytes);
            assert_eq!(data, expected);
            pages += 1;
            if !decoder.more_images() {
                break;
            }
            decoder.next_image().unwrap();
        }
        assert_eq!(pages, 6);
    }

    #[test]
    fn test_description_carries_display_range() {
        let mut image = channel(PixelType::U8, 2, 1);
        image
            .volume
            .set_display_range(0, Some(DisplayRange { min: 12.0, max: 250.0 }));
        let bytes = encode(&image, &ConversionConfig::default());

        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        let text = decoder.get_tag_ascii_string(Tag::ImageDescription).unwrap();
        let layout = ImageJLayout::parse(&text).unwrap();
        assert_eq!(layout.slices, 2);
        assert_eq!(layout.display_range, Some(DisplayRange { min: 12.0, max: 250.0 }));
    }

    #[test]
    fn test_lossless_compression_modes() {
        let image = channel(PixelType::U16, 1, 1);
        let expected: Vec<u16> = le_samples(image.volume.plane(0, 0, 0), u16::from_le_bytes);
        for compression in [
            TiffCompression::Lzw,
            TiffCompression::DeflateFast,
            TiffCompression::DeflateBest,
        ] {
            let config = ConversionConfig::builder()
                .compression(compression)
                .predictor(Some(2))
                .build();
            let bytes = encode(&image, &config);
            let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
            match decoder.read_image().unwrap() {
                DecodingResult::U16(data) => assert_eq!(data, expected),
                _ => panic!("expected 16-bit samples"),
            }
        }
    }

    #[test]
    fn test_float_samples_preserved() {
        let shape = VolumeShape::new(3, 1, 1, 1, 1);
        let plane: Vec<u8> = [0.25f32, -1.5, 1e6].iter().flat_map(|v| v.to_le_bytes()).collect();
        let image = ChannelImage {
            volume: ImageVolume::new(shape, PixelType::F32, 0, vec![PlaneData::Owned(plane)]).unwrap(),
            channel: 2,
            source_name: "f".to_string(),
        };
        let bytes = encode(&image, &ConversionConfig::default());
        let mut decoder = Decoder::new(Cursor::new(bytes)).unwrap();
        match decoder.read_image().unwrap() {
            DecodingResult::F32(data) => {
                let raw: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
                assert_eq!(raw, image.volume.plane(0, 0, 0));
            }
            _ => panic!("expected float samples"),
        }
    }

    #[test]
    fn test_rejects_multi_channel_volume() {
        let shape = VolumeShape::new(1, 1, 2, 1, 1);
        let planes = vec![PlaneData::Owned(vec![1]), PlaneData::Owned(vec![2])];
        let image = ChannelImage {
            volume: ImageVolume::new(shape, PixelType::U8, 8, planes).unwrap(),
            channel: 1,
            source_name: "x".to_string(),
        };
        let mut out = Cursor::new(Vec::new());
        let err = StandardTiffWriter
            .write_tiff(&image, &mut out, &ConversionConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConversionError::WriteError(_)));
        assert!(out.get_ref().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("C1_x.tif");
        assert!(StandardTiffWriter
            .write_file(&image, &path, &ConversionConfig::default())
            .is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_file_streams_stack_to_disk() {
        let image = channel(PixelType::U16, 4, 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("C1_sample.tif");
        std::fs::write(&path, b"stale output").unwrap();

        StandardTiffWriter
            .write_file(&image, &path, &ConversionConfig::default())
            .unwrap();

        let file = std::io::BufReader::new(std::fs::File::open(&path).unwrap());
        let mut decoder = Decoder::new(file).unwrap();
        let mut pages = 1;
        while decoder.more_images() {
            decoder.next_image().unwrap();
            pages += 1;
        }
        assert_eq!(pages, 4);
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => {
                assert_eq!(data, le_samples(image.volume.plane(0, 3, 0), u16::from_le_bytes))
            }
            _ => panic!("expected 16-bit samples"),
        }
    }
}
