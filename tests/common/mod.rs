#![allow(dead_code)]

use std::fs;
use std::io::Cursor;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{TiffEncoder, colortype};
use tiff::tags::Tag;

/// Sample value written for pixel `i` of channel `c`, slice `z`.
pub fn sample(c: usize, z: usize, i: usize) -> u16 {
    (c * 1000 + z * 100 + i) as u16
}

fn segment(id: &str, data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; 16];
    out[..id.len()].copy_from_slice(id.as_bytes());
    out.extend_from_slice(&(data.len() as i64).to_le_bytes());
    out.extend_from_slice(&(data.len() as i64).to_le_bytes());
    out.extend_from_slice(data);
    out
}

fn directory_entry(position: usize, dims: &[(&str, i32, usize)]) -> Vec<u8> {
    let mut out = b"DV".to_vec();
    out.extend_from_slice(&1i32.to_le_bytes());
    out.extend_from_slice(&(position as i64).to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&0i32.to_le_bytes());
    out.push(0);
    out.extend_from_slice(&[0u8; 5]);
    out.extend_from_slice(&(dims.len() as i32).to_le_bytes());
    for &(name, start, size) in dims {
        let mut id = [0u8; 4];
        id[..name.len()].copy_from_slice(name.as_bytes());
        out.extend_from_slice(&id);
        out.extend_from_slice(&start.to_le_bytes());
        out.extend_from_slice(&(size as i32).to_le_bytes());
        out.extend_from_slice(&0f32.to_le_bytes());
        out.extend_from_slice(&(size as i32).to_le_bytes());
    }
    out
}

/// Writes a minimal uncompressed 16-bit CZI with one tile per channel and
/// slice, filled from [`sample`].
pub fn write_czi(path: &Path, width: usize, height: usize, channels: usize, slices: usize) {
    let mut out = segment("ZISRAWFILE", &[0u8; 80]);
    out[32..36].copy_from_slice(&1i32.to_le_bytes());

    let mut entries = Vec::new();
    let mut count = 0i32;
    for c in 0..channels {
        for z in 0..slices {
            let position = out.len();
            let entry = directory_entry(
                position,
                &[
                    ("X", 0, width),
                    ("Y", 0, height),
                    ("C", c as i32, 1),
                    ("Z", z as i32, 1),
                ],
            );
            let pixels: Vec<u8> = (0..width * height)
                .flat_map(|i| sample(c, z, i).to_le_bytes())
                .collect();

            let mut data = Vec::new();
            data.extend_from_slice(&0i32.to_le_bytes());
            data.extend_from_slice(&0i32.to_le_bytes());
            data.extend_from_slice(&(pixels.len() as i64).to_le_bytes());
            data.extend_from_slice(&entry);
            data.resize((16 + entry.len()).max(256), 0);
            data.extend_from_slice(&pixels);
            out.extend(segment("ZISRAWSUBBLOCK", &data));
            entries.extend(entry);
            count += 1;
        }
    }

    let directory_position = out.len();
    let mut data = count.to_le_bytes().to_vec();
    data.resize(128, 0);
    data.extend(entries);
    out.extend(segment("ZISRAWDIRECTORY", &data));

    out[84..92].copy_from_slice(&(directory_position as i64).to_le_bytes());
    fs::write(path, out).unwrap();
}

/// Writes a single-page 8-bit RGB TIFF.
pub fn write_rgb_tiff(path: &Path, width: u32, height: u32) {
    let data: Vec<u8> = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
    let mut buffer = Vec::new();
    let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer)).unwrap();
    encoder
        .write_image::<colortype::RGB8>(width, height, &data)
        .unwrap();
    drop(encoder);
    fs::write(path, buffer).unwrap();
}

/// Every page of a TIFF file as 16-bit samples, plus the first page's description.
pub fn read_gray16_pages(path: &Path) -> (Vec<Vec<u16>>, Option<String>) {
    let mut decoder = Decoder::new(Cursor::new(fs::read(path).unwrap())).unwrap();
    let description = decoder.get_tag_ascii_string(Tag::ImageDescription).ok();
    let mut pages = Vec::new();
    loop {
        match decoder.read_image().unwrap() {
            DecodingResult::U16(data) => pages.push(data),
            DecodingResult::U8(data) => pages.push(data.into_iter().map(u16::from).collect()),
            _ => panic!("unexpected sample type"),
        }
        if !decoder.more_images() {
            break;
        }
        decoder.next_image().unwrap();
    }
    (pages, description)
}

pub fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
