//! Subblock payload codecs.

use std::borrow::Cow;
use std::io::Read;

use crate::image_pipeline::common::error::{ConversionError, Result};

pub const UNCOMPRESSED: i32 = 0;
/// Plain zstd stream.
pub const ZSTD0: i32 = 5;
/// zstd stream behind a small header, optionally with 16-bit samples split
/// into a low-byte half followed by a high-byte half.
pub const ZSTD1: i32 = 6;

/// Header chunk type announcing hi/lo byte packing.
const CHUNK_HI_LO_PACKING: u8 = 1;

/// Turns a subblock payload into exactly `expected` bytes of pixel data.
///
/// Uncompressed payloads are borrowed. Decompression stops one byte past
/// `expected`, so a payload that inflates to the wrong size fails without
/// growing beyond that.
pub fn decode_payload(
    compression: i32,
    payload: &[u8],
    expected: usize,
    bytes_per_sample: usize,
) -> Result<Cow<'_, [u8]>> {
    match compression {
        UNCOMPRESSED => {
            if payload.len() < expected {
                return Err(ConversionError::DecodeError(format!(
                    "subblock holds {} bytes, expected {}",
                    payload.len(),
                    expected
                )));
            }
            Ok(Cow::Borrowed(&payload[..expected]))
        }
        ZSTD0 => inflate(payload, expected).map(Cow::Owned),
        ZSTD1 => {
            let (header_len, hi_lo) = zstd1_header(payload)?;
            let data = inflate(&payload[header_len..], expected)?;
            if !hi_lo {
                return Ok(Cow::Owned(data));
            }
            if bytes_per_sample != 2 {
                return Err(ConversionError::DecodeError(format!(
                    "hi/lo byte packing on {}-byte samples",
                    bytes_per_sample
                )));
            }
            Ok(Cow::Owned(unpack_hi_lo(&data)))
        }
        other => Err(ConversionError::UnsupportedFormat(format!(
            "compressed CZI subblock (mode {})",
            other
        ))),
    }
}

fn inflate(src: &[u8], expected: usize) -> Result<Vec<u8>> {
    let zstd_err = |e: std::io::Error| ConversionError::DecodeError(format!("zstd: {}", e));

    let decoder = zstd::stream::read::Decoder::with_buffer(src).map_err(zstd_err)?;
    let mut out = Vec::new();
    decoder
        .take(expected as u64 + 1)
        .read_to_end(&mut out)
        .map_err(zstd_err)?;

    if out.len() != expected {
        return Err(ConversionError::DecodeError(format!(
            "zstd subblock inflates to {} bytes, expected {}",
            out.len(),
            expected
        )));
    }
    Ok(out)
}

/// Header length and hi/lo packing flag of a mode 6 payload.
fn zstd1_header(payload: &[u8]) -> Result<(usize, bool)> {
    let header_len = payload.first().copied().unwrap_or(0) as usize;
    if header_len == 0 || header_len > payload.len() {
        return Err(ConversionError::DecodeError(format!(
            "invalid zstd subblock header of {} bytes",
            header_len
        )));
    }
    let hi_lo = header_len >= 3 && payload[1] == CHUNK_HI_LO_PACKING && payload[2] & 1 == 1;
    Ok((header_len, hi_lo))
}

/// Interleaves `[lo0, lo1, .., hi0, hi1, ..]` back into little-endian u16s.
fn unpack_hi_lo(data: &[u8]) -> Vec<u8> {
    let (lo, hi) = data.split_at(data.len() / 2);
    lo.iter().zip(hi).flat_map(|(&l, &h)| [l, h]).collect()
}
