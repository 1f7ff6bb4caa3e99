//! Bounds-checked little-endian field access over a byte slice.

use crate::image_pipeline::common::error::{ConversionError, Result};

/// Read-only view used by the container parsers. Every accessor fails with
/// a `DecodeError` instead of panicking when the field runs past the end.
#[derive(Debug, Clone, Copy)]
pub struct LeBytes<'a> {
    data: &'a [u8],
}

impl<'a> LeBytes<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| {
                ConversionError::DecodeError(format!(
                    "truncated data: need {} bytes at offset {}, have {}",
                    len,
                    offset,
                    self.data.len()
                ))
            })
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    pub fn u8_at(&self, offset: usize) -> Result<u8> {
        Ok(self.array::<1>(offset)?[0])
    }

    pub fn i32_at(&self, offset: usize) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array(offset)?))
    }

    pub fn i64_at(&self, offset: usize) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array(offset)?))
    }

    /// Reads a non-negative 32-bit count or size.
    pub fn len32_at(&self, offset: usize) -> Result<usize> {
        let value = self.i32_at(offset)?;
        usize::try_from(value).map_err(|_| {
            ConversionError::DecodeError(format!("negative size {} at offset {}", value, offset))
        })
    }

    /// Reads a non-negative 64-bit offset or size.
    pub fn len64_at(&self, offset: usize) -> Result<usize> {
        let value = self.i64_at(offset)?;
        usize::try_from(value).map_err(|_| {
            ConversionError::DecodeError(format!("invalid size {} at offset {}", value, offset))
        })
    }

    /// Reads a fixed-width ASCII field, dropping trailing NUL padding.
    pub fn ascii_at(&self, offset: usize, len: usize) -> Result<String> {
        let raw = self.slice(offset, len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}
