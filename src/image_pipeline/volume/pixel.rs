/// Storage type of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    U8,
    U16,
    U32,
    F32,
}

impl PixelType {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            PixelType::U8 => 1,
            PixelType::U16 => 2,
            PixelType::U32 | PixelType::F32 => 4,
        }
    }

    /// Width of the storage container in bits.
    pub fn container_bits(self) -> u32 {
        self.bytes_per_sample() as u32 * 8
    }

    pub fn is_float(self) -> bool {
        matches!(self, PixelType::F32)
    }

    /// Decodes the little-endian sample at `index` of a plane buffer.
    pub fn sample(self, bytes: &[u8], index: usize) -> f64 {
        let start = index * self.bytes_per_sample();
        match self {
            PixelType::U8 => bytes[start] as f64,
            PixelType::U16 => u16::from_le_bytes([bytes[start], bytes[start + 1]]) as f64,
            PixelType::U32 => u32::from_le_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ]) as f64,
            PixelType::F32 => f32::from_le_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ]) as f64,
        }
    }

    /// Iterates every sample of a plane buffer as `f64`.
    pub fn samples(self, bytes: &[u8]) -> impl Iterator<Item = f64> + '_ {
        let count = bytes.len() / self.bytes_per_sample();
        (0..count).map(move |i| self.sample(bytes, i))
    }
}
