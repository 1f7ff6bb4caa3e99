use std::fmt;
use std::sync::Arc;

use memmap2::Mmap;

/// Pixel bytes of one (channel, slice, frame) plane, little-endian.
#[derive(Clone)]
pub enum PlaneData {
    /// Decoded into memory.
    Owned(Vec<u8>),
    /// A range of a memory-mapped source file, read on access.
    Mapped {
        map: Arc<Mmap>,
        offset: usize,
        len: usize,
    },
}

impl PlaneData {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PlaneData::Owned(bytes) => bytes,
            PlaneData::Mapped { map, offset, len } => &map[*offset..*offset + *len],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PlaneData::Owned(bytes) => bytes.len(),
            PlaneData::Mapped { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, PlaneData::Mapped { .. })
    }
}

impl From<Vec<u8>> for PlaneData {
    fn from(bytes: Vec<u8>) -> Self {
        PlaneData::Owned(bytes)
    }
}

impl PartialEq for PlaneData {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for PlaneData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaneData::Owned(bytes) => write!(f, "Owned({} bytes)", bytes.len()),
            PlaneData::Mapped { offset, len, .. } => {
                write!(f, "Mapped({} bytes at {})", len, offset)
            }
        }
    }
}
