//! Image decoding module
//!
//! Format backends behind a common trait, probed in priority order by
//! [`ImageDecoder`], which also resolves multi-series files to one series.

mod backend;
mod czi_backend;
mod raw_backend;
mod registry;
mod tiff_backend;

pub use backend::{ImageBackend, has_extension, read_signature};
pub use czi_backend::CziBackend;
pub use raw_backend::RawLoaderBackend;
pub use registry::ImageDecoder;
pub use tiff_backend::TiffBackend;
