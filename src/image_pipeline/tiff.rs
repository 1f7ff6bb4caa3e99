//! TIFF writing module
//!
//! This module provides single-channel TIFF stack writing with lossless
//! compression options and ImageJ display metadata.

pub mod imagej;
mod standard_tiff_writer;
pub mod types;
mod writer;

pub use standard_tiff_writer::StandardTiffWriter;
pub use types::{ConversionConfig, ConversionConfigBuilder, TiffCompression};
pub use writer::TiffWriter;
