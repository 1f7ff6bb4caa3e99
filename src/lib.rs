//! Batch conversion of microscopy images into per-channel TIFF files.

pub mod image_pipeline;
pub mod logger;
