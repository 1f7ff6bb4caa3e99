//! Image processing pipeline module
//!
//! Turns a folder of multi-channel microscopy images into single-channel
//! TIFF stacks: file enumeration, format-aware decoding, display
//! normalization, channel splitting and TIFF writing.

pub mod common;
pub mod conversions;
pub mod czi;
pub mod decode;
pub mod display;
pub mod enumerate;
pub mod split;
pub mod tiff;
pub mod volume;

pub use common::{
    ConversionError,
    Result,
};

pub use volume::{
    ChannelImage,
    DisplayRange,
    ImageVolume,
    PixelType,
    PlaneData,
    SeriesDescriptor,
    VolumeShape,
};

pub use decode::{
    CziBackend,
    ImageBackend,
    ImageDecoder,
    RawLoaderBackend,
    TiffBackend,
};

pub use display::DisplayNormalizer;
pub use enumerate::list_files;
pub use split::ChannelSplitter;

pub use self::tiff::{
    TiffCompression,
    ConversionConfig,
    ConversionConfigBuilder,
    TiffWriter,
    StandardTiffWriter,
};

pub use conversions::{
    BatchReport,
    ConversionPipeline,
    FileStatus,
    ProgressEvent,
    ProgressObserver,
};
