//! In-memory image volumes
//!
//! A volume is a hyperstack of pixel planes indexed by channel, slice and
//! frame. Planes are either owned buffers or memory-mapped file ranges and
//! are always read through the same byte-slice interface.

mod pixel;
mod plane;
pub mod types;

pub use pixel::PixelType;
pub use plane::PlaneData;
pub use types::{ChannelImage, DisplayRange, ImageVolume, SeriesDescriptor, VolumeShape};
