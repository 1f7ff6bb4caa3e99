//! Zeiss CZI container parsing
//!
//! A CZI file is a sequence of ZISRAW segments: a file header pointing at a
//! subblock directory and an XML metadata segment, followed by subblocks
//! that each hold one tile of pixel data plus its dimension coordinates.

mod compression;
mod directory;
mod file;
mod scene;
mod segment;


pub use directory::{CziPixelType, DimensionEntry, DirectoryEntry};
pub use file::CziFile;
pub use scene::SceneLayout;
