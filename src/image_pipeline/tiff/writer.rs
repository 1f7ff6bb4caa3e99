use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::tiff::types::ConversionConfig;
use crate::image_pipeline::volume::ChannelImage;

pub trait TiffWriter {
    /// Encodes `image` into `output`. Implementations may seek back to patch
    /// offsets, so the stack is streamed rather than staged in memory.
    fn write_tiff<W: Write + Seek>(
        &self,
        image: &ChannelImage,
        output: &mut W,
        config: &ConversionConfig,
    ) -> Result<()>;

    /// Writes `image` to `path`, replacing any existing file. A failed
    /// write leaves no file behind.
    fn write_file(&self, image: &ChannelImage, path: &Path, config: &ConversionConfig) -> Result<()> {
        let file = File::create(path)
            .map_err(|e| ConversionError::WriteError(format!("{}: {}", path.display(), e)))?;
        let mut output = BufWriter::new(file);
        let written = self.write_tiff(image, &mut output, config).and_then(|()| {
            output
                .flush()
                .map_err(|e| ConversionError::WriteError(format!("{}: {}", path.display(), e)))
        });
        if written.is_err() {
            drop(output);
            let _ = std::fs::remove_file(path);
        }
        written
    }
}
