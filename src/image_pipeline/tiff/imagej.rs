//! ImageJ `ImageDescription` handling
//!
//! ImageJ stores hyperstack layout and display range as `key=value` lines in
//! the first IFD's description. Readers use it to recover c/z/t structure,
//! the writer uses it to carry the display range.

use crate::image_pipeline::volume::DisplayRange;

const IMAGEJ_VERSION: &str = "1.54f";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageJLayout {
    pub images: usize,
    pub channels: usize,
    pub slices: usize,
    pub frames: usize,
    pub display_range: Option<DisplayRange>,
}

impl ImageJLayout {
    pub fn new(channels: usize, slices: usize, frames: usize) -> Self {
        Self {
            images: channels * slices * frames,
            channels,
            slices,
            frames,
            display_range: None,
        }
    }

    /// `channels * slices * frames`, `None` on overflow.
    pub fn stack_size(&self) -> Option<usize> {
        self.channels
            .checked_mul(self.slices)?
            .checked_mul(self.frames)
    }

    pub fn with_display_range(mut self, range: Option<DisplayRange>) -> Self {
        self.display_range = range;
        self
    }

    /// Renders the description text written into the first IFD.
    pub fn describe(&self) -> String {
        let mut text = format!("ImageJ={}\nimages={}\n", IMAGEJ_VERSION, self.images);
        if self.channels > 1 {
            text.push_str(&format!("channels={}\n", self.channels));
        }
        if self.slices > 1 {
            text.push_str(&format!("slices={}\n", self.slices));
        }
        if self.frames > 1 {
            text.push_str(&format!("frames={}\n", self.frames));
        }
        let dims = [self.channels, self.slices, self.frames];
        if dims.iter().filter(|&&d| d > 1).count() > 1 {
            text.push_str("hyperstack=true\n");
        }
        if let Some(range) = self.display_range {
            text.push_str(&format!("min={}\nmax={}\n", range.min, range.max));
        }
        text.push_str("loop=false\n");
        text
    }

    /// Parses an ImageJ description; `None` for any other text, or when the
    /// declared dimensions overflow.
    pub fn parse(description: &str) -> Option<Self> {
        if !description.starts_with("ImageJ=") {
            return None;
        }

        let mut layout = Self::new(1, 1, 1);
        let mut images = None;
        let mut min = None;
        let mut max = None;

        for line in description.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "images" => images = value.parse().ok(),
                "channels" => layout.channels = value.parse().unwrap_or(1).max(1),
                "slices" => layout.slices = value.parse().unwrap_or(1).max(1),
                "frames" => layout.frames = value.parse().unwrap_or(1).max(1),
                "min" => min = value.parse().ok(),
                "max" => max = value.parse().ok(),
                _ => {}
            }
        }

        let stack = layout.stack_size()?;
        layout.images = images.unwrap_or(stack);
        if let (Some(min), Some(max)) = (min, max) {
            layout.display_range = Some(DisplayRange { min, max });
        }
        Some(layout)
    }
}
