//! Conversion configuration types

use crate::image_pipeline::display::DEFAULT_SATURATED;

/// Name of the folder created inside the input directory for the results.
pub const DEFAULT_OUTPUT_DIR: &str = "TIFF_Files";

/// TIFF compression methods; all of them are lossless
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression (slow, good compression)
    Lzw,
    /// Deflate compression - fast level (good speed/size balance)
    DeflateFast,
    /// Deflate compression - balanced
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Configuration for a batch conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    /// Compression method to use
    pub compression: TiffCompression,
    /// Predictor value for compression (2 for horizontal differencing).
    /// Ignored for floating point data.
    pub predictor: Option<u16>,
    /// Whether to check decoded dimensions before splitting
    pub validate_dimensions: bool,
    /// Largest accepted width or height when validating
    pub max_dimension: Option<usize>,
    /// Zero-based series read from multi-series files
    pub series: usize,
    /// Whether to compute display ranges before writing
    pub normalize: bool,
    /// Saturated percentage for the contrast stretch
    pub saturated: f64,
    /// Results folder created inside the input directory
    pub output_dir_name: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
            validate_dimensions: true,
            max_dimension: None,
            series: 0,
            normalize: true,
            saturated: DEFAULT_SATURATED,
            output_dir_name: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    compression: Option<TiffCompression>,
    predictor: Option<Option<u16>>,
    validate_dimensions: Option<bool>,
    max_dimension: Option<Option<usize>>,
    series: Option<usize>,
    normalize: Option<bool>,
    saturated: Option<f64>,
    output_dir_name: Option<String>,
}

impl ConversionConfigBuilder {
    pub fn compression(mut self, compression: TiffCompression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn predictor(mut self, predictor: Option<u16>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn validate_dimensions(mut self, validate: bool) -> Self {
        self.validate_dimensions = Some(validate);
        self
    }

    pub fn max_dimension(mut self, max: Option<usize>) -> Self {
        self.max_dimension = Some(max);
        self
    }

    pub fn series(mut self, series: usize) -> Self {
        self.series = Some(series);
        self
    }

    pub fn normalize(mut self, enable: bool) -> Self {
        self.normalize = Some(enable);
        self
    }

    pub fn saturated(mut self, saturated: f64) -> Self {
        self.saturated = Some(saturated);
        self
    }

    pub fn output_dir_name(mut self, name: impl Into<String>) -> Self {
        self.output_dir_name = Some(name.into());
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            compression: self.compression.unwrap_or(default.compression),
            predictor: self.predictor.unwrap_or(default.predictor),
            validate_dimensions: self.validate_dimensions.unwrap_or(default.validate_dimensions),
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
            series: self.series.unwrap_or(default.series),
            normalize: self.normalize.unwrap_or(default.normalize),
            saturated: self.saturated.unwrap_or(default.saturated),
            output_dir_name: self.output_dir_name.unwrap_or(default.output_dir_name),
        }
    }
}
