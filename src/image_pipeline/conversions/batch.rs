use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use crate::image_pipeline::{
    common::error::{ConversionError, Result},
    conversions::naming::{output_path, source_basename},
    conversions::progress::{LogProgress, ProgressEvent, ProgressObserver},
    conversions::report::{BatchReport, FailureStage, FileOutcome, Timer},
    decode::ImageDecoder,
    display::DisplayNormalizer,
    enumerate::list_files,
    split::ChannelSplitter,
    tiff::{ConversionConfig, StandardTiffWriter, TiffWriter},
    volume::ImageVolume,
};

/// Converts every matching file of a folder into per-channel TIFF stacks.
///
/// Files are handled strictly one after another; a file that fails to
/// decode, or a channel that fails to write, is recorded and skipped
/// without stopping the batch.
pub struct ConversionPipeline<W: TiffWriter> {
    decoder: ImageDecoder,
    normalizer: DisplayNormalizer,
    splitter: ChannelSplitter,
    writer: W,
    config: ConversionConfig,
    observer: Box<dyn ProgressObserver>,
}

impl ConversionPipeline<StandardTiffWriter> {
    pub fn new(config: ConversionConfig) -> Self {
        Self::with_custom(ImageDecoder::new(config.series), StandardTiffWriter, config)
    }
}

impl<W: TiffWriter> ConversionPipeline<W> {
    /// Custom backends and writer; the decoder's series follows `config.series`.
    pub fn with_custom(mut decoder: ImageDecoder, writer: W, config: ConversionConfig) -> Self {
        decoder.set_series(config.series);
        Self {
            decoder,
            normalizer: DisplayNormalizer::new(config.saturated),
            splitter: ChannelSplitter,
            writer,
            config,
            observer: Box::new(LogProgress),
        }
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    fn validate_dimensions(&self, volume: &ImageVolume) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        let (width, height) = (volume.width(), volume.height());
        if width == 0 || height == 0 {
            return Err(ConversionError::InvalidDimensions(width, height));
        }

        if let Some(max) = self.config.max_dimension {
            if width > max || height > max {
                warn!("Image dimensions {}x{} exceed maximum {}", width, height, max);
                return Err(ConversionError::InvalidDimensions(width, height));
            }
        }

        Ok(())
    }

    /// Creates `<input_dir>/<output_dir_name>` if needed, keeping any existing content.
    pub fn prepare_output_dir(&self, input_dir: &Path) -> Result<PathBuf> {
        let results_dir = input_dir.join(&self.config.output_dir_name);
        std::fs::create_dir_all(&results_dir).map_err(|e| {
            ConversionError::WriteError(format!("{}: {}", results_dir.display(), e))
        })?;
        Ok(results_dir)
    }

    /// Runs the batch over `input_dir`, keeping files whose name ends with
    /// `extension` (empty keeps everything).
    ///
    /// Only a missing input directory or an uncreatable results directory
    /// fails the run; per-file problems end up in the report.
    #[instrument(skip(self, input_dir), fields(input_dir = %input_dir.as_ref().display()))]
    pub fn run<P: AsRef<Path>>(&self, input_dir: P, extension: &str) -> Result<BatchReport> {
        let input_dir = input_dir.as_ref();
        if !input_dir.is_dir() {
            return Err(ConversionError::NotFound(input_dir.display().to_string()));
        }

        let results_dir = self.prepare_output_dir(input_dir)?;
        let files = list_files(input_dir, Some(extension))?;
        info!(
            "Converting {} file(s) from {} into {}",
            files.len(),
            input_dir.display(),
            results_dir.display()
        );

        let mut report = BatchReport::new(results_dir.clone());
        let total = files.len();
        for (i, file) in files.iter().enumerate() {
            self.observer.on_event(&ProgressEvent::FileStarted {
                index: i + 1,
                total,
                path: file,
            });
            report.push(self.convert_file(file, &results_dir));
        }

        report.log_summary();
        Ok(report)
    }

    fn decode_volume(&self, source: &Path, outcome: &mut FileOutcome) -> Result<ImageVolume> {
        let timer = Timer::start("decode");
        let volume = {
            let _span = tracing::info_span!("decode").entered();
            self.decoder.decode(source)?
        };
        outcome.timings.record(timer);

        {
            let _span = tracing::info_span!("validate_dimensions",
                width = volume.width(),
                height = volume.height()
            ).entered();
            self.validate_dimensions(&volume)?;
        }
        Ok(volume)
    }

    /// Decode, normalize, split and write one file. Never fails: problems
    /// are recorded in the returned outcome.
    pub fn convert_file(&self, source: &Path, results_dir: &Path) -> FileOutcome {
        let mut outcome = FileOutcome::new(source);
        let source_name = source_basename(source);

        let volume = match self.decode_volume(source, &mut outcome) {
            Ok(volume) => volume,
            Err(e) => {
                warn!("Skipping {}: {}", source.display(), e);
                outcome.fail(FailureStage::Decode, None, e.to_string());
                return outcome;
            }
        };

        info!(
            "Processing file = {} ({}x{}, {} channel(s), {} slice(s), {} frame(s))",
            source_name,
            volume.width(),
            volume.height(),
            volume.channels(),
            volume.slices(),
            volume.frames()
        );

        let volume = if self.config.normalize {
            let timer = Timer::start("normalize");
            let _span = tracing::info_span!("normalize").entered();
            let volume = self.normalizer.normalize(volume);
            outcome.timings.record(timer);
            volume
        } else {
            volume
        };

        let timer = Timer::start("split");
        let channels = match self.splitter.split(volume, &source_name) {
            Ok(channels) => channels,
            Err(e) => {
                warn!("Skipping {}: {}", source.display(), e);
                outcome.fail(FailureStage::Decode, None, e.to_string());
                return outcome;
            }
        };
        outcome.timings.record(timer);

        let count = channels.len();
        for image in channels {
            let path = output_path(results_dir, image.channel, &image.source_name);
            self.observer.on_event(&ProgressEvent::ChannelWriting {
                channel: image.channel,
                channels: count,
                output: &path,
            });

            let timer = Timer::start("write");
            let written = {
                let _span = tracing::info_span!("encode_tiff", channel = image.channel).entered();
                self.writer.write_file(&image, &path, &self.config)
            };
            outcome.timings.record(timer);

            match written {
                Ok(()) => outcome.written.push(path),
                Err(e) => {
                    warn!("Could not write {}: {}", path.display(), e);
                    outcome.fail(FailureStage::Write, Some(image.channel), e.to_string());
                }
            }
        }

        info!("{}: {}", source_name, outcome.timings.summary());
        outcome
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }
}
