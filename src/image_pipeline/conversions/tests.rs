use std::fs;
use std::io::{Seek, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::conversions::{
    ConversionPipeline, FailureStage, FileStatus, ProgressEvent, ProgressObserver,
};
use crate::image_pipeline::decode::{ImageBackend, ImageDecoder};
use crate::image_pipeline::tiff::{ConversionConfig, TiffWriter};
use crate::image_pipeline::volume::{
    ChannelImage, DisplayRange, ImageVolume, PixelType, PlaneData, VolumeShape,
};

/// Reads `.mock` files holding `channels,slices,frames`, or `corrupt`.
struct MockBackend {
    series: usize,
    requested: Arc<Mutex<Vec<usize>>>,
}

impl MockBackend {
    fn new() -> Self {
        Self {
            series: 1,
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ImageBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn can_open(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "mock")
    }

    fn series_count(&self, _path: &Path) -> Result<usize> {
        Ok(self.series)
    }

    fn decode(&self, path: &Path, series: usize) -> Result<ImageVolume> {
        self.requested.lock().unwrap().push(series);
        let text = fs::read_to_string(path)?;
        let dims: Vec<usize> = text
            .trim()
            .split(',')
            .map(|v| v.parse())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| ConversionError::DecodeError("Mock decode error".to_string()))?;
        let [channels, slices, frames] = dims[..] else {
            return Err(ConversionError::DecodeError("Mock decode error".to_string()));
        };

        let shape = VolumeShape::new(2, 2, channels, slices, frames);
        let planes = (0..shape.plane_count())
            .map(|i| PlaneData::Owned(vec![i as u8, 10, 20, 30 + i as u8]))
            .collect();
        ImageVolume::new(shape, PixelType::U8, 8, planes)
    }
}

#[derive(Debug, Clone)]
struct Written {
    channel: usize,
    source_name: String,
    range: Option<DisplayRange>,
}

struct MockWriter {
    fail_channel: Option<usize>,
    written_data: Arc<Mutex<Vec<Written>>>,
}

impl MockWriter {
    fn new(fail_channel: Option<usize>) -> (Self, Arc<Mutex<Vec<Written>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = Self {
            fail_channel,
            written_data: written.clone(),
        };
        (writer, written)
    }
}

impl TiffWriter for MockWriter {
    fn write_tiff<W: Write + Seek>(
        &self,
        image: &ChannelImage,
        output: &mut W,
        _config: &ConversionConfig,
    ) -> Result<()> {
        if self.fail_channel == Some(image.channel) {
            return Err(ConversionError::WriteError("Mock encode error".to_string()));
        }
        output.write_all(image.volume.plane(0, 0, 0))?;
        self.written_data.lock().unwrap().push(Written {
            channel: image.channel,
            source_name: image.source_name.clone(),
            range: image.volume.display_range(0),
        });
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingObserver {
    events: Arc<Mutex<Vec<String>>>,
}

impl ProgressObserver for RecordingObserver {
    fn on_event(&self, event: &ProgressEvent<'_>) {
        let line = match event {
            ProgressEvent::FileStarted { index, total, path } => format!(
                "file {}/{} {}",
                index,
                total,
                path.file_name().unwrap().to_string_lossy()
            ),
            ProgressEvent::ChannelWriting {
                channel,
                channels,
                output,
            } => format!(
                "channel {}/{} {}",
                channel,
                channels,
                output.file_name().unwrap().to_string_lossy()
            ),
        };
        self.events.lock().unwrap().push(line);
    }
}

fn pipeline(writer: MockWriter, config: ConversionConfig) -> ConversionPipeline<MockWriter> {
    let decoder = ImageDecoder::with_backends(vec![Box::new(MockBackend::new())], 0);
    ConversionPipeline::with_custom(decoder, writer, config)
}

fn input_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.join("TIFF_Files"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_successful_batch() {
    let dir = input_dir(&[("b.mock", "1,3,1"), ("a.mock", "2,1,1"), ("notes.txt", "x")]);
    let (writer, written) = MockWriter::new(None);

    let report = pipeline(writer, ConversionConfig::default())
        .run(dir.path(), ".mock")
        .unwrap();

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.count(FileStatus::Converted), 2);
    assert_eq!(report.results_dir, dir.path().join("TIFF_Files"));
    assert_eq!(output_names(dir.path()), vec!["C1_a.tif", "C1_b.tif", "C2_a.tif"]);

    let written = written.lock().unwrap();
    let order: Vec<(usize, &str)> = written
        .iter()
        .map(|w| (w.channel, w.source_name.as_str()))
        .collect();
    assert_eq!(order, vec![(1, "a"), (2, "a"), (1, "b")]);
    assert_eq!(
        fs::read(dir.path().join("TIFF_Files/C2_a.tif")).unwrap(),
        vec![1, 10, 20, 31]
    );
}

#[test]
fn test_progress_is_per_file_then_per_channel() {
    let dir = input_dir(&[("a.mock", "2,1,1"), ("b.mock", "1,1,1")]);
    let (writer, _) = MockWriter::new(None);
    let observer = RecordingObserver::default();

    pipeline(writer, ConversionConfig::default())
        .with_observer(observer.clone())
        .run(dir.path(), ".mock")
        .unwrap();

    assert_eq!(
        *observer.events.lock().unwrap(),
        vec![
            "file 1/2 a.mock",
            "channel 1/2 C1_a.tif",
            "channel 2/2 C2_a.tif",
            "file 2/2 b.mock",
            "channel 1/1 C1_b.tif",
        ]
    );
}

#[test]
fn test_reader_failure_skips_only_that_file() {
    let dir = input_dir(&[
        ("a.mock", "1,1,1"),
        ("b.mock", "corrupt"),
        ("c.mock", "1,1,1"),
    ]);
    let (writer, written) = MockWriter::new(None);

    let report = pipeline(writer, ConversionConfig::default())
        .run(dir.path(), ".mock")
        .unwrap();

    assert_eq!(report.count(FileStatus::Converted), 2);
    assert_eq!(report.count(FileStatus::Skipped), 1);
    let skipped = &report.files[1];
    assert_eq!(skipped.failures[0].stage, FailureStage::Decode);
    assert!(skipped.written.is_empty());
    assert_eq!(output_names(dir.path()), vec!["C1_a.tif", "C1_c.tif"]);
    assert_eq!(written.lock().unwrap().len(), 2);
}

#[test]
fn test_writer_failure_keeps_other_channels() {
    let dir = input_dir(&[("a.mock", "3,1,1"), ("b.mock", "1,1,1")]);
    let (writer, written) = MockWriter::new(Some(2));

    let report = pipeline(writer, ConversionConfig::default())
        .run(dir.path(), ".mock")
        .unwrap();

    let first = &report.files[0];
    assert_eq!(first.status(), FileStatus::Partial);
    assert_eq!(first.written.len(), 2);
    assert_eq!(first.failures[0].stage, FailureStage::Write);
    assert_eq!(first.failures[0].channel, Some(2));
    assert_eq!(report.files[1].status(), FileStatus::Converted);

    let channels: Vec<usize> = written.lock().unwrap().iter().map(|w| w.channel).collect();
    assert_eq!(channels, vec![1, 3, 1]);
    assert_eq!(output_names(dir.path()), vec!["C1_a.tif", "C1_b.tif", "C3_a.tif"]);
}

#[test]
fn test_missing_directory_is_fatal() {
    let parent = tempfile::tempdir().unwrap();
    let missing = parent.path().join("absent");
    let (writer, written) = MockWriter::new(None);

    let err = pipeline(writer, ConversionConfig::default())
        .run(&missing, ".mock")
        .unwrap_err();

    assert!(matches!(err, ConversionError::NotFound(_)));
    assert!(!missing.exists());
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_empty_directory_creates_output_folder() {
    let dir = input_dir(&[]);
    let (writer, _) = MockWriter::new(None);

    let report = pipeline(writer, ConversionConfig::default())
        .run(dir.path(), ".czi")
        .unwrap();

    assert!(report.files.is_empty());
    assert!(dir.path().join("TIFF_Files").is_dir());
    assert!(output_names(dir.path()).is_empty());
}

#[test]
fn test_second_run_overwrites_without_error() {
    let dir = input_dir(&[("a.mock", "2,1,1")]);
    fs::create_dir(dir.path().join("TIFF_Files")).unwrap();
    fs::write(dir.path().join("TIFF_Files").join("keep.txt"), "old").unwrap();

    for _ in 0..2 {
        let (writer, _) = MockWriter::new(None);
        let report = pipeline(writer, ConversionConfig::default())
            .run(dir.path(), ".mock")
            .unwrap();
        assert_eq!(report.count(FileStatus::Converted), 1);
    }
    assert_eq!(
        output_names(dir.path()),
        vec!["C1_a.tif", "C2_a.tif", "keep.txt"]
    );
}

#[test]
fn test_normalization_only_sets_display_range() {
    let dir = input_dir(&[("a.mock", "1,3,1")]);

    let (writer, written) = MockWriter::new(None);
    pipeline(writer, ConversionConfig::default())
        .run(dir.path(), ".mock")
        .unwrap();
    let with_range = fs::read(dir.path().join("TIFF_Files/C1_a.tif")).unwrap();
    assert!(written.lock().unwrap()[0].range.is_some());

    let (writer, written) = MockWriter::new(None);
    let config = ConversionConfig::builder().normalize(false).build();
    pipeline(writer, config).run(dir.path(), ".mock").unwrap();
    let without_range = fs::read(dir.path().join("TIFF_Files/C1_a.tif")).unwrap();
    assert!(written.lock().unwrap()[0].range.is_none());

    assert_eq!(with_range, without_range);
}

#[test]
fn test_dimension_validation_failure() {
    let dir = input_dir(&[("a.mock", "1,1,1")]);
    let (writer, written) = MockWriter::new(None);
    let config = ConversionConfig::builder().max_dimension(Some(1)).build();

    let report = pipeline(writer, config).run(dir.path(), ".mock").unwrap();

    assert_eq!(report.count(FileStatus::Skipped), 1);
    assert!(report.files[0].failures[0].message.contains("Invalid image dimensions"));
    assert!(written.lock().unwrap().is_empty());
}

#[test]
fn test_dimension_validation_disabled() {
    let dir = input_dir(&[("a.mock", "1,1,1")]);
    let (writer, _) = MockWriter::new(None);
    let config = ConversionConfig::builder()
        .validate_dimensions(false)
        .max_dimension(Some(1))
        .build();

    let report = pipeline(writer, config).run(dir.path(), ".mock").unwrap();
    assert_eq!(report.count(FileStatus::Converted), 1);
}

#[test]
fn test_configured_series_reaches_backend() {
    let dir = input_dir(&[("a.mock", "1,1,1")]);
    let backend = MockBackend {
        series: 3,
        requested: Arc::new(Mutex::new(Vec::new())),
    };
    let requested = backend.requested.clone();
    let decoder = ImageDecoder::with_backends(vec![Box::new(backend)], 0);
    let (writer, _) = MockWriter::new(None);
    let config = ConversionConfig::builder().series(2).build();

    ConversionPipeline::with_custom(decoder, writer, config)
        .run(dir.path(), ".mock")
        .unwrap();

    assert_eq!(*requested.lock().unwrap(), vec![2]);
}
