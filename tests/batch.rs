mod common;

use std::fs;

use tiff_splitter::image_pipeline::{
    ConversionConfig, ConversionError, ConversionPipeline, FileStatus, ImageDecoder,
    TiffCompression,
};

use common::{output_names, read_gray16_pages, sample, write_czi, write_rgb_tiff};

#[test]
fn test_czi_channels_become_separate_stacks() {
    let dir = tempfile::tempdir().unwrap();
    write_czi(&dir.path().join("sample.czi"), 4, 3, 3, 2);

    let report = ConversionPipeline::new(ConversionConfig::default())
        .run(dir.path(), ".czi")
        .unwrap();

    assert_eq!(report.count(FileStatus::Converted), 1);
    let results = dir.path().join("TIFF_Files");
    assert_eq!(
        output_names(&results),
        vec!["C1_sample.tif", "C2_sample.tif", "C3_sample.tif"]
    );

    for c in 0..3 {
        let (pages, description) =
            read_gray16_pages(&results.join(format!("C{}_sample.tif", c + 1)));
        assert_eq!(pages.len(), 2);
        for (z, page) in pages.iter().enumerate() {
            let expected: Vec<u16> = (0..12).map(|i| sample(c, z, i)).collect();
            assert_eq!(page, &expected);
        }
        let description = description.unwrap();
        assert!(description.contains("slices=2"));
        assert!(description.contains("min="));
    }
}

#[test]
fn test_outputs_decode_back_as_single_channel_stacks() {
    let dir = tempfile::tempdir().unwrap();
    write_czi(&dir.path().join("stack.czi"), 5, 2, 2, 3);

    ConversionPipeline::new(ConversionConfig::default())
        .run(dir.path(), ".czi")
        .unwrap();

    let volume = ImageDecoder::default()
        .decode(&dir.path().join("TIFF_Files/C2_stack.tif"))
        .unwrap();
    assert_eq!(volume.channels(), 1);
    assert_eq!(volume.slices(), 3);
    assert_eq!((volume.width(), volume.height()), (5, 2));
    assert!(volume.display_range(0).is_some());
}

#[test]
fn test_corrupt_file_does_not_stop_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_czi(&dir.path().join("a.czi"), 2, 2, 2, 1);
    fs::write(dir.path().join("b.czi"), b"ZISRAWFILE truncated").unwrap();
    write_czi(&dir.path().join("c.czi"), 2, 2, 1, 1);

    let report = ConversionPipeline::new(ConversionConfig::default())
        .run(dir.path(), ".czi")
        .unwrap();

    assert_eq!(report.files.len(), 3);
    assert_eq!(report.count(FileStatus::Skipped), 1);
    assert_eq!(report.files[1].status(), FileStatus::Skipped);
    assert_eq!(
        output_names(&dir.path().join("TIFF_Files")),
        vec!["C1_a.tif", "C1_c.tif", "C2_a.tif"]
    );
}

#[test]
fn test_rerun_overwrites_outputs() {
    let dir = tempfile::tempdir().unwrap();
    write_czi(&dir.path().join("sample.czi"), 3, 3, 2, 1);
    let pipeline = ConversionPipeline::new(ConversionConfig::default());

    pipeline.run(dir.path(), ".czi").unwrap();
    let first = fs::read(dir.path().join("TIFF_Files/C1_sample.tif")).unwrap();
    let report = pipeline.run(dir.path(), ".czi").unwrap();
    let second = fs::read(dir.path().join("TIFF_Files/C1_sample.tif")).unwrap();

    assert_eq!(report.count(FileStatus::Converted), 1);
    assert_eq!(first, second);
    assert_eq!(output_names(&dir.path().join("TIFF_Files")).len(), 2);
}

#[test]
fn test_empty_folder_only_creates_results_dir() {
    let dir = tempfile::tempdir().unwrap();

    let report = ConversionPipeline::new(ConversionConfig::default())
        .run(dir.path(), ".czi")
        .unwrap();

    assert!(report.files.is_empty());
    assert!(output_names(&dir.path().join("TIFF_Files")).is_empty());
}

#[test]
fn test_missing_folder_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");

    let err = ConversionPipeline::new(ConversionConfig::default())
        .run(&missing, ".czi")
        .unwrap_err();

    assert!(matches!(err, ConversionError::NotFound(_)));
    assert!(!missing.exists());
}

#[test]
fn test_normalization_leaves_pixels_unchanged() {
    let normalized = tempfile::tempdir().unwrap();
    let raw = tempfile::tempdir().unwrap();
    write_czi(&normalized.path().join("s.czi"), 6, 4, 1, 3);
    write_czi(&raw.path().join("s.czi"), 6, 4, 1, 3);

    ConversionPipeline::new(ConversionConfig::default())
        .run(normalized.path(), ".czi")
        .unwrap();
    ConversionPipeline::new(ConversionConfig::builder().normalize(false).build())
        .run(raw.path(), ".czi")
        .unwrap();

    let (with_range, description) = read_gray16_pages(&normalized.path().join("TIFF_Files/C1_s.tif"));
    let (without_range, plain) = read_gray16_pages(&raw.path().join("TIFF_Files/C1_s.tif"));
    assert_eq!(with_range, without_range);
    assert!(description.unwrap().contains("max="));
    assert!(!plain.unwrap().contains("max="));
}

#[test]
fn test_extension_filter_and_tiff_input() {
    let dir = tempfile::tempdir().unwrap();
    write_rgb_tiff(&dir.path().join("color.tif"), 4, 4);
    write_czi(&dir.path().join("ignored.czi"), 2, 2, 1, 1);

    let config = ConversionConfig::builder()
        .compression(TiffCompression::DeflateBalanced)
        .predictor(Some(2))
        .build();
    let report = ConversionPipeline::new(config).run(dir.path(), ".tif").unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(
        output_names(&dir.path().join("TIFF_Files")),
        vec!["C1_color.tif", "C2_color.tif", "C3_color.tif"]
    );
    let (pages, _) = read_gray16_pages(&dir.path().join("TIFF_Files/C2_color.tif"));
    let expected: Vec<u16> = (0..16).map(|i| ((i * 3 + 1) % 251) as u16).collect();
    assert_eq!(pages, vec![expected]);
}
