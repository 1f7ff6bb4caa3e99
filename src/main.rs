use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tiff_splitter::image_pipeline::{
    ConversionConfig, ConversionError, ConversionPipeline, FileStatus, TiffCompression,
};
use tiff_splitter::logger;

use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "tiff_splitter",
    version,
    about = "Split every multi-channel image of a folder into one TIFF stack per channel"
)]
struct Args {
    /// Folder holding the images to convert
    #[arg(value_name = "INPUT_DIR")]
    input_dir: PathBuf,

    /// File name suffix to convert (case-sensitive, empty converts every file)
    #[arg(long, default_value = ".czi")]
    extension: String,

    #[arg(long, value_enum, default_value = "none")]
    compression: CompressionArg,

    /// Horizontal differencing predictor for LZW/Deflate
    #[arg(long, default_value_t = false)]
    predictor: bool,

    /// Zero-based series to read from multi-series files
    #[arg(long, default_value_t = 0)]
    series: usize,

    /// Skip the display contrast stretch
    #[arg(long, default_value_t = false)]
    no_normalize: bool,

    /// Saturated pixel percentage for the contrast stretch
    #[arg(long, default_value_t = 0.35)]
    saturated: f64,

    /// Name of the results folder created inside INPUT_DIR
    #[arg(long, default_value = "TIFF_Files")]
    output_dir_name: String,

    /// Largest accepted image width or height
    #[arg(long)]
    max_dimension: Option<usize>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CompressionArg {
    None,
    Lzw,
    DeflateFast,
    Deflate,
    DeflateBest,
}

impl From<CompressionArg> for TiffCompression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::None => TiffCompression::None,
            CompressionArg::Lzw => TiffCompression::Lzw,
            CompressionArg::DeflateFast => TiffCompression::DeflateFast,
            CompressionArg::Deflate => TiffCompression::DeflateBalanced,
            CompressionArg::DeflateBest => TiffCompression::DeflateBest,
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = ConversionConfig::builder()
        .compression(args.compression.into())
        .predictor(args.predictor.then_some(2))
        .max_dimension(args.max_dimension)
        .series(args.series)
        .normalize(!args.no_normalize)
        .saturated(args.saturated)
        .output_dir_name(args.output_dir_name)
        .build();
    let pipeline = ConversionPipeline::new(config);

    info!("Compression: {:?}", pipeline.config().compression);
    info!(
        "Normalization: {}",
        if pipeline.config().normalize {
            "enabled"
        } else {
            "disabled"
        }
    );

    let report = match pipeline.run(&args.input_dir, &args.extension) {
        Ok(report) => report,
        Err(ConversionError::NotFound(dir)) => {
            error!("Input directory not found: {}", dir);
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            return Err(e).with_context(|| format!("converting {}", args.input_dir.display()));
        }
    };

    if report.count(FileStatus::Converted) < report.files.len() {
        info!(
            "{} file(s) were not fully converted, see warnings above",
            report.files.len() - report.count(FileStatus::Converted)
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();
    logger::init(&args.log_level);

    info!("Starting tiff_splitter...");

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
