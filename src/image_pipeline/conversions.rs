//! Batch conversion module
//!
//! This module contains the orchestration of a folder conversion: output
//! naming, progress reporting and the per-file outcome report.

mod batch;
mod naming;
mod progress;
mod report;

#[cfg(test)]
mod tests;

pub use batch::ConversionPipeline;
pub use naming::{output_path, source_basename};
pub use progress::{LogProgress, ProgressEvent, ProgressObserver};
pub use report::{
    BatchReport, FailureStage, FileFailure, FileOutcome, FileStatus, PipelineTimings, StepTiming,
    Timer,
};
