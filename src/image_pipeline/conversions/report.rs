use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub duration: Duration,
}

/// Per-stage durations of one file's conversion.
#[derive(Debug, Default, Clone)]
pub struct PipelineTimings {
    steps: Vec<StepTiming>,
    step_map: HashMap<String, Duration>,
}

impl PipelineTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_step(&mut self, name: impl Into<String>, duration: Duration) {
        let name = name.into();
        *self.step_map.entry(name.clone()).or_insert(Duration::ZERO) += duration;
        self.steps.push(StepTiming { name, duration });
    }

    pub fn record(&mut self, timer: Timer) {
        let (name, duration) = timer.stop();
        self.add_step(name, duration);
    }

    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    /// Summed duration of every step recorded under `name`.
    pub fn get_step(&self, name: &str) -> Option<Duration> {
        self.step_map.get(name).copied()
    }

    pub fn steps(&self) -> &[StepTiming] {
        &self.steps
    }

    /// One-line `name=12.345ms` rendering for logs.
    pub fn summary(&self) -> String {
        let mut names: Vec<&String> = self.step_map.keys().collect();
        names.sort_by_key(|name| self.steps.iter().position(|s| &s.name == *name));
        names
            .into_iter()
            .map(|name| format!("{}={:.3}ms", name, self.step_map[name].as_secs_f64() * 1000.0))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    pub fn stop(self) -> (String, Duration) {
        (self.name, self.start.elapsed())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Decode,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub stage: FailureStage,
    /// 1-based channel for write failures
    pub channel: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Every channel was written
    Converted,
    /// Some channels could not be written
    Partial,
    /// Nothing was written for this file
    Skipped,
}

/// What happened to one source file.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub written: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
    pub timings: PipelineTimings,
}

impl FileOutcome {
    pub fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            written: Vec::new(),
            failures: Vec::new(),
            timings: PipelineTimings::new(),
        }
    }

    pub fn fail(&mut self, stage: FailureStage, channel: Option<usize>, message: impl Into<String>) {
        self.failures.push(FileFailure {
            stage,
            channel,
            message: message.into(),
        });
    }

    pub fn status(&self) -> FileStatus {
        if self.written.is_empty() && !self.failures.is_empty() {
            FileStatus::Skipped
        } else if self.failures.is_empty() {
            FileStatus::Converted
        } else {
            FileStatus::Partial
        }
    }
}

/// Result of a whole batch run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results_dir: PathBuf,
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn new(results_dir: PathBuf) -> Self {
        Self {
            results_dir,
            files: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: FileOutcome) {
        self.files.push(outcome);
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status() == status).count()
    }

    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().flat_map(|f| f.written.iter().map(PathBuf::as_path))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &FileFailure)> {
        self.files
            .iter()
            .flat_map(|f| f.failures.iter().map(move |failure| (f.source.as_path(), failure)))
    }

    pub fn total_duration(&self) -> Duration {
        self.files.iter().map(|f| f.timings.total_duration()).sum()
    }

    pub fn log_summary(&self) {
        info!(
            "Done: {} file(s), {} converted, {} partial, {} skipped, {} TIFF(s) written to {} in {:.3}s",
            self.files.len(),
            self.count(FileStatus::Converted),
            self.count(FileStatus::Partial),
            self.count(FileStatus::Skipped),
            self.written().count(),
            self.results_dir.display(),
            self.total_duration().as_secs_f64()
        );
        for (source, failure) in self.failures() {
            warn!(
                "{} ({:?}{}): {}",
                source.display(),
                failure.stage,
                failure.channel.map(|c| format!(", channel {}", c)).unwrap_or_default(),
                failure.message
            );
        }
    }
}
