use std::path::Path;

use tracing::info;

/// Forward-only progress of a batch: one `FileStarted` per file, then one
/// `ChannelWriting` per channel of that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent<'a> {
    FileStarted {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    ChannelWriting {
        channel: usize,
        channels: usize,
        output: &'a Path,
    },
}

pub trait ProgressObserver {
    fn on_event(&self, event: &ProgressEvent<'_>);
}

/// Reports progress through the log.
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_event(&self, event: &ProgressEvent<'_>) {
        match event {
            ProgressEvent::FileStarted { index, total, path } => {
                info!("Processing file {}/{}: {}", index, total, path.display());
            }
            ProgressEvent::ChannelWriting {
                channel,
                channels,
                output,
            } => {
                info!("Saving channel {}/{} to {}", channel, channels, output.display());
            }
        }
    }
}
