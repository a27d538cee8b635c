use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::stats::FileOutcome;

/// Trait for reporting conversion progress.
/// Called from worker threads, so implementations must be thread-safe.
pub trait ProgressReporter: Send + Sync {
    /// Set the total number of files to be processed
    fn set_total_files(&self, total: usize);

    /// A file reached its final state
    fn file_finished(&self, outcome: &FileOutcome);

    /// Report that conversion has started
    fn start_conversion(&self) {}

    /// Report that conversion has finished
    fn finish_conversion(&self) {}
}

/// A no-op progress reporter for when progress reporting is not needed
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn set_total_files(&self, _total: usize) {}
    fn file_finished(&self, _outcome: &FileOutcome) {}
}

/// Events emitted by [`ChannelProgressReporter`]
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started { total_files: usize },
    FileFinished(FileOutcome),
    Finished,
}

/// Streams per-file completions to another thread while the batch runs.
///
/// Sending never blocks; events are dropped once the receiver is gone.
#[derive(Clone)]
pub struct ChannelProgressReporter {
    sender: Sender<BatchEvent>,
}

impl ChannelProgressReporter {
    pub fn channel() -> (Self, Receiver<BatchEvent>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { sender }, receiver)
    }

    fn send(&self, event: BatchEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("Progress receiver dropped, discarding event");
        }
    }
}

impl ProgressReporter for ChannelProgressReporter {
    fn set_total_files(&self, total: usize) {
        self.send(BatchEvent::Started { total_files: total });
    }

    fn file_finished(&self, outcome: &FileOutcome) {
        self.send(BatchEvent::FileFinished(outcome.clone()));
    }

    fn finish_conversion(&self) {
        self.send(BatchEvent::Finished);
    }
}

/// Shared stop switch. Files not yet started when it is set are recorded as
/// cancelled; files already converting run to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Console-based progress reporter using indicatif
#[cfg(feature = "cli")]
pub struct ConsoleProgressReporter {
    progress_bar: indicatif::ProgressBar,
}

#[cfg(feature = "cli")]
impl Default for ConsoleProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "cli")]
impl ConsoleProgressReporter {
    pub fn new() -> Self {
        let progress_bar = indicatif::ProgressBar::new(0);
        let style = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("#>-");
        progress_bar.set_style(style);

        Self { progress_bar }
    }
}

#[cfg(feature = "cli")]
impl ProgressReporter for ConsoleProgressReporter {
    fn set_total_files(&self, total: usize) {
        self.progress_bar.set_length(total as u64);
    }

    fn file_finished(&self, outcome: &FileOutcome) {
        use crate::stats::FileStatus;

        self.progress_bar.inc(1);

        match &outcome.status {
            FileStatus::Converted {
                output,
                original_size,
                webp_size,
            } => {
                let ratio = if *original_size > 0 {
                    (1.0 - *webp_size as f64 / *original_size as f64) * 100.0
                } else {
                    0.0
                };
                self.progress_bar.println(format!(
                    "✅ {} -> {} ({}, {:.1}% reduction)",
                    outcome.source.display(),
                    output.display(),
                    humansize::format_size(*webp_size, humansize::DECIMAL),
                    ratio
                ));
            }
            FileStatus::Failed { message, .. } => {
                self.progress_bar
                    .println(format!("❌ Error processing {}: {message}", outcome.source.display()));
            }
            FileStatus::Skipped { .. } | FileStatus::Cancelled => {}
        }
    }

    fn start_conversion(&self) {
        self.progress_bar.set_message("Converting images...");
    }

    fn finish_conversion(&self) {
        self.progress_bar.finish_with_message("Conversion completed!");
    }
}
