use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::error::{ConvertError, ErrorKind};
use crate::format::SourceFormat;

/// Final state of one file in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Converted {
        output: PathBuf,
        original_size: u64,
        webp_size: u64,
    },
    Skipped {
        reason: String,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub format: Option<SourceFormat>,
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn failed(source: PathBuf, format: Option<SourceFormat>, error: &ConvertError) -> Self {
        Self {
            source,
            format,
            status: FileStatus::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
        }
    }

    pub fn skipped(source: PathBuf, format: Option<SourceFormat>, reason: impl Into<String>) -> Self {
        Self {
            source,
            format,
            status: FileStatus::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self.status, FileStatus::Converted { .. })
    }
}

/// Aggregate result of one directory run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub source_dir: PathBuf,
    pub dest_dir: Option<PathBuf>,
    pub mode: String,
    pub total_files: u64,
    pub converted_files: u64,
    pub failed_files: u64,
    pub skipped_files: u64,
    pub cancelled_files: u64,
    pub original_size: u64,
    pub compressed_size: u64,
    pub thread_count: usize,
    pub quality: u8,
    pub format_stats: HashMap<String, u64>,
    pub files: Vec<FileOutcome>,
}

impl BatchSummary {
    pub(crate) fn new(
        source_dir: PathBuf,
        dest_dir: Option<PathBuf>,
        mode: String,
        thread_count: usize,
        quality: u8,
    ) -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
            source_dir,
            dest_dir,
            mode,
            total_files: 0,
            converted_files: 0,
            failed_files: 0,
            skipped_files: 0,
            cancelled_files: 0,
            original_size: 0,
            compressed_size: 0,
            thread_count,
            quality,
            format_stats: HashMap::new(),
            files: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, outcome: FileOutcome) {
        self.total_files += 1;

        match &outcome.status {
            FileStatus::Converted {
                original_size,
                webp_size,
                ..
            } => {
                self.converted_files += 1;
                self.original_size += original_size;
                self.compressed_size += webp_size;
                if let Some(format) = outcome.format {
                    *self.format_stats.entry(format.name().to_string()).or_insert(0) += 1;
                }
            }
            FileStatus::Failed { .. } => self.failed_files += 1,
            FileStatus::Skipped { .. } => self.skipped_files += 1,
            FileStatus::Cancelled => self.cancelled_files += 1,
        }

        self.files.push(outcome);
    }

    pub(crate) fn finish(mut self, started: Instant) -> Self {
        self.duration = started.elapsed();
        self.end_time = Utc::now();
        self
    }

    /// True when no file failed
    pub fn is_success(&self) -> bool {
        self.failed_files == 0
    }

    /// Compressed bytes over original bytes for converted files
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size > 0 {
            self.compressed_size as f64 / self.original_size as f64
        } else {
            0.0
        }
    }

    pub fn space_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.compressed_size)
    }

    pub fn files_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.converted_files as f64 / secs
        } else {
            0.0
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|outcome| matches!(outcome.status, FileStatus::Failed { .. }))
    }
}
