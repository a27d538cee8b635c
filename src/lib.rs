//! # lightningimg
//!
//! Image to WebP conversion core library.
//!
//! Converts JPEG, PNG, GIF, BMP and TIFF (and re-encodes WebP) either as a
//! one-shot buffer transform with [`convert_to_webp`], or across a directory
//! with [`process_directory`] (writes into a separate destination) and
//! [`process_directory_destructive`] (replaces the sources in place).
//!
//! ```no_run
//! use lightningimg::{convert_to_webp, ConversionOptions, SourceFormat};
//!
//! let jpeg = std::fs::read("photo.jpg")?;
//! let options = ConversionOptions::new()
//!     .with_quality(80)
//!     .with_dimensions(1200, 800)
//!     .with_maintain_aspect_ratio(true);
//! let webp = convert_to_webp(&jpeg, SourceFormat::Jpeg, &options)?;
//! std::fs::write("photo.webp", webp)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod codec;
pub mod config;
pub mod converter;
pub mod core;
pub mod error;
pub mod format;
pub mod progress;
pub mod resize;
pub mod stats;
pub mod utils;
pub mod walker;

// Re-export commonly used types
pub use codec::{Codec, EncodeMode, ImageWebpCodec, PixelLayout, RawImage};
pub use config::{BatchOptions, Config, ConversionOptions, ProfileConfig};
pub use converter::ImageConverter;
pub use crate::core::{BatchMode, BatchProcessor, DirectoryJob};
pub use error::{ConvertError, ErrorKind, Result};
pub use format::SourceFormat;
pub use progress::{BatchEvent, CancellationFlag, ChannelProgressReporter, ProgressReporter};
pub use resize::{fit_dimensions, resize};
pub use stats::{BatchSummary, FileOutcome, FileStatus};
pub use utils::format_duration;
pub use walker::{FileEntry, list_convertible_files};

use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Compression modes for WebP conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Lossy compression driven by `quality`
    Lossy,
    /// Lossless compression (larger files but perfect quality)
    Lossless,
    /// Lossless for PNG/GIF/BMP sources, lossy for everything else
    Auto,
}

impl FromStr for CompressionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lossy" => Ok(Self::Lossy),
            "lossless" => Ok(Self::Lossless),
            "auto" => Ok(Self::Auto),
            other => anyhow::bail!("Unknown compression mode: {other}"),
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lossy => "lossy",
            Self::Lossless => "lossless",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Report output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Csv,
}

impl ReportFormat {
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Json => "lightningimg_report.json",
            Self::Csv => "lightningimg_report.csv",
        }
    }
}

/// Convert an in-memory image to WebP bytes.
///
/// Errors are returned directly: `DecodeFailed` for malformed input,
/// `InvalidDimensions` for a zero-sized resize target and `EncodeFailed`
/// when libwebp rejects the image.
pub fn convert_to_webp(
    bytes: &[u8],
    format: SourceFormat,
    options: &ConversionOptions,
) -> Result<Vec<u8>> {
    ImageConverter::new(options.clone()).convert(bytes, format)
}

/// Convert every regular file directly inside `source_dir` into
/// `dest_dir/<name>.webp`, with default options. Sources are not modified.
pub fn process_directory(
    source_dir: impl AsRef<Path>,
    dest_dir: impl AsRef<Path>,
) -> Result<BatchSummary> {
    let job = DirectoryJob::safe(source_dir.as_ref(), dest_dir.as_ref());
    BatchProcessor::new(BatchOptions::default()).run(&job)
}

/// Convert every regular file directly inside `dir` in place.
///
/// With `keep_original_filename` the WebP bytes replace each file under its
/// existing name; otherwise each original is removed after a `.webp`
/// sibling has been written. A missing `dir` is a successful no-op.
pub fn process_directory_destructive(
    dir: impl AsRef<Path>,
    keep_original_filename: bool,
) -> Result<BatchSummary> {
    let job = DirectoryJob::destructive(dir.as_ref(), keep_original_filename);
    BatchProcessor::new(BatchOptions::default()).run(&job)
}

/// Write a batch summary report to `path`
pub fn generate_report(
    summary: &BatchSummary,
    format: ReportFormat,
    path: &Path,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let contents = match format {
        ReportFormat::Json => serde_json::to_string_pretty(summary)?,
        ReportFormat::Csv => csv_report(summary)?,
    };
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("Report saved to: {}", path.display());
    Ok(())
}

fn csv_report(summary: &BatchSummary) -> anyhow::Result<String> {
    let dest_dir = summary
        .dest_dir
        .as_ref()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default();

    let rows = [
        ("start_time", summary.start_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("end_time", summary.end_time.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ("duration_seconds", format!("{:.3}", summary.duration.as_secs_f64())),
        ("source_dir", summary.source_dir.display().to_string()),
        ("dest_dir", dest_dir),
        ("mode", summary.mode.clone()),
        ("total_files", summary.total_files.to_string()),
        ("converted_files", summary.converted_files.to_string()),
        ("failed_files", summary.failed_files.to_string()),
        ("skipped_files", summary.skipped_files.to_string()),
        ("cancelled_files", summary.cancelled_files.to_string()),
        ("original_size_bytes", summary.original_size.to_string()),
        ("compressed_size_bytes", summary.compressed_size.to_string()),
        ("compression_ratio", format!("{:.4}", summary.compression_ratio())),
        ("files_per_second", format!("{:.2}", summary.files_per_second())),
        ("thread_count", summary.thread_count.to_string()),
        ("quality", summary.quality.to_string()),
    ];

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["metric", "value"])?;
    for (metric, value) in &rows {
        writer.write_record([*metric, value.as_str()])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
