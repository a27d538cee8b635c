use rayon::prelude::*;
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::{
    codec::{Codec, ImageWebpCodec},
    config::BatchOptions,
    converter::ImageConverter,
    error::{ConvertError, IoContext, Result},
    format::SourceFormat,
    progress::{NoOpProgressReporter, ProgressReporter},
    stats::{BatchSummary, FileOutcome, FileStatus},
    utils::atomic_write,
    walker::{FileEntry, list_convertible_files},
};

/// Where converted files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchMode {
    /// Write `.webp` files into a separate directory; sources are never modified
    Safe { dest_dir: PathBuf },
    /// Replace sources in place
    Destructive { keep_original_filename: bool },
}

/// One directory run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryJob {
    pub source_dir: PathBuf,
    pub mode: BatchMode,
}

impl DirectoryJob {
    pub fn safe(source_dir: impl Into<PathBuf>, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            mode: BatchMode::Safe {
                dest_dir: dest_dir.into(),
            },
        }
    }

    pub fn destructive(dir: impl Into<PathBuf>, keep_original_filename: bool) -> Self {
        Self {
            source_dir: dir.into(),
            mode: BatchMode::Destructive {
                keep_original_filename,
            },
        }
    }

    pub fn dest_dir(&self) -> Option<&Path> {
        match &self.mode {
            BatchMode::Safe { dest_dir } => Some(dest_dir),
            BatchMode::Destructive { .. } => None,
        }
    }

    fn label(&self) -> &'static str {
        match self.mode {
            BatchMode::Safe { .. } => "safe",
            BatchMode::Destructive {
                keep_original_filename: true,
            } => "destructive (keep original filename)",
            BatchMode::Destructive {
                keep_original_filename: false,
            } => "destructive",
        }
    }
}

/// A file together with the path its WebP output will be written to
#[derive(Debug, Clone)]
struct PlannedFile {
    entry: FileEntry,
    output: PathBuf,
    /// Output path is the source path itself
    replaces_source: bool,
}

/// Batch engine that drives the walker and converter over a directory
pub struct BatchProcessor<C = ImageWebpCodec> {
    converter: ImageConverter<C>,
    options: BatchOptions,
}

impl BatchProcessor<ImageWebpCodec> {
    pub fn new(options: BatchOptions) -> Self {
        Self::with_codec(ImageWebpCodec, options)
    }
}

impl<C: Codec> BatchProcessor<C> {
    pub fn with_codec(codec: C, options: BatchOptions) -> Self {
        Self {
            converter: ImageConverter::with_codec(codec, options.conversion.clone()),
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Run the complete conversion process
    pub fn run(&self, job: &DirectoryJob) -> Result<BatchSummary> {
        self.run_with_progress(job, &NoOpProgressReporter)
    }

    /// Run the conversion process with progress reporting.
    ///
    /// Blocks until every file has an outcome. Only a failure to create the
    /// destination or to read the source directory itself is returned as an
    /// error; per-file problems are recorded in the summary.
    pub fn run_with_progress(
        &self,
        job: &DirectoryJob,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchSummary> {
        let started = Instant::now();
        let thread_count = self.options.get_thread_count();
        let mut summary = BatchSummary::new(
            job.source_dir.clone(),
            job.dest_dir().map(Path::to_path_buf),
            job.label().to_string(),
            thread_count,
            self.options.conversion.quality,
        );

        // Create output directory
        let out_dir_is_source = match &job.mode {
            BatchMode::Safe { dest_dir } => {
                std::fs::create_dir_all(dest_dir).at_path(dest_dir)?;
                same_directory(dest_dir, &job.source_dir)
            }
            BatchMode::Destructive { .. } => true,
        };

        let files = list_convertible_files(&job.source_dir)?;
        reporter.set_total_files(files.len());

        if files.is_empty() {
            log::info!("No files found in {}", job.source_dir.display());
            reporter.finish_conversion();
            return Ok(summary.finish(started));
        }

        let planned = match &job.mode {
            BatchMode::Safe { dest_dir } => plan_outputs(files, dest_dir, false, out_dir_is_source),
            BatchMode::Destructive {
                keep_original_filename,
            } => plan_outputs(files, &job.source_dir, *keep_original_filename, true),
        };

        log::info!(
            "Converting {} files from {} ({} mode, {} threads)",
            planned.len(),
            job.source_dir.display(),
            job.label(),
            thread_count
        );
        reporter.start_conversion();

        let outcomes = self.convert_all(&planned, &job.mode, thread_count, reporter);
        for outcome in outcomes {
            summary.record(outcome);
        }

        reporter.finish_conversion();
        let summary = summary.finish(started);
        log::info!(
            "Finished {}: {} converted, {} failed, {} skipped",
            job.source_dir.display(),
            summary.converted_files,
            summary.failed_files,
            summary.skipped_files
        );

        Ok(summary)
    }

    /// Convert planned files on a bounded worker pool
    fn convert_all(
        &self,
        planned: &[PlannedFile],
        mode: &BatchMode,
        thread_count: usize,
        reporter: &dyn ProgressReporter,
    ) -> Vec<FileOutcome> {
        let work = || -> Vec<FileOutcome> {
            planned
                .par_iter()
                .map(|file| {
                    let outcome = if self.is_cancelled() {
                        FileOutcome {
                            source: file.entry.path.clone(),
                            format: None,
                            status: FileStatus::Cancelled,
                        }
                    } else {
                        self.process_single_file(file, mode)
                    };
                    reporter.file_finished(&outcome);
                    outcome
                })
                .collect()
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("lightningimg-{i}"))
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!("Failed to build worker pool ({e}), using the global pool");
                work()
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.options
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.is_cancelled())
    }

    /// Process a single file conversion
    fn process_single_file(&self, file: &PlannedFile, mode: &BatchMode) -> FileOutcome {
        let source = &file.entry.path;

        let bytes = match std::fs::read(source) {
            Ok(bytes) => bytes,
            Err(e) => return self.failure(source, None, ConvertError::io(source, e)),
        };

        let Some(format) = SourceFormat::sniff(&bytes) else {
            return self.failure(
                source,
                None,
                ConvertError::decode("Unrecognised image signature"),
            );
        };

        if format == SourceFormat::WebP && !self.options.reencode_webp {
            return FileOutcome::skipped(source.clone(), Some(format), "already WebP");
        }

        if let BatchMode::Safe { .. } = mode {
            if file.replaces_source {
                return FileOutcome::skipped(
                    source.clone(),
                    Some(format),
                    "output would overwrite the source",
                );
            }
            if !self.options.overwrite && file.output.exists() {
                return FileOutcome::skipped(source.clone(), Some(format), "output exists");
            }
        }

        // Everything up to here only reads; the source is touched below
        // only once the encoded image is in memory.
        let webp = match self.converter.convert(&bytes, format) {
            Ok(webp) => webp,
            Err(e) => return self.failure(source, Some(format), e),
        };

        if let Err(e) = self.write_output(file, mode, &webp) {
            return self.failure(source, Some(format), e);
        }

        log::debug!(
            "Converted {} -> {} ({} -> {} bytes)",
            source.display(),
            file.output.display(),
            bytes.len(),
            webp.len()
        );

        FileOutcome {
            source: source.clone(),
            format: Some(format),
            status: FileStatus::Converted {
                output: file.output.clone(),
                original_size: bytes.len() as u64,
                webp_size: webp.len() as u64,
            },
        }
    }

    fn write_output(&self, file: &PlannedFile, mode: &BatchMode, webp: &[u8]) -> Result<()> {
        atomic_write(&file.output, webp)?;

        if let BatchMode::Destructive { .. } = mode {
            if !file.replaces_source {
                std::fs::remove_file(&file.entry.path).at_path(&file.entry.path)?;
            }
        }

        Ok(())
    }

    fn failure(&self, source: &Path, format: Option<SourceFormat>, error: ConvertError) -> FileOutcome {
        log::error!("Failed to convert {}: {}", source.display(), error);
        FileOutcome::failed(source.to_path_buf(), format, &error)
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn has_webp_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("webp"))
}

/// Name a file would get if nothing else claimed it
fn preferred_name(path: &Path) -> OsString {
    let file_name = path.file_name().unwrap_or_default();
    if has_webp_extension(path) {
        return file_name.to_os_string();
    }

    let mut name = path.file_stem().unwrap_or(file_name).to_os_string();
    name.push(".webp");
    name
}

/// Claim keys compare case-insensitively so case-folding filesystems are safe
fn claim_key(name: &OsStr) -> String {
    name.to_string_lossy().to_lowercase()
}

/// Decide every output path before any worker starts, so that no two files
/// write to the same place.
///
/// Files already named `*.webp` claim their own name first. Everyone else
/// claims `stem.webp` in name order; on a clash the full file name is kept
/// (`a.png` -> `a.png.webp`), with a numeric suffix as a last resort.
fn plan_outputs(
    files: Vec<FileEntry>,
    out_dir: &Path,
    keep_original_filename: bool,
    out_dir_is_source: bool,
) -> Vec<PlannedFile> {
    if keep_original_filename {
        return files
            .into_iter()
            .map(|entry| PlannedFile {
                output: entry.path.clone(),
                entry,
                replaces_source: true,
            })
            .collect();
    }

    let mut claimed: HashSet<String> = files
        .iter()
        .filter(|entry| has_webp_extension(&entry.path))
        .map(|entry| claim_key(entry.file_name()))
        .collect();

    files
        .into_iter()
        .map(|entry| {
            let own_name = entry.file_name().to_os_string();

            let name = if has_webp_extension(&entry.path) {
                own_name.clone()
            } else {
                let mut candidates = std::iter::once(preferred_name(&entry.path))
                    .chain(std::iter::once({
                        let mut name = own_name.clone();
                        name.push(".webp");
                        name
                    }))
                    .chain((1u32..).map(|n| {
                        let mut name = own_name.clone();
                        name.push(format!("-{n}.webp"));
                        name
                    }));

                // the numeric tail is unbounded, so a free name always turns up
                candidates
                    .find(|name| claimed.insert(claim_key(name)))
                    .unwrap_or_else(|| own_name.clone())
            };

            let replaces_source = out_dir_is_source && name == own_name;
            PlannedFile {
                output: out_dir.join(&name),
                entry,
                replaces_source,
            }
        })
        .collect()
}
