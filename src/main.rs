use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use lightningimg::{
    generate_report, progress::ConsoleProgressReporter, BatchOptions, BatchProcessor,
    BatchSummary, CompressionMode, Config, DirectoryJob, FileStatus, ReportFormat,
};

/// lightningimg - convert a directory of images to WebP
///
/// Safe mode writes `.webp` files into an output directory. Destructive mode
/// replaces the images in place, optionally keeping their original file names
/// so static-site bundlers still resolve them.
#[derive(Parser)]
#[command(name = "lightningimg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "lightningimg - fast batch WebP converter")]
pub struct Args {
    /// Input directory path
    #[arg(short, long, value_name = "DIR")]
    pub input: PathBuf,

    /// Output directory path (defaults to input_dir/webp_output)
    #[arg(short, long, value_name = "DIR", conflicts_with = "destructive")]
    pub output: Option<PathBuf>,

    /// Replace the input images in place
    #[arg(long)]
    pub destructive: bool,

    /// In destructive mode, keep each file's original name and extension
    #[arg(long, requires = "destructive")]
    pub keep_original_filename: bool,

    /// WebP compression quality (0-100)
    #[arg(short, long, value_name = "QUALITY", value_parser = clap::value_parser!(u8).range(0..=100))]
    pub quality: Option<u8>,

    /// Compression mode
    #[arg(short, long, value_enum)]
    pub mode: Option<CompressionModeArg>,

    /// Target width in pixels (requires --height)
    #[arg(long, value_name = "PX", requires = "height")]
    pub width: Option<u32>,

    /// Target height in pixels (requires --width)
    #[arg(long, value_name = "PX", requires = "width")]
    pub height: Option<u32>,

    /// Scale uniformly to fit inside --width x --height
    #[arg(long)]
    pub maintain_aspect_ratio: bool,

    /// Number of parallel threads (defaults to CPU core count)
    #[arg(short, long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Skip outputs that already exist (safe mode)
    #[arg(long)]
    pub no_overwrite: bool,

    /// Leave files that are already WebP untouched
    #[arg(long)]
    pub skip_webp: bool,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Use a predefined configuration profile
    #[arg(long, value_name = "PROFILE", requires = "config")]
    pub profile: Option<String>,

    /// Generate conversion report
    #[arg(long)]
    pub report: bool,

    /// Report output format
    #[arg(long, default_value = "json", value_enum)]
    pub report_format: ReportFormatArg,

    /// Verbose output mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (results only)
    #[arg(long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CompressionModeArg {
    /// Lossy compression driven by --quality
    Lossy,
    /// Lossless compression (larger files but perfect quality)
    Lossless,
    /// Lossless for PNG/GIF/BMP, lossy otherwise
    Auto,
}

impl From<CompressionModeArg> for CompressionMode {
    fn from(mode: CompressionModeArg) -> Self {
        match mode {
            CompressionModeArg::Lossy => CompressionMode::Lossy,
            CompressionModeArg::Lossless => CompressionMode::Lossless,
            CompressionModeArg::Auto => CompressionMode::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormatArg {
    Json,
    Csv,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(format: ReportFormatArg) -> Self {
        match format {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Csv => ReportFormat::Csv,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else if !args.quiet {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    let options = build_options(&args)?;

    let job = if args.destructive {
        DirectoryJob::destructive(&args.input, args.keep_original_filename)
    } else {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| args.input.join("webp_output"));
        DirectoryJob::safe(&args.input, output)
    };

    let processor = BatchProcessor::new(options);
    let summary = if args.quiet {
        processor.run(&job)?
    } else {
        let reporter = ConsoleProgressReporter::new();
        processor.run_with_progress(&job, &reporter)?
    };

    if args.report {
        let format: ReportFormat = args.report_format.into();
        generate_report(&summary, format, Path::new(format.default_file_name()))?;
    }

    if !args.quiet {
        print_results_summary(&summary);
    }

    if !summary.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Defaults, then config file, then profile, then explicit flags
fn build_options(args: &Args) -> Result<BatchOptions> {
    let mut options = BatchOptions::default();

    if let Some(path) = &args.config {
        let config = Config::load(path)?;
        config.apply(&mut options)?;
        if let Some(profile) = &args.profile {
            config
                .apply_profile(profile, &mut options)
                .with_context(|| format!("Failed to apply profile from {}", path.display()))?;
        }
    }

    if let Some(quality) = args.quality {
        options.conversion.quality = quality;
    }
    if let Some(mode) = args.mode {
        options.conversion.mode = mode.into();
    }
    if let (Some(width), Some(height)) = (args.width, args.height) {
        options.conversion.dimensions = Some((width, height));
    }
    if args.maintain_aspect_ratio {
        options.conversion.maintain_aspect_ratio = true;
    }
    if let Some(threads) = args.threads {
        options.threads = Some(threads);
    }
    if args.no_overwrite {
        options.overwrite = false;
    }
    if args.skip_webp {
        options.reencode_webp = false;
    }

    Ok(options)
}

fn print_results_summary(summary: &BatchSummary) {
    use humansize::{format_size, DECIMAL};

    println!("\n🎉 Conversion completed!");
    println!("📊 Results Summary ({}):", summary.mode);
    println!("  ✅ Converted: {} files", summary.converted_files);
    if summary.failed_files > 0 {
        println!("  ❌ Failed: {} files", summary.failed_files);
    }
    if summary.skipped_files > 0 {
        println!("  ⏭️ Skipped: {} files", summary.skipped_files);
    }

    if summary.original_size > 0 {
        println!("\n💾 Space Analysis:");
        println!("  📦 Original size: {}", format_size(summary.original_size, DECIMAL));
        println!("  🗜️ WebP size: {}", format_size(summary.compressed_size, DECIMAL));
        println!("  💾 Space saved: {}", format_size(summary.space_saved(), DECIMAL));
    }

    println!("\n⏱️ Performance:");
    println!("  🕐 Duration: {}", lightningimg::format_duration(summary.duration));
    println!("  🚀 Speed: {:.1} files/sec", summary.files_per_second());
    println!("  🧵 Threads used: {}", summary.thread_count);

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() && failures.len() <= 5 {
        println!("\n❌ Errors:");
        for outcome in failures {
            if let FileStatus::Failed { message, .. } = &outcome.status {
                println!("  • {}: {}", outcome.source.display(), message);
            }
        }
    } else if failures.len() > 5 {
        println!("\n❌ {} errors occurred (use --report for full details)", failures.len());
    }
}
