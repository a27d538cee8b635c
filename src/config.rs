use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::progress::CancellationFlag;
use crate::CompressionMode;

/// Quality used when the caller does not pick one
pub const DEFAULT_QUALITY: u8 = 100;

/// Main configuration structure loaded from config files
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub general: Option<GeneralConfig>,
    pub compression: Option<CompressionConfig>,
    pub resize: Option<ResizeConfig>,
    pub profiles: Option<HashMap<String, ProfileConfig>>,
}

/// Configuration profile for predefined settings
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    pub description: Option<String>,
    pub quality: Option<u8>,
    pub mode: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: Option<bool>,
    pub threads: Option<usize>,
}

/// General configuration options
#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    pub threads: Option<usize>,
    pub overwrite: Option<bool>,
    pub reencode_webp: Option<bool>,
}

/// Compression-related configuration
#[derive(Debug, Deserialize)]
pub struct CompressionConfig {
    pub quality: Option<u8>,
    pub mode: Option<String>,
}

/// Resize target applied to every converted image
#[derive(Debug, Deserialize)]
pub struct ResizeConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: Option<bool>,
}

/// Per-image conversion settings
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// Lossy compression factor, 0-100
    pub quality: u8,
    /// Target box as `(width, height)`; `None` keeps the source size
    pub dimensions: Option<(u32, u32)>,
    /// Only meaningful together with `dimensions`
    pub maintain_aspect_ratio: bool,
    pub mode: CompressionMode,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            dimensions: None,
            maintain_aspect_ratio: false,
            mode: CompressionMode::Lossy,
        }
    }
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern for setting quality (clamped to 100)
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.min(100);
        self
    }

    /// Builder pattern for setting the resize target
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.maintain_aspect_ratio = maintain;
        self
    }

    /// Builder pattern for setting compression mode
    pub fn with_mode(mut self, mode: CompressionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Options for a directory run
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub conversion: ConversionOptions,
    pub threads: Option<usize>,
    /// Replace existing outputs in safe mode
    pub overwrite: bool,
    /// Convert sources that are already WebP; when false they are skipped
    pub reencode_webp: bool,
    pub cancel: Option<CancellationFlag>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            conversion: ConversionOptions::default(),
            threads: None,
            overwrite: true,
            reencode_webp: true,
            cancel: None,
        }
    }
}

impl BatchOptions {
    pub fn new(conversion: ConversionOptions) -> Self {
        Self {
            conversion,
            ..Default::default()
        }
    }

    /// Builder pattern for setting thread count
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Builder pattern for setting overwrite behavior
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Builder pattern for setting reencode WebP behavior
    pub fn with_reencode_webp(mut self, reencode_webp: bool) -> Self {
        self.reencode_webp = reencode_webp;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Get the effective thread count (calculated if not set)
    pub fn get_thread_count(&self) -> usize {
        self.threads.filter(|&n| n > 0).unwrap_or_else(num_cpus::get)
    }
}

impl Config {
    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay the file-level sections onto `options`
    pub fn apply(&self, options: &mut BatchOptions) -> Result<()> {
        if let Some(general) = &self.general {
            if let Some(threads) = general.threads {
                options.threads = Some(threads);
            }
            if let Some(overwrite) = general.overwrite {
                options.overwrite = overwrite;
            }
            if let Some(reencode) = general.reencode_webp {
                options.reencode_webp = reencode;
            }
        }

        if let Some(compression) = &self.compression {
            if let Some(quality) = compression.quality {
                options.conversion.quality = quality.min(100);
            }
            if let Some(mode) = &compression.mode {
                options.conversion.mode = CompressionMode::from_str(mode)?;
            }
        }

        if let Some(resize) = &self.resize {
            apply_resize(
                &mut options.conversion,
                resize.width,
                resize.height,
                resize.maintain_aspect_ratio,
            )?;
        }

        Ok(())
    }

    /// Overlay a named profile onto `options`
    pub fn apply_profile(&self, name: &str, options: &mut BatchOptions) -> Result<()> {
        let profile = self
            .profiles
            .as_ref()
            .and_then(|profiles| profiles.get(name))
            .with_context(|| format!("Unknown profile: {name}"))?;

        if let Some(description) = &profile.description {
            log::debug!("Using profile {name}: {description}");
        }
        if let Some(quality) = profile.quality {
            options.conversion.quality = quality.min(100);
        }
        if let Some(mode) = &profile.mode {
            options.conversion.mode = CompressionMode::from_str(mode)?;
        }
        if let Some(threads) = profile.threads {
            options.threads = Some(threads);
        }
        apply_resize(
            &mut options.conversion,
            profile.width,
            profile.height,
            profile.maintain_aspect_ratio,
        )
    }
}

fn apply_resize(
    conversion: &mut ConversionOptions,
    width: Option<u32>,
    height: Option<u32>,
    maintain_aspect_ratio: Option<bool>,
) -> Result<()> {
    match (width, height) {
        (Some(w), Some(h)) => conversion.dimensions = Some((w, h)),
        (None, None) => {}
        _ => anyhow::bail!("Resize needs both width and height"),
    }
    if let Some(maintain) = maintain_aspect_ratio {
        conversion.maintain_aspect_ratio = maintain;
    }
    Ok(())
}
