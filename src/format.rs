use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConvertError;

/// Source image formats the default codec can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    WebP,
}

/// Magic number signatures, checked in order
const SIGNATURES: &[(SourceFormat, &[u8])] = &[
    (SourceFormat::Jpeg, &[0xFF, 0xD8, 0xFF]),
    (SourceFormat::Png, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
    (SourceFormat::Gif, b"GIF87a"),
    (SourceFormat::Gif, b"GIF89a"),
    (SourceFormat::Bmp, b"BM"),
    (SourceFormat::Tiff, &[0x49, 0x49, 0x2A, 0x00]), // little-endian
    (SourceFormat::Tiff, &[0x4D, 0x4D, 0x00, 0x2A]), // big-endian
];

impl SourceFormat {
    /// Identify the format from the leading bytes of the file.
    ///
    /// Extensions are untrusted, so batch processing always goes through here.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        // WebP needs special handling: RIFF container with a WEBP fourcc at offset 8
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        SIGNATURES
            .iter()
            .find(|(_, magic)| bytes.starts_with(magic))
            .map(|(format, _)| *format)
    }

    /// Map a file extension (without the dot, any case) to a format
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
            Self::WebP => ImageFormat::WebP,
        }
    }

    /// Formats whose content is usually flat colour or transparency,
    /// where lossless WebP tends to win.
    pub fn prefers_lossless(self) -> bool {
        matches!(self, Self::Png | Self::Gif | Self::Bmp)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
            .ok_or_else(|| ConvertError::decode(format!("Unsupported image format: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_known_signatures() {
        assert_eq!(
            SourceFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(SourceFormat::Jpeg)
        );
        assert_eq!(
            SourceFormat::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            Some(SourceFormat::Png)
        );
        assert_eq!(SourceFormat::sniff(b"GIF89a...."), Some(SourceFormat::Gif));
        assert_eq!(SourceFormat::sniff(b"BM\0\0\0\0"), Some(SourceFormat::Bmp));
        assert_eq!(
            SourceFormat::sniff(&[0x4D, 0x4D, 0x00, 0x2A, 0, 0]),
            Some(SourceFormat::Tiff)
        );
        assert_eq!(
            SourceFormat::sniff(b"RIFF\x10\0\0\0WEBPVP8 "),
            Some(SourceFormat::WebP)
        );
    }

    #[test]
    fn sniff_rejects_unknown_and_short_input() {
        assert_eq!(SourceFormat::sniff(b"hello world"), None);
        assert_eq!(SourceFormat::sniff(&[]), None);
        assert_eq!(SourceFormat::sniff(b"RIFF\0\0\0\0WAVE"), None);
        assert_eq!(SourceFormat::sniff(&[0xFF]), None);
    }

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(SourceFormat::from_extension("JPG"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("Tif"), Some(SourceFormat::Tiff));
        assert_eq!(SourceFormat::from_extension("txt"), None);
        assert_eq!(
            SourceFormat::from_path(Path::new("photos/cat.PNG")),
            Some(SourceFormat::Png)
        );
        assert_eq!(SourceFormat::from_path(Path::new("README")), None);
    }

    #[test]
    fn parses_from_str() {
        assert_eq!(".jpeg".parse::<SourceFormat>().unwrap(), SourceFormat::Jpeg);
        assert!("heic".parse::<SourceFormat>().is_err());
    }
}
