//! Error taxonomy for the conversion engine.

use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while converting a single image or touching the filesystem.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// A resize target or decoded image has a zero-sized axis
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Source bytes are malformed or in an unsupported format
    #[error("Decode failed: {0}")]
    DecodeFailed(String),

    /// The WebP encoder rejected the image
    #[error("Encode failed: {0}")]
    EncodeFailed(String),

    /// Read, write, delete or listing failure
    #[error("IO error on {}: {}", .path.display(), .source)]
    IoFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A single-file operation was given a path that does not exist
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Variant tag of a [`ConvertError`], kept in batch summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidDimensions,
    DecodeFailed,
    EncodeFailed,
    IoFailed,
    NotFound,
}

pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDimensions { .. } => ErrorKind::InvalidDimensions,
            Self::DecodeFailed(_) => ErrorKind::DecodeFailed,
            Self::EncodeFailed(_) => ErrorKind::EncodeFailed,
            Self::IoFailed { .. } => ErrorKind::IoFailed,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::DecodeFailed(msg.into())
    }

    pub fn encode<T: Into<String>>(msg: T) -> Self {
        Self::EncodeFailed(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::IoFailed {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Attach a path to a bare `io::Result`, the way `anyhow::Context` would.
pub(crate) trait IoContext<T> {
    fn at_path(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at_path(self, path: &Path) -> Result<T> {
        self.map_err(|e| ConvertError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            ConvertError::InvalidDimensions { width: 0, height: 3 }.kind(),
            ErrorKind::InvalidDimensions
        );
        assert_eq!(ConvertError::decode("bad").kind(), ErrorKind::DecodeFailed);
        assert_eq!(ConvertError::encode("bad").kind(), ErrorKind::EncodeFailed);
        assert_eq!(
            ConvertError::NotFound(PathBuf::from("x.png")).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn io_error_carries_path() {
        let denied: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        let err = denied.at_path(Path::new("/tmp/a.jpg")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailed);
        assert!(err.to_string().contains("/tmp/a.jpg"));
    }
}
