//! Single-level directory listing for batch runs.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{ConvertError, Result};

/// A regular file found directly inside the batch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
}

impl FileEntry {
    pub fn file_name(&self) -> &OsStr {
        self.path.file_name().unwrap_or_default()
    }
}

/// List the regular files directly inside `dir`, sorted by name.
///
/// Directories, symlinks and special files are skipped. Nothing is filtered
/// by extension; deciding what is convertible is left to the decoder. A `dir`
/// that does not exist (or is not a directory) yields an empty list.
pub fn list_convertible_files(dir: &Path) -> Result<Vec<FileEntry>> {
    if !dir.is_dir() {
        log::debug!("{} is not a directory, nothing to list", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                let path = e.path().unwrap_or(dir).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::other("Failed to read directory"));
                return Err(ConvertError::IoFailed { path, source });
            }
            Err(e) => {
                log::warn!("Skipping unreadable directory entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            log::debug!("Skipping non-file entry {}", entry.path().display());
            continue;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                log::warn!("Skipping {}: {e}", entry.path().display());
                continue;
            }
        };

        files.push(FileEntry {
            path: entry.into_path(),
            size,
        });
    }

    Ok(files)
}
