//! Candidate file discovery under a batch root.
//!
//! Traversal is an explicit stack rather than recursion.  Symlinked
//! directories are never entered, which rules out cycles; symlinks to regular
//! files are kept.  The file list is sorted so runs are reproducible.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{BatchError, Failure};
use crate::file::Direction;

/// Result of scanning a root directory.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Matching files, sorted.
    pub files:  Vec<PathBuf>,
    /// Subdirectories that could not be listed.  Reported as failures so a
    /// partial scan is never mistaken for a complete one.
    pub errors: Vec<Failure>,
}

/// Find files under `root` carrying `direction`'s input extension.
///
/// With `recursive == false` only `root`'s immediate children are listed.
/// Failing to list `root` itself is fatal; failing to list a subdirectory is
/// recorded in [`Discovered::errors`] and the scan continues.
pub fn discover(root: &Path, recursive: bool, direction: Direction) -> Result<Discovered, BatchError> {
    let meta = fs::metadata(root).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BatchError::RootNotFound(root.to_owned()),
        _ => BatchError::Io { path: root.to_owned(), source: e },
    })?;
    if !meta.is_dir() {
        return Err(BatchError::NotADirectory(root.to_owned()));
    }

    let mut found = Discovered::default();
    let mut pending = vec![root.to_owned()];

    while let Some(dir) = pending.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == root => {
                return Err(BatchError::Io { path: dir, source: e });
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot list directory");
                found.errors.push(Failure { input: dir, reason: format!("cannot list directory: {e}") });
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "cannot read directory entry");
                    found.errors.push(Failure {
                        input:  dir.clone(),
                        reason: format!("cannot read directory entry: {e}"),
                    });
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat directory entry");
                    found.errors.push(Failure { input: path, reason: format!("cannot stat entry: {e}") });
                    continue;
                }
            };

            if file_type.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if file_type.is_symlink() {
                // Follow links to files only.
                if fs::metadata(&path).is_ok_and(|m| m.is_file()) && direction.accepts(&path) {
                    found.files.push(path);
                } else {
                    debug!(path = %path.display(), "skipping symlink");
                }
            } else if file_type.is_file() && direction.accepts(&path) {
                found.files.push(path);
            }
        }
    }

    found.files.sort();
    debug!(root = %root.display(), recursive, files = found.files.len(), "discovery finished");
    Ok(found)
}
