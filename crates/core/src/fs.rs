//! Filesystem primitives: recursive copy and modification-time scan
//!
//! Both treat a single file exactly like a directory tree with one entry.

use crate::error::{BackupError, Result};
use std::path::Path;
use std::time::SystemTime;
use walkdir::WalkDir;

/// Copy `src` (file or directory tree) to `dst`.
///
/// `dst_dir` is the directory that will contain `dst`; it is created if
/// missing, but only once the source turned out to be readable. Symlinks
/// are followed and their targets copied.
pub fn copy_recursive(src: &Path, dst: &Path, dst_dir: &Path) -> Result<u64> {
    let mut copied = 0u64;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let target = if entry.depth() == 0 {
            dst.to_path_buf()
        } else {
            dst.join(entry.path().strip_prefix(src).unwrap_or(entry.path()))
        };

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| BackupError::io(&target, e))?;
            continue;
        }

        let parent = match target.parent() {
            Some(parent) if entry.depth() > 0 => parent,
            _ => dst_dir,
        };
        std::fs::create_dir_all(parent).map_err(|e| BackupError::io(parent, e))?;
        copied += std::fs::copy(entry.path(), &target)
            .map_err(|e| BackupError::io(entry.path(), e))?;
    }

    Ok(copied)
}

/// Latest modification time of anything under `path`, including `path` itself.
///
/// Returns `UNIX_EPOCH` for an empty walk.
pub fn max_mod_time(path: &Path) -> Result<SystemTime> {
    let mut out = SystemTime::UNIX_EPOCH;
    for entry in WalkDir::new(path) {
        let entry = entry?;
        let modified = entry
            .metadata()?
            .modified()
            .map_err(|e| BackupError::io(entry.path(), e))?;
        if modified > out {
            out = modified;
        }
    }
    Ok(out)
}
