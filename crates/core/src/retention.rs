//! Retention: listing related backups, choosing the next name, pruning

use crate::error::{BackupError, Result};
use crate::name::IndexedName;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Backups in `dir` related to `reference`, ascending by index.
///
/// A missing directory is an empty list.
pub fn list_related(dir: &Path, reference: &IndexedName) -> Result<Vec<IndexedName>> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(BackupError::io(dir, e)),
    };

    let mut out = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| BackupError::io(dir, e))?;
        let name = IndexedName::from_file_name(&entry.file_name().to_string_lossy());
        if name.related(reference) {
            out.push(name);
        }
    }

    out.sort_by(IndexedName::cmp_index);
    Ok(out)
}

/// Name for the next backup: the highest existing index plus one, or
/// `reference` unchanged when nothing exists yet.
pub fn next_name(sorted: &[IndexedName], reference: &IndexedName) -> Result<IndexedName> {
    match sorted.last() {
        Some(prev) => prev.next(),
        None => Ok(reference.clone()),
    }
}

/// Entries to delete so that at most `limit` remain, lowest indices first.
///
/// `limit <= 0` disables pruning.
pub fn prune_candidates(sorted: &[IndexedName], limit: i64) -> &[IndexedName] {
    if limit <= 0 {
        return &[];
    }
    let keep = usize::try_from(limit).unwrap_or(usize::MAX);
    &sorted[..sorted.len().saturating_sub(keep)]
}

/// Delete the given backups under `dir`. Best-effort: failures are logged
/// and the remaining candidates are still attempted.
///
/// Returns the number of backups actually removed.
pub fn remove_backups(dir: &Path, victims: &[IndexedName]) -> usize {
    let mut removed = 0;
    for victim in victims {
        let path = dir.join(victim.to_string());
        match remove_path(&path) {
            Ok(()) => {
                removed += 1;
                debug!("deleted {:?}", path);
            }
            Err(e) => warn!("unable to delete {:?}: {}", path, e),
        }
    }
    removed
}

/// Remove a file or a whole directory tree
fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(indices: &[u64]) -> Vec<IndexedName> {
        indices
            .iter()
            .map(|&i| IndexedName::new("save", i, ".dat"))
            .collect()
    }

    #[test]
    fn test_list_related_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let reference = IndexedName::parse("save.dat");
        let listed = list_related(&temp_dir.path().join("nope"), &reference).unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_list_related_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        for file in [
            "save_00000000000000000003.dat",
            "save.dat",
            "save_00000000000000000001.dat",
            "save_00000000000000000002.bak",
            "other_00000000000000000005.dat",
            "notes.txt",
        ] {
            fs::write(dir.join(file), b"x").unwrap();
        }
        fs::create_dir(dir.join("save_00000000000000000010.dat")).unwrap();

        let listed = list_related(dir, &IndexedName::parse("save.dat")).unwrap();
        assert_eq!(listed, names(&[0, 1, 3, 10]));
    }

    #[test]
    fn test_next_name() {
        let reference = IndexedName::parse("save.dat");
        assert_eq!(next_name(&[], &reference).unwrap(), reference);
        assert_eq!(
            next_name(&names(&[0, 1, 4]), &reference).unwrap(),
            IndexedName::new("save", 5, ".dat")
        );
        assert!(matches!(
            next_name(&names(&[u64::MAX]), &reference),
            Err(BackupError::IndexOverflow { .. })
        ));
    }

    #[test]
    fn test_prune_candidates_counts() {
        for k in 0..6usize {
            for limit in -1..6i64 {
                let list = names(&(0..=k as u64).collect::<Vec<_>>());
                let victims = prune_candidates(&list, limit);
                let expected = if limit <= 0 {
                    0
                } else {
                    (k + 1).saturating_sub(limit as usize)
                };
                assert_eq!(victims.len(), expected, "k={} limit={}", k, limit);
                assert_eq!(victims, &list[..expected]);
            }
        }
    }

    #[test]
    fn test_prune_limit_two_keeps_highest() {
        let list = names(&[0, 1, 2, 3]);
        assert_eq!(prune_candidates(&list, 2), &names(&[0, 1])[..]);
    }

    #[test]
    fn test_remove_backups_files_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();

        fs::write(dir.join("save.dat"), b"0").unwrap();
        let tree = dir.join("save_00000000000000000001.dat");
        fs::create_dir_all(tree.join("nested")).unwrap();
        fs::write(tree.join("nested/file"), b"1").unwrap();
        fs::write(dir.join("save_00000000000000000002.dat"), b"2").unwrap();

        // Index 5 does not exist: logged, the rest still removed
        let removed = remove_backups(dir, &names(&[5, 0, 1]));
        assert_eq!(removed, 2);
        assert!(!dir.join("save.dat").exists());
        assert!(!tree.exists());
        assert!(dir.join("save_00000000000000000002.dat").exists());
    }
}
