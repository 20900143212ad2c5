//! A single backup attempt for one entry
//!
//! 1. Parse the input path into an [`IndexedName`].
//! 2. List related backups already in the output directory.
//! 3. On the first attempt only, skip the copy if the newest backup is
//!    strictly newer than anything under the input.
//! 4. Otherwise copy the input to the next indexed name.
//! 5. Prune down to the configured limit.

use crate::config::EntrySettings;
use crate::error::Result;
use crate::fs::{copy_recursive, max_mod_time};
use crate::name::IndexedName;
use crate::retention::{list_related, next_name, prune_candidates, remove_backups};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What a successful attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Input copied to `path`
    Copied { path: PathBuf, bytes: u64, pruned: usize },
    /// Newest backup at `path` already newer than the input; nothing copied
    UpToDate { path: PathBuf, pruned: usize },
}

impl BackupOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Copied { path, .. } | Self::UpToDate { path, .. } => path,
        }
    }

    pub fn pruned(&self) -> usize {
        match self {
            Self::Copied { pruned, .. } | Self::UpToDate { pruned, .. } => *pruned,
        }
    }
}

/// Backup action bound to one entry's input, output and limit
#[derive(Debug, Clone)]
pub struct EntryBackup {
    input: PathBuf,
    output: PathBuf,
    limit: i64,
}

impl EntryBackup {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, limit: i64) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            limit,
        }
    }

    pub fn from_settings(settings: &EntrySettings) -> Self {
        Self::new(&settings.input, &settings.output, settings.limit)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Run one attempt. `initial` enables the up-to-date check.
    pub fn run(&self, initial: bool) -> Result<BackupOutcome> {
        let inp = IndexedName::parse(&self.input);
        let mut outs = list_related(&self.output, &inp)?;
        let next = next_name(&outs, &inp);

        let outcome = match outs.last() {
            Some(prev) if initial && self.is_up_to_date(prev)? => {
                let path = self.output.join(prev.to_string());
                debug!("backup {:?} is already up to date", path);
                // The would-be name still counts toward the limit; at the
                // last index there is none and nothing needs copying
                match next {
                    Ok(next) => outs.push(next),
                    Err(e) => debug!("{}", e),
                }
                BackupOutcome::UpToDate { path, pruned: 0 }
            }
            _ => {
                let next = next?;
                let path = self.output.join(next.to_string());
                let bytes = copy_recursive(&self.input, &path, &self.output)?;
                info!("backed up {:?}", path);
                outs.push(next);
                BackupOutcome::Copied {
                    path,
                    bytes,
                    pruned: 0,
                }
            }
        };

        let pruned = remove_backups(&self.output, prune_candidates(&outs, self.limit));

        Ok(match outcome {
            BackupOutcome::Copied { path, bytes, .. } => BackupOutcome::Copied {
                path,
                bytes,
                pruned,
            },
            BackupOutcome::UpToDate { path, .. } => BackupOutcome::UpToDate { path, pruned },
        })
    }

    fn is_up_to_date(&self, prev: &IndexedName) -> Result<bool> {
        let prev_time = max_mod_time(&self.output.join(prev.to_string()))?;
        let input_time = max_mod_time(&self.input)?;
        Ok(prev_time > input_time)
    }
}
