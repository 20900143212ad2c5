//! Error types for backup attempts and configuration loading

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single backup attempt
///
/// Never fatal to the process: the entry loop logs it and waits for the
/// next change.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("backup index overflow for {name:?}")]
    IndexOverflow { name: String },
}

impl BackupError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to load or validate the configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to decode config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid duration {0:?}")]
    InvalidDuration(String),

    #[error("invalid entry #{index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}

pub type Result<T, E = BackupError> = std::result::Result<T, E>;
