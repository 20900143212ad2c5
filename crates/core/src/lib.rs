//! Core backup logic for backsnap
//!
//! This crate provides:
//! - Indexed backup names (`name_<index>.ext`)
//! - Retention resolution and pruning
//! - Recursive copy and modification-time scanning
//! - Configuration model and per-entry resolution
//! - A single backup attempt for one configured entry

pub mod backup;
pub mod config;
pub mod error;
pub mod fs;
pub mod name;
pub mod retention;

// Re-exports
pub use backup::{BackupOutcome, EntryBackup};
pub use config::{CommonConfig, Config, EntryConfig, EntrySettings};
pub use error::{BackupError, ConfigError};
pub use name::{Index, IndexedName};
