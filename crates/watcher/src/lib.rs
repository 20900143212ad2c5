//! File system watching for backsnap
//!
//! This crate provides:
//! - A notify-backed change source per watched path
//! - The per-entry debounce/deadline/throttle loop that decides when to back up

pub mod debounce;

pub use debounce::{BackupAction, EntryLoop, LoopOptions, RunState};

use anyhow::{Context, Result};
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Pending events per watcher. A change only means "something changed",
/// so anything beyond a couple of queued events is redundant and dropped.
const EVENT_BUFFER: usize = 2;

/// How far below the watched path changes are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchMode {
    /// The path and everything beneath it
    Recursive,
    /// Only the path itself
    NonRecursive,
}

impl From<WatchMode> for RecursiveMode {
    fn from(mode: WatchMode) -> Self {
        match mode {
            WatchMode::Recursive => RecursiveMode::Recursive,
            WatchMode::NonRecursive => RecursiveMode::NonRecursive,
        }
    }
}

/// File system watcher
///
/// Owns the underlying notify watcher; dropping it stops the watch.
pub struct Watcher {
    _inner: Option<RecommendedWatcher>,
    rx: mpsc::Receiver<WatchEvent>,
}

impl Watcher {
    /// Start watching `path`
    pub fn new(path: &Path, mode: WatchMode) -> Result<Self> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let mut inner = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    if let Some(event) = WatchEvent::from_notify(event) {
                        // Full means a change is already pending
                        let _ = tx.try_send(event);
                    }
                }
                Err(e) => warn!("watch error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        inner
            .watch(path, mode.into())
            .with_context(|| format!("unable to watch {:?}", path))?;

        debug!("watching {:?}", path);

        Ok(Self {
            _inner: Some(inner),
            rx,
        })
    }

    /// Wrap an existing event channel
    pub fn from_receiver(rx: mpsc::Receiver<WatchEvent>) -> Self {
        Self { _inner: None, rx }
    }

    /// A source that never yields events
    pub fn disconnected() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self::from_receiver(rx)
    }

    /// Next change, or `None` once the source is closed
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

/// File system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Paths that changed
    pub paths: Vec<PathBuf>,
    /// Type of change
    pub kind: EventKind,
}

impl WatchEvent {
    pub fn new(kind: EventKind, paths: Vec<PathBuf>) -> Self {
        Self { paths, kind }
    }

    /// Convert a notify event, dropping pure read accesses
    fn from_notify(event: notify::Event) -> Option<Self> {
        let kind = match event.kind {
            notify::EventKind::Access(AccessKind::Close(AccessMode::Write)) => EventKind::Modify,
            notify::EventKind::Access(_) => return None,
            notify::EventKind::Create(_) => EventKind::Create,
            notify::EventKind::Modify(ModifyKind::Name(_)) => EventKind::Rename,
            notify::EventKind::Modify(_) => EventKind::Modify,
            notify::EventKind::Remove(_) => EventKind::Delete,
            notify::EventKind::Any | notify::EventKind::Other => EventKind::Other,
        };
        Some(Self::new(kind, event.paths))
    }
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// File created
    Create,
    /// File modified
    Modify,
    /// File deleted
    Delete,
    /// File renamed
    Rename,
    /// Unclassified change
    Other,
}
