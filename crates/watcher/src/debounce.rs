//! Per-entry debouncing logic
//!
//! Turns a stream of change events into backup attempts. Each entry runs one
//! [`EntryLoop`]:
//!
//! - `Idle`: waiting for a change. A change inside the throttle window is
//!   dropped; with a zero debounce it triggers a backup at once; otherwise it
//!   opens a burst.
//! - `Debouncing`: further events are only logged. The backup fires when the
//!   debounce timer (started by the first event of the burst, never reset) or
//!   the deadline timer elapses, whichever comes first.
//!
//! Attempts run on the blocking pool so a long copy never holds up other
//! entries. Cancellation is observed only while waiting, never during a
//! backup.

use crate::Watcher;
use backsnap_core::config::EntrySettings;
use backsnap_core::EntryBackup;
use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// The work performed when a burst resolves
pub trait BackupAction: Send + Sync + 'static {
    /// Run one backup attempt. `initial` is true until an attempt succeeds.
    fn backup(&self, initial: bool) -> anyhow::Result<()>;
}

impl BackupAction for EntryBackup {
    fn backup(&self, initial: bool) -> anyhow::Result<()> {
        self.run(initial)?;
        Ok(())
    }
}

/// Options shared by every entry loop
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopOptions {
    /// Render errors with their full debug chain
    pub verbose: bool,
}

impl LoopOptions {
    /// Log `err` as a warning, with its debug chain when verbose
    pub fn warn(&self, context: impl Display, err: &anyhow::Error) {
        if self.verbose {
            warn!("{}: {:?}", context, err);
        } else {
            warn!("{}: {:#}", context, err);
        }
    }
}

/// Mutable state owned by a single entry loop
#[derive(Debug, Clone)]
pub struct RunState {
    pub settings: EntrySettings,
    /// Completion time of the last successful attempt
    pub latest: Option<Instant>,
}

impl RunState {
    pub fn new(settings: EntrySettings) -> Self {
        Self {
            settings,
            latest: None,
        }
    }

    /// No attempt has succeeded yet
    pub fn is_initial(&self) -> bool {
        self.latest.is_none()
    }

    /// Whether a change seen at `now` falls inside the throttle window
    pub fn is_throttled(&self, now: Instant) -> bool {
        let throttle = self.settings.throttle;
        match self.latest {
            Some(latest) if !throttle.is_zero() => now.duration_since(latest) < throttle,
            _ => false,
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

/// Control loop for one configured entry
pub struct EntryLoop<A> {
    state: RunState,
    action: Arc<A>,
    options: LoopOptions,
}

impl EntryLoop<EntryBackup> {
    /// Loop backed by a real backup of `settings.input`
    pub fn for_entry(settings: EntrySettings, options: LoopOptions) -> Self {
        let action = EntryBackup::from_settings(&settings);
        Self::new(settings, action, options)
    }
}

impl<A: BackupAction> EntryLoop<A> {
    pub fn new(settings: EntrySettings, action: A, options: LoopOptions) -> Self {
        Self {
            state: RunState::new(settings),
            action: Arc::new(action),
            options,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run until `cancel` fires. Performs one attempt up front.
    pub async fn run(mut self, mut events: Watcher, cancel: CancellationToken) {
        self.attempt().await;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return,
                event = events.recv() => event,
            };

            let Some(event) = event else {
                debug!("no change notifications for {:?}", self.input());
                cancel.cancelled().await;
                return;
            };
            debug!("FS event detected: {:?}", event);

            if self.state.is_throttled(Instant::now()) {
                debug!("throttled: ignoring change to {:?}", self.input());
                continue;
            }

            if self.state.settings.debounce.is_zero() {
                self.attempt().await;
                continue;
            }

            if let Flow::Stop = self.debounce(&mut events, &cancel).await {
                return;
            }
        }
    }

    /// Wait out one burst, then attempt a backup
    async fn debounce(&mut self, events: &mut Watcher, cancel: &CancellationToken) -> Flow {
        let deadline_enabled = !self.state.settings.deadline.is_zero();
        let debounce = sleep(self.state.settings.debounce);
        let deadline = sleep(self.state.settings.deadline);
        tokio::pin!(debounce, deadline);

        let mut open = true;
        debug!("debouncing {:?}", self.input());

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Flow::Stop,
                event = events.recv(), if open => match event {
                    Some(event) => debug!("FS event detected: {:?}", event),
                    None => open = false,
                },
                _ = &mut debounce => {
                    debug!("debounce elapsed for {:?}", self.input());
                    break;
                }
                _ = &mut deadline, if deadline_enabled => {
                    debug!("deadline reached for {:?}", self.input());
                    break;
                }
            }
        }

        self.attempt().await;
        Flow::Continue
    }

    /// One backup attempt; failures are logged and leave `latest` untouched
    async fn attempt(&mut self) {
        let initial = self.state.is_initial();
        let action = Arc::clone(&self.action);
        let result = match tokio::task::spawn_blocking(move || action.backup(initial)).await {
            Ok(result) => result,
            Err(e) => Err(anyhow::Error::from(e).context("backup task did not complete")),
        };

        match result {
            Ok(()) => self.state.latest = Some(Instant::now()),
            Err(err) => self
                .options
                .warn(format_args!("failed to backup {:?}", self.input()), &err),
        }
    }

    fn input(&self) -> &Path {
        &self.state.settings.input
    }
}
