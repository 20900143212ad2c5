//! Backup orchestration
//!
//! Runs one [`EntryLoop`] per configured entry inside a cancellable group.
//! Any change to the config file cancels the group, waits for in-flight
//! backups to finish, reloads the file and starts a fresh group.

use backsnap_core::config::{Config, EntrySettings};
use backsnap_watcher::{EntryLoop, LoopOptions, WatchMode, Watcher};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Backup daemon bound to one config file
pub struct Daemon {
    config_path: PathBuf,
    options: LoopOptions,
}

impl Daemon {
    pub fn new(config_path: impl Into<PathBuf>, options: LoopOptions) -> Self {
        Self {
            config_path: config_path.into(),
            options,
        }
    }

    /// Run until `shutdown` resolves, starting from an already loaded `config`
    pub async fn run(&self, config: Config, shutdown: impl Future<Output = ()>) {
        let root = CancellationToken::new();
        let (mut config_events, mut watching) = self.watch_config();
        let mut group = EntryGroup::spawn(&root, &config, self.options);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = config_events.recv(), if watching => match event {
                    Some(event) => {
                        debug!("config event: {:?}", event);
                        if !self.restart(&root, &mut group, shutdown.as_mut()).await {
                            break;
                        }
                    }
                    None => watching = false,
                },
            }
        }

        info!("shutting down");
        root.cancel();
        group.shutdown().await;
    }

    /// Config watching is best-effort: single-file watches are not supported
    /// everywhere, and without one the daemon simply never restarts.
    fn watch_config(&self) -> (Watcher, bool) {
        match Watcher::new(&self.config_path, WatchMode::NonRecursive) {
            Ok(watcher) => {
                debug!("watching config file {:?}", self.config_path);
                (watcher, true)
            }
            Err(e) => {
                self.options.warn("unable to watch config file", &e);
                (Watcher::disconnected(), false)
            }
        }
    }

    /// Replace `group` with one built from the reloaded config. Returns false
    /// when `shutdown` resolves while the old group is still finishing a copy.
    async fn restart<F>(
        &self,
        root: &CancellationToken,
        group: &mut EntryGroup,
        shutdown: Pin<&mut F>,
    ) -> bool
    where
        F: Future<Output = ()>,
    {
        debug!("restarting on config change");
        tokio::select! {
            _ = shutdown => return false,
            _ = group.shutdown() => {}
        }
        *group = self.reload(root);
        true
    }

    fn reload(&self, root: &CancellationToken) -> EntryGroup {
        match Config::load(&self.config_path) {
            Ok(config) => EntryGroup::spawn(root, &config, self.options),
            Err(e) => {
                error!("{}; no entries will run until the next change", e);
                EntryGroup::spawn(root, &Config::default(), self.options)
            }
        }
    }
}

/// The entry loops started from one configuration
struct EntryGroup {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl EntryGroup {
    fn spawn(parent: &CancellationToken, config: &Config, options: LoopOptions) -> Self {
        let token = parent.child_token();
        let tasks = config
            .resolve_all()
            .into_iter()
            .map(|settings| tokio::spawn(run_entry(settings, options, token.clone())))
            .collect();

        Self { token, tasks }
    }

    /// Cancel every loop and wait for each to exit. Tasks not yet joined
    /// stay in the group if this future is dropped.
    async fn shutdown(&mut self) {
        self.token.cancel();
        while let Some(task) = self.tasks.last_mut() {
            if let Err(e) = task.await {
                error!("entry task failed: {}", e);
            }
            self.tasks.pop();
        }
    }
}

async fn run_entry(settings: EntrySettings, options: LoopOptions, cancel: CancellationToken) {
    // Without a watch the entry still gets its initial backup
    let events = match Watcher::new(&settings.input, WatchMode::Recursive) {
        Ok(watcher) => watcher,
        Err(e) => {
            options.warn(format_args!("unable to watch {:?}", settings.input), &e);
            Watcher::disconnected()
        }
    };

    EntryLoop::for_entry(settings, options).run(events, cancel).await;
}
