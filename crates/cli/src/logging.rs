//! Logging setup
//!
//! Everything goes to stderr. `RUST_LOG` wins over the verbose flag.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Terse: warnings and completed backups
const TERSE_FILTER: &str = "warn,backsnap_core::backup=info";

/// Verbose: every event, transition, skip and deletion
const VERBOSE_FILTER: &str = "info,backsnap=debug,backsnap_core=debug,backsnap_watcher=debug";

pub fn init(verbose: bool) {
    let level = if verbose { VERBOSE_FILTER } else { TERSE_FILTER };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose),
        )
        .init();
}
