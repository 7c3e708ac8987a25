//! Subscriber setup for one invocation
//!
//! Logging is installed before the configuration is read so that clamp and
//! fallback warnings from loading are not lost. `advanced.verbose_logging`
//! is only known afterwards, so the filter sits behind a reload layer.

use tracing::{warn, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Filter directive used by `--verbose` and `advanced.verbose_logging`
pub const VERBOSE_DIRECTIVE: &str = "debug";

/// Pick the starting filter. `RUST_LOG` wins, then `--verbose`, then `--log-level`.
pub fn initial_directive(env: Option<&str>, level: &str, verbose: bool) -> String {
    match env.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directive) => directive.to_string(),
        None if verbose => VERBOSE_DIRECTIVE.to_string(),
        None => level.to_string(),
    }
}

/// Adjusts the installed filter once the configuration is known
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    env_override: bool,
}

impl LogControl {
    /// Raise the filter to debug, unless `RUST_LOG` chose the filter
    pub fn enable_verbose(&self) {
        if self.env_override {
            return;
        }
        if let Err(e) = self.handle.reload(EnvFilter::new(VERBOSE_DIRECTIVE)) {
            warn!(error = %e, "Failed to raise log level");
        }
    }
}

fn layered(
    filter: EnvFilter,
) -> (
    impl Subscriber + Send + Sync + 'static,
    reload::Handle<EnvFilter, Registry>,
) {
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true));
    (subscriber, handle)
}

/// Install the global subscriber
pub fn init_logging(level: &str, verbose: bool) -> LogControl {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = initial_directive(env.as_deref(), level, verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(level));

    let (subscriber, handle) = layered(filter);
    subscriber.init();

    LogControl {
        handle,
        env_override: env.is_some_and(|d| !d.trim().is_empty()),
    }
}
