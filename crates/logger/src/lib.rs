//! Shared `tracing` setup for the binaries. Output goes to stderr so stdout stays
//! free for JSON.
//!
//! `RUST_LOG` wins when it is set; otherwise the filter passed in (usually the
//! `log_filter` setting) is used.

use tracing_subscriber::EnvFilter;

/// Builds the filter from `RUST_LOG`, falling back to `default_filter`.
///
/// An unparsable fallback degrades to `info`.
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed; calling it twice is harmless.
pub fn init(default_filter: &str) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(filter = default_filter, "logging initialised");
    }
    installed
}
