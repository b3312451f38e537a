//! Console logging setup.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor `--log-level` says otherwise.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `level`. Calling this twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
