//! Tracing setup for the CLI entry point.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber.
///
/// Defaults to `info` unless `RUST_LOG` overrides it. Safe to call more
/// than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
