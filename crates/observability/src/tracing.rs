//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the process-wide subscriber: JSON lines, filtered by
/// `RUST_LOG` with an `info` default.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with_default("info");
}

/// Same as [`init`] with an explicit fallback filter, for harnesses that
/// want engine debug output without touching the environment.
pub fn init_with_default(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
