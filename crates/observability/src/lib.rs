//! Process-wide logging setup shared by binaries and test harnesses.
//!
//! The engines emit plain `tracing` events and never install a subscriber;
//! whoever owns `main` calls [`init`] once.

/// Tracing configuration (filters, output format).
pub mod tracing;

/// Initialize logging for the process.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
