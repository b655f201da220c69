//! Process-wide logging setup shared by the service binaries.

pub mod tracing;

pub use crate::tracing::{LogFormat, LogSettings};

/// Initialize logging with settings read from the environment.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(&LogSettings::from_env());
}
