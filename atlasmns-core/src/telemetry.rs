//! Logging bootstrap.
//!
//! Installs a `tracing-subscriber` fmt subscriber. The `ATLASMNS_LOG`
//! environment variable takes an `EnvFilter` directive and overrides the
//! caller-supplied default.

use tracing_subscriber::EnvFilter;

/// Initialize logging once at startup. Calling it again is harmless.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env("ATLASMNS_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
