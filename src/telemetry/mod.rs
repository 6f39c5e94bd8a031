//! Logging bootstrap.
//!
//! Every component logs through `tracing`. Nothing is printed until the host
//! application installs a subscriber, either its own or the default one from
//! [`init_tracing`]; without one, logging is a no-op and behavior is unchanged.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already set.
pub fn init_tracing() -> bool {
    init_tracing_with_default("info")
}

pub fn init_tracing_with_default(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
