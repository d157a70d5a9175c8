//! Tracing subscriber setup for binaries built on top of the workspace crates.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install a formatted subscriber filtered by `RUST_LOG` (default `info`).
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
