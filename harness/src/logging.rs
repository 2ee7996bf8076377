//! Development-time tracing for debugging the harness.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Dev diagnostics via `RUST_LOG`, output to stderr.
//!   Not part of the harness's product output.
//!
//! - **Console (`console`)**: The `[INFO]`/`[SUCCESS]`/`[WARNING]`/`[ERROR]`
//!   lines a user reads. Always printed, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for development logging.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset, or to `debug` for
/// the harness crate when `verbose` is set.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=harness=debug booster-test status
/// ```
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "warn,harness=debug" } else { "warn" }
}
