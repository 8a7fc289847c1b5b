//! Tracing setup for the `ralph` binary.
//!
//! Log lines are the only channel for loop progress (completion found, budget
//! reached, relaunching, spawn failures). They go to stderr; stdout carries
//! tool replies and the session protocol.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `ralph=info` if unset.
///
/// # Example
/// ```bash
/// RUST_LOG=ralph=debug ralph session
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ralph=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
