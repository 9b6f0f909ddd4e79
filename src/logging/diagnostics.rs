//! Tracing setup for host applications
//!
//! The crate reports its own internals (logger registration, settings
//! propagation, rejected values) through `tracing`. Binaries that want to see
//! those events can install a subscriber here.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "nslog=info";

/// Build an env filter from `RUST_LOG`, falling back to `default_filter`
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into())
}

/// Install a global fmt subscriber writing to stderr
///
/// Fails if a global subscriber has already been set.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}
