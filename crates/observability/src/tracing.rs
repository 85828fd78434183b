//! Subscriber setup: one JSON object per log line on stdout.

use tracing_subscriber::EnvFilter;

const FALLBACK_DIRECTIVE: &str = "info";

fn filter_for(directive: Option<&str>) -> EnvFilter {
    let parsed = match directive {
        Some(d) => EnvFilter::try_new(d).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    };
    parsed.unwrap_or_else(|| EnvFilter::new(FALLBACK_DIRECTIVE))
}

/// Install the global subscriber for `directive`, or `RUST_LOG` when `None`.
/// Only the first call in a process installs anything.
pub fn init(directive: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter_for(directive))
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
