//! JSON log output filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `default_filter` applies when `RUST_LOG` is unset or unparsable. A second
/// call leaves the first subscriber in place.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .with_current_span(true)
        .try_init();
}
