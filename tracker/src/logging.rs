//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` (or `info`) applies to this
/// crate and `warn` to everything else. Calling this twice is harmless.
pub fn init_logging(level: Option<&str>) {
    let default_directive = format!(
        "warn,expense_tracker={level},tower_http={level}",
        level = level.unwrap_or("info")
    );
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
