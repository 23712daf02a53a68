//! Tracing/logging initialization.
//!
//! Log level comes from `RUST_LOG` (defaults to `info`). Output is JSON
//! unless `LOG_FORMAT=compact` is set, which switches to a human-readable
//! format for local development.

use tracing_subscriber::EnvFilter;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let compact = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("compact"))
        .unwrap_or(false);

    if compact {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .with_target(false)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_does_not_panic() {
        init();
        init();
    }
}
