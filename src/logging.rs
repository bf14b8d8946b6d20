//! Logging setup for binaries and tests embedding the engine.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,retry_engine=debug";

/// Install a stderr `fmt` subscriber filtered by `RUST_LOG`.
///
/// Returns `false` when a global subscriber is already set, so calling it
/// from several tests is harmless.
pub fn init() -> bool {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let first = init();
        assert!(!init());
        tracing::debug!("logging initialized: {}", first);
    }
}
