//! Tracing subscriber setup for binaries, demos and tests
//!
//! Library code only emits `tracing` events; installing a subscriber is
//! the host's call. `RUST_LOG` wins over the default directive.

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG` or `default_directive`
///
/// Returns `false` when a global subscriber is already set, so calling it
/// from every test is fine.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_tracing("debug");
        assert!(!init_tracing("info"));
    }
}
