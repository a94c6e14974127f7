//! Logging setup for test runs.
//!
//! Doubles emit `tracing` events (declarations, invocations, reprises, hook
//! failures). Nothing is printed unless a subscriber is installed; call
//! [`init_tracing`] at the top of a test to see them.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the default filter
pub const LOG_ENV: &str = "MIMICRY_LOG";

/// Build the filter: `MIMICRY_LOG` if set and valid, else `default_filter`
#[must_use]
pub fn env_filter(default_filter: &str) -> EnvFilter {
    filter_from(LOG_ENV, default_filter)
}

fn filter_from(env_var: &str, default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(env_var).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a compact fmt subscriber writing to the test output
///
/// Returns `false` if a global subscriber was already installed, so calling
/// it from every test is harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_test_writer()
        .compact()
        .try_init()
        .is_ok()
}

/// Install a JSON subscriber (one event per line)
pub fn init_json_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_test_writer()
        .json()
        .try_init()
        .is_ok()
}
