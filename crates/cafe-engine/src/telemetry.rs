//! Tracing setup for hosts embedding the engine.
//!
//! ```text
//! RUST_LOG unset  ──► info,cafe=debug,sqlx=warn
//! RUST_LOG=...    ──► whatever it says
//! ```

use tracing_subscriber::EnvFilter;

/// Default filter: engine crates at debug, sqlx quiet.
pub const DEFAULT_FILTER: &str = "info,cafe=debug,sqlx=warn";

/// Installs the global fmt subscriber.
///
/// Call once at startup. Panics if a global subscriber is already set.
pub fn init_tracing() {
    tracing_subscriber::fmt().with_env_filter(filter()).init();
}

/// Subscriber for tests: output goes through the test harness, and a
/// second call is a no-op.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init();
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
