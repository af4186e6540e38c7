//! Test-only tracing setup. The library crates never install a subscriber
//! (an embedder owns that); tests that want to see `tracing` output call
//! this once, guarded so repeated calls across test binaries don't panic.

use std::sync::Once;

static INIT: Once = Once::new();

#[allow(dead_code)]
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .with_target(false)
            .compact()
            .init();
    });
}
