//! Shared helpers for integration tests

use oxidriver::engine::mock::{LoadPlans, MockEngine};
use oxidriver::{Driver, Settings, Timeouts};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn driver_with(plans: LoadPlans, page_load_ms: u64) -> Driver<MockEngine> {
    init_tracing();
    let settings = Settings {
        timeouts: Timeouts {
            page_load_ms,
            ..Timeouts::default()
        },
        ..Settings::default()
    };
    Driver::new(settings, move || MockEngine::new(plans.clone()))
}
