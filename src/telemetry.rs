use std::env;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber. `RUST_LOG` takes precedence, otherwise
/// `LOG_LEVEL` (default `info`) is used as the only directive.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::default().add_directive(log_level.parse().unwrap_or(Level::INFO.into()))
    });
    let _ = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .try_init();

    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {}", info);
    }));
}

/// Subscriber for unit and integration tests; safe to call from every test.
pub fn init_for_tests() {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_target(false)
        .with_test_writer()
        .try_init();
}
