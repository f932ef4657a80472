use super::args::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_DIRECTIVE: &str = "warn";

/// Install the stderr log subscriber
///
/// An explicit `level` wins over `RUST_LOG`; with neither, warnings and
/// errors are shown. Stdout stays reserved for the report.
pub fn init_logging(level: Option<LogLevel>) {
    let filter = build_filter(level);

    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter),
        )
        .try_init();

    if let Err(e) = installed {
        eprintln!("Warning: logging already initialized: {}", e);
    }
}

fn build_filter(level: Option<LogLevel>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level.as_directive()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}
