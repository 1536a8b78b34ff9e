use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber reading `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops once a global
/// subscriber is set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Runs `f` inside a span, recording its wall-clock duration as a field on
/// completion. Used at stage and per-file task boundaries.
pub(crate) fn timed<T>(span: tracing::Span, f: impl FnOnce() -> T) -> T {
    let _guard = span.enter();
    let started = std::time::Instant::now();
    let result = f();
    tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "done");
    result
}
