use monoflow_core::MONOFLOW_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// Diagnostics go to stderr so they never mix with the task report on
/// stdout. The filter comes from `MONOFLOW_LOG`, then `RUST_LOG`, and
/// defaults to `warn`.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(MONOFLOW_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("warn"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Span covering one task run across all workspaces
pub fn task_span(name: &str, workspaces: usize, concurrency: usize) -> Span {
    span!(
        Level::INFO,
        "task",
        task_name = %name,
        workspaces = %workspaces,
        concurrency = %concurrency
    )
}
