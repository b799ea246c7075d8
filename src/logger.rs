use std::path::Path;
use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Clone, Copy)]
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%m%dT%H:%M:%S%.3f"))
    }
}

/// Log to stdout and to `log_path`; keep the guard alive until exit so the file is flushed.
pub fn init(log_path: impl AsRef<Path>, level: &str) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    let file = std::fs::File::create(log_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_writer(std::io::stdout)
                .with_filter(tracing_subscriber::EnvFilter::new(level))
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTimer)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(tracing_subscriber::EnvFilter::new(level))
        )
        .try_init()?;

    Ok(guard)
}
