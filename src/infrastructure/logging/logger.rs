use super::config::{LogConfig, LogFormat};
use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Holds the `tracing-appender` worker guard alive for the process lifetime.
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Initialize the global `tracing` subscriber from `config`.
    ///
    /// # Errors
    /// Returns an error if `config.level` does not parse as a `tracing`
    /// level, or if a global subscriber is already installed.
    pub fn init(config: &LogConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy();

        let file_layer = config.log_dir.as_ref().map(|dir| {
            let appender = rolling::never(dir, "firsttry.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (layer, guard)
        });

        let (file_layer, file_guard) = match file_layer {
            Some((layer, guard)) => (Some(layer.with_filter(env_filter.clone())), Some(guard)),
            None => (None, None),
        };

        let stdout_layer = config.enable_stdout.then(|| match config.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact()
                .boxed(),
        });
        let stdout_layer = stdout_layer.map(|layer| layer.with_filter(env_filter));

        tracing_subscriber::registry()
            .with(file_layer)
            .with(stdout_layer)
            .try_init()
            .context("a tracing subscriber is already installed")?;

        Ok(Self { _guard: file_guard })
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    level
        .parse::<Level>()
        .with_context(|| format!("invalid log level: {level}"))
}
