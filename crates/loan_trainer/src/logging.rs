use crate::config::{LogFormat, LoggingConfig};
use crate::errors::{PipelineError, Result};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

type Filtered = Layered<EnvFilter, Registry>;

/// Install the global subscriber. Called once, from `main`.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<()> {
    build_subscriber(config, verbose)?
        .try_init()
        .map_err(|e| PipelineError::Config(format!("failed to set tracing subscriber: {e}")))
}

/// Make sure some global subscriber is installed, falling back to `config`.
///
/// Returns `false` only when none is set and `config` cannot be installed.
pub fn ensure_logging(config: &LoggingConfig, verbose: bool) -> bool {
    tracing::dispatcher::has_been_set() || init_logging(config, verbose).is_ok()
}

/// Subscriber for `config` without installing it.
///
/// `RUST_LOG` wins over the configured level; `verbose` forces `debug`.
/// Console events go to stderr so `predict` output on stdout stays clean.
/// With a log file configured, the same events are appended to it without
/// ANSI colors.
pub fn build_subscriber(config: &LoggingConfig, verbose: bool) -> Result<impl Subscriber + Send + Sync> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    let console: Box<dyn Layer<Filtered> + Send + Sync> = match config.format {
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
    };

    let file = match config.file_path() {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file))
}

fn open_log_file(path: &Path) -> Result<File> {
    let persistence = |source| PipelineError::Persistence {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(persistence)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(persistence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tracing::info;

    #[test]
    fn file_layer_appends_plain_events() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs/run.log");
        let config = LoggingConfig {
            level: "info".into(),
            file: Some(path.clone()),
            ..LoggingConfig::default()
        };

        let subscriber = build_subscriber(&config, true).unwrap();
        tracing::subscriber::with_default(subscriber, || info!(rows = 3, "dataset loaded"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("dataset loaded"));
        assert!(text.contains("rows=3"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn ensure_logging_installs_once() {
        let config = LoggingConfig {
            file: None,
            ..LoggingConfig::default()
        };
        assert!(ensure_logging(&config, false));
        assert!(tracing::dispatcher::has_been_set());
        assert!(ensure_logging(&config, false));
        assert!(init_logging(&config, false).is_err());
    }

    #[test]
    fn empty_file_path_disables_the_sink() {
        let config = LoggingConfig {
            file: Some("".into()),
            ..LoggingConfig::default()
        };
        assert!(config.file_path().is_none());
        assert!(build_subscriber(&config, false).is_ok());
    }
}
