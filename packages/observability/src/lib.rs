//! # Observability
//!
//! Centralized logging layer for the notebook workspace.
//!
//! Crates only emit `tracing` events. The binary calls [`init_with_config`]
//! once at startup and decides where they go.
//!
//! Every event is written to the log file as one JSON line:
//!
//! ```text
//! {"timestamp":"...","level":"INFO","service":"notebook","pid":42,
//!  "target":"sync_engine::coordinator","message":"note created","fields":{"note_id":7}}
//! ```
//!
//! so `tail -f ~/.notebook/logs/notebook.jsonl | jq` works as a live view.
//!
//! ## Usage
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "notebook".into(),
//!         default_level: "debug".into(),
//!         also_stderr: true,
//!         ..Default::default()
//!     });
//! }
//! ```

mod file_writer;
mod json_layer;

use std::path::PathBuf;

pub use file_writer::{JsonlFileWriter, WriterFactory};
pub use json_layer::{JsonLayer, LogEntry};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service (e.g., "notebook", "notebook-cli").
    /// Included in every log line for filtering.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional JSONL log file path.
    /// Defaults to `~/.notebook/logs/notebook.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Mirror events to stderr in the compact human format.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Install the global subscriber.
///
/// Falls back to stderr when the log file cannot be opened. A second call
/// is a no-op.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let log_path = config.log_path.clone().unwrap_or_else(default_log_path);

    let json_layer = match JsonlFileWriter::new(&log_path) {
        Ok(writer) => Some(
            JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer))
                .with_filter(env_filter()),
        ),
        Err(e) => {
            eprintln!("failed to open log file {}: {}", log_path.display(), e);
            None
        }
    };

    let stderr_layer = if config.also_stderr || json_layer.is_none() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .compact()
                .with_writer(std::io::stderr)
                .with_filter(env_filter()),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service_name,
            log_path = %log_path.display(),
            "observability initialized"
        );
    }
}

/// Central log file location.
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".notebook")
        .join("logs")
        .join("notebook.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(!config.also_stderr);
    }

    #[test]
    fn test_default_log_path_lives_under_notebook_dir() {
        let path = default_log_path();
        assert!(path.ends_with(".notebook/logs/notebook.jsonl"));
    }
}
