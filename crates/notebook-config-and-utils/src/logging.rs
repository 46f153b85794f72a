//! Logging setup. Every crate logs through `tracing`; the binary installs
//! the subscriber once at startup.

use std::path::Path;

const SERVICE_NAME: &str = "notebook";

/// Install the JSONL file subscriber at `log_path`, optionally mirrored to
/// stderr. `RUST_LOG` wins over `level` when set.
pub fn init_logging_at(level: &str, log_path: &Path, also_stderr: bool) {
    observability::init_with_config(observability::LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: normalize_level(level).into(),
        log_path: Some(log_path.to_path_buf()),
        also_stderr,
    });
}

/// Map user-supplied level names onto the directives `EnvFilter` accepts.
/// Unknown names fall back to `info`.
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        "off" | "quiet" => "off",
        _ => "info",
    }
}
