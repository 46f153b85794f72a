//! Configuration, file system paths, and logging setup for the notebook client.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_LOG_LEVEL, DEFAULT_SERVER_URL};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging_at, normalize_level};
pub use paths::Paths;
