//! Process-level failures surfaced by the `services/api` binary.
//!
//! Request handlers never see these; each router maps its own service errors
//! to status codes. `AppError` covers startup, data import and the one-shot
//! commands, where the only consumer is the process exit path.

use crate::config::ConfigError;
use crate::store::import::ImportError;
use crate::telemetry::TelemetryError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("data import error: {0}")]
    Import(#[from] ImportError),
}
