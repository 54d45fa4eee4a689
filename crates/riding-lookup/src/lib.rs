//! Postal code and name resolution to elected representatives, plus cached
//! voting statistics (bill categories and party loyalty) for each of them.

pub mod background;
pub mod config;
pub mod domain;
pub mod error;
pub mod inflight;
pub mod lookup;
pub mod postal;
pub mod stats;
pub mod store;
pub mod telemetry;

pub use background::{BackgroundStats, BackgroundTasks, TaskFailure};
pub use config::{AppConfig, AppEnvironment};
pub use error::AppError;
pub use postal::{PostalCode, PostalCodeError};
pub use store::{InMemoryStore, Repositories, RepositoryError};
