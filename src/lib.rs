pub mod api;
pub mod config;
pub mod error;
pub mod monitor;
pub mod policy;
pub mod state;
pub mod webhook;

pub use config::{Config, ConfigError};
pub use error::{ApiError, MonitorError};
pub use monitor::{Monitor, RunOutcome};
pub use policy::{FreePolicy, Thresholds};
