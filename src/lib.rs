pub mod cli;
pub mod config;
pub mod error;
pub mod form;
pub mod providers;
pub mod report;
pub mod telemetry;
pub mod valuation;

pub use config::Config;
pub use error::{AppError, AppResult};
