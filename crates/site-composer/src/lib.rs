pub mod composition;
pub mod config;
pub mod error;
pub mod telemetry;
