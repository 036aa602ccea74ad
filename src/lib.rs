pub mod api;
pub mod artifact;
pub mod config;
pub mod engine;
pub mod observability;
pub mod telemetry;
