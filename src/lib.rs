pub mod config;
pub mod pki;
pub mod telemetry;
