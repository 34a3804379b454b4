//! # Bulwark Infrastructure
//!
//! Adapters around `bulwark-core`.
//!
//! This crate contains:
//! - Configuration loading from the environment and from TOML/JSON files
//! - Tracing subscriber initialisation
//! - Prometheus text export for metrics snapshots
//!
//! ## Architecture
//! - Consumes types defined in `bulwark-core` and `bulwark-domain`
//! - Contains all "impure" code (process environment, file system, global
//!   subscriber)

pub mod config;
pub mod observability;

// Re-export commonly used items
pub use config::{load, load_from_env, load_from_file, LoadError, LoadedConfig};
pub use observability::{init_tracing, LogFormat, PrometheusExporter};
