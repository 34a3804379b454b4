//! # Bulwark Domain
//!
//! Resilience domain types shared by every Bulwark crate.
//!
//! This crate contains:
//! - `ResilienceConfig`, the resolved retry + circuit breaker parameters
//! - `OperationStrategy` and its parameter tables
//! - Built-in presets (`simple`, `development`, `production`)
//! - Configuration error types
//! - Domain constants (validation ranges, legacy keys, environment names)
//!
//! ## Architecture
//! - No dependencies on other Bulwark crates
//! - No async, no I/O
//! - Pure, immutable data

pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
