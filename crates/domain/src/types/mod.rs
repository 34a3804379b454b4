//! Domain types and models

pub mod config;
pub mod preset;
pub mod strategy;

pub use config::{BackoffKind, ResilienceConfig};
pub use preset::{Preset, PresetName, PRESETS};
pub use strategy::OperationStrategy;
