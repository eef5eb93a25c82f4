//! Configuration module
//!
//! Handles user configuration (`config.toml` in the platform config directory),
//! environment overrides, and repository resolution.

mod settings;

pub use settings::*;
