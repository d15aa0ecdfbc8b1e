//! Configuration management for the pickup-room engine
//!
//! This module handles configuration loading from environment variables and
//! TOML files, validation, and default values.

pub mod app;
pub mod rating;

pub use app::{validate_config, AppConfig, MatchmakingSettings, ServiceSettings};
pub use rating::RatingConfig;
