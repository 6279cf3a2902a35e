//! # Core Module
//!
//! Shared configuration used by embedders to set up one or more frame hosts.

pub mod config;

// Re-export commonly used config types
pub use config::{
    BridgeConfig,
    LoggingConfig,
    RendererConfig,
    PresentationConfig,
    Config,
    ConfigError,
};
