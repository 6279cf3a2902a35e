//! # Bridge Configuration
//!
//! Process-level configuration for the frame bridge. The host itself never reads
//! this directly: the embedder loads a [`BridgeConfig`], resolves the renderer
//! kind from it and passes that to
//! [`DelegatedFrameHost::initialize`](crate::DelegatedFrameHost::initialize),
//! and derives [`FrameHostSettings`] for construction.
//!
//! ## Configuration Categories
//!
//! - **Logging**: default log filter
//! - **Renderer**: renderer strategy and GL context preferences
//! - **Presentation**: offscreen buffer ring size

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};
use crate::host::FrameHostSettings;
use crate::render::RendererKind;

/// Largest offscreen ring the presentation path accepts
pub const MAX_OFFSCREEN_BUFFERS: usize = 4;

/// # Logging Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

/// # Renderer Configuration
///
/// Selects the renderer strategy and how the shared GL context is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Renderer strategy used for every host created from this configuration
    pub kind: RendererKind,
    /// Try a GLES 3 context before falling back to GLES 2
    pub prefer_gles3: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kind: RendererKind::GeneralGpu,
            prefer_gles3: true,
        }
    }
}

/// # Presentation Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Number of native buffers cycled through in offscreen mode
    pub offscreen_buffer_count: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self { offscreen_buffer_count: 3 }
    }
}

/// # Complete Bridge Configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Renderer configuration
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Presentation configuration
    #[serde(default)]
    pub presentation: PresentationConfig,
}

impl BridgeConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the renderer strategy
    pub fn with_renderer_kind(mut self, kind: RendererKind) -> Self {
        self.renderer.kind = kind;
        self
    }

    /// Enable or disable the GLES 3 context attempt
    pub fn with_gles3(mut self, enabled: bool) -> Self {
        self.renderer.prefer_gles3 = enabled;
        self
    }

    /// Set the offscreen ring size
    pub fn with_offscreen_buffer_count(mut self, count: usize) -> Self {
        self.presentation.offscreen_buffer_count = count;
        self
    }

    /// Set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.presentation.offscreen_buffer_count;
        if count == 0 {
            return Err(ConfigError::Invalid("Offscreen buffer count must be at least 1".to_string()));
        }
        if count > MAX_OFFSCREEN_BUFFERS {
            return Err(ConfigError::Invalid(format!(
                "Offscreen buffer count {count} exceeds the maximum of {MAX_OFFSCREEN_BUFFERS}"
            )));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("Log level cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Runtime settings for a host built from this configuration
    pub fn host_settings(&self) -> FrameHostSettings {
        FrameHostSettings {
            prefer_gles3: self.renderer.prefer_gles3,
            offscreen_buffer_count: self.presentation.offscreen_buffer_count,
        }
    }
}

impl Config for BridgeConfig {}
