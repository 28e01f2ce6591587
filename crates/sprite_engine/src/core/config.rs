//! # Unified Configuration System
//!
//! Configuration for the scene graph and the frame renderer. Both types
//! implement [`Config`], so they can be loaded from TOML or RON files.

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// Default global per-frame instance limit
pub const DEFAULT_MAX_INSTANCES_PER_FRAME: usize = 2048;

/// Default number of preallocated scratch matrices
pub const DEFAULT_SCRATCH_POOL_CAPACITY: usize = 256;

/// # Renderer Configuration
///
/// Capacity and diagnostics settings for [`crate::render::FrameRenderer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum number of drawable nodes enqueued in a single frame
    pub max_instances_per_frame: usize,
    /// Scratch matrices preallocated for size/flip adjusted draws
    pub scratch_pool_capacity: usize,
    /// Log per-frame diagnostics at info level instead of debug
    pub log_frame_stats: bool,
}

impl RendererConfig {
    /// Set the global per-frame instance limit
    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_instances_per_frame = max;
        self
    }

    /// Set the scratch pool capacity
    pub fn with_scratch_pool_capacity(mut self, capacity: usize) -> Self {
        self.scratch_pool_capacity = capacity;
        self
    }

    /// Enable or disable per-frame stat logging
    pub fn with_frame_stats_logging(mut self, enabled: bool) -> Self {
        self.log_frame_stats = enabled;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_instances_per_frame: DEFAULT_MAX_INSTANCES_PER_FRAME,
            scratch_pool_capacity: DEFAULT_SCRATCH_POOL_CAPACITY,
            log_frame_stats: false,
        }
    }
}

impl Config for RendererConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_instances_per_frame == 0 {
            return Err(ConfigError::Invalid(
                "max_instances_per_frame must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// # Scene Configuration
///
/// Defaults applied when nodes are created without explicit values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Size given to nodes that do not specify one
    pub default_size: [f32; 2],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            default_size: [1.0, 1.0],
        }
    }
}

impl Config for SceneConfig {}
