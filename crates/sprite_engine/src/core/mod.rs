//! # Core Engine Module
//!
//! Shared configuration types used by the scene and render subsystems.
//!
//! ## Organization
//!
//! - **Config**: Scene and renderer configuration
//! - **Foundation**: Low-level utilities (math, collections, memory, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{Config, ConfigError, RendererConfig, SceneConfig};
