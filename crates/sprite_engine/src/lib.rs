//! # Sprite Engine
//!
//! A retained-mode 2D scene graph with a per-frame draw-call batcher.
//!
//! ## Features
//!
//! - **Scene Graph**: Arena-backed node tree with cached world transforms and bounds
//! - **Batching**: Layer-ordered, shader-grouped instanced submission
//! - **Instance Packing**: Fixed-stride CPU buffers ready for GPU upload
//! - **Snapshots**: Portable RON snapshots of scene structure
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sprite_engine::prelude::*;
//!
//! fn frame(scene: &SceneGraph, root: NodeId, renderer: &mut FrameRenderer) -> RenderResult<()> {
//!     renderer.start_frame();
//!     renderer.draw(scene, root)?;
//!     let stats = renderer.end_frame(scene)?;
//!     log::info!("{} draw calls", stats.draw_calls);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc
)]

// Core configuration
pub mod core;

pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::{Config, ConfigError, RendererConfig, SceneConfig},
        foundation::math::{Mat3, Mat3Ext, Point2, Transform2D, Vec2},
        render::{
            AtlasLookup, BatchContext, Camera, CapacityError, FixedCamera, FrameRenderer,
            FrameState, FrameStats, FrameUniform, InstanceBuffer, InstanceContext, OrthoCamera,
            RenderError, RenderResult, Renderable, Shader, SharedShader, Sprite, SpriteFlip,
            TiledSprite, UvRect, SPRITE_STRIDE,
        },
        scene::{
            Bounds, BoundsEdit, NodeDesc, NodeId, NodeSnapshot, SceneError, SceneGraph,
            SceneResult,
        },
    };
}
