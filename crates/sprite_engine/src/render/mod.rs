//! # Render Module
//!
//! Batching and frame submission for scene drawables.
//!
//! ## Architecture
//!
//! ```text
//! FrameRenderer ──draw──▶ Batcher ──layers──▶ Shader::process_batch
//!       │                                          │
//!       └── Camera ──▶ FrameUniform                └── InstanceBuffer
//! ```
//!
//! GPU execution stays behind the [`Shader`] capability. Drawables such as
//! [`Sprite`] serialize themselves through [`Renderable::write_instance`].

pub mod batch_renderer;
pub mod camera;
pub mod error;
pub mod frame;
pub mod instance;
pub mod renderable;
pub mod sprite;

#[cfg(test)]
pub(crate) mod tests;

pub use batch_renderer::{Batcher, Layer, Pipeline};
pub use camera::{Camera, FixedCamera, FrameUniform, OrthoCamera};
pub use error::{CapacityError, RenderError, RenderResult};
pub use frame::{FrameRenderer, FrameState, FrameStats};
pub use instance::InstanceBuffer;
pub use renderable::{
    instance_slice, BatchContext, InstanceContext, Renderable, Shader, ShaderKey, SharedShader,
};
pub use sprite::{AtlasLookup, Sprite, SpriteFlip, TiledSprite, UvRect, SPRITE_STRIDE};
