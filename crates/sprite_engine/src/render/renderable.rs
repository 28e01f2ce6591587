//! Drawable and shader capabilities
//!
//! A node becomes drawable by carrying a [`Renderable`]: a shader reference
//! paired with a function that serializes the node into a shared instance
//! buffer. Shaders are external collaborators; the batcher only relies on
//! their identity and the three frame hooks.

use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::collections::NodeId;
use crate::foundation::math::{Mat3, Vec2};
use crate::foundation::memory::MatrixPool;
use crate::render::camera::FrameUniform;
use crate::render::error::{RenderError, RenderResult};
use crate::scene::SceneGraph;

/// Shader shared between every drawable that uses it
pub type SharedShader = Rc<RefCell<dyn Shader>>;

/// Identity of a shared shader, used as the pipeline key.
///
/// Two drawables land in the same pipeline only when they reference the
/// same shader allocation; structurally equal shaders stay separate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderKey(usize);

impl ShaderKey {
    /// Key of a shared shader
    pub fn of(shader: &SharedShader) -> Self {
        Self(Rc::as_ptr(shader).cast::<()>() as usize)
    }
}

/// GPU pipeline capability consumed by the frame renderer
pub trait Shader {
    /// Name used in diagnostics and capacity errors
    fn name(&self) -> &str;

    /// Called once per frame, before any batch, with the frame uniform
    fn start_frame(&mut self, uniform: &FrameUniform);

    /// Pack and draw one pipeline's nodes.
    ///
    /// Implementations reject batches over their instance capacity with
    /// [`crate::render::CapacityError::ShaderLimit`], write every node at
    /// successive offsets (see [`crate::render::InstanceBuffer::pack`]),
    /// upload the written region, issue an instanced draw, and return the
    /// number of draw calls issued.
    fn process_batch(&mut self, batch: &mut BatchContext<'_>) -> RenderResult<usize>;

    /// Called once per frame after every batch
    fn end_frame(&mut self);
}

/// Drawable capability attached to a scene node
pub trait Renderable {
    /// Shader this drawable is batched under
    fn shader(&self) -> &SharedShader;

    /// Write this node's instance data into `buffer` starting at float
    /// `offset`, returning the number of instances written.
    fn write_instance(
        &self,
        ctx: &mut InstanceContext<'_>,
        buffer: &mut [f32],
        offset: usize,
    ) -> RenderResult<usize>;

    /// Instances [`Renderable::write_instance`] produces
    fn instance_count(&self) -> usize {
        1
    }

    /// Whether the owning node must have a size
    fn requires_size(&self) -> bool {
        true
    }

    /// Debug description used by snapshots
    fn describe(&self) -> String;
}

/// Per-node inputs available to [`Renderable::write_instance`]
pub struct InstanceContext<'a> {
    /// Node being written
    pub node: NodeId,
    /// World matrix of the node (size not applied)
    pub matrix: Mat3,
    /// Own size of the node
    pub size: Option<Vec2>,
    /// Effective layer of the node
    pub layer: i32,
    /// Frame scratch matrices
    pub pool: &'a mut MatrixPool,
}

/// Borrow `len` floats of `buffer` at `offset`, failing instead of panicking
pub fn instance_slice(buffer: &mut [f32], offset: usize, len: usize) -> RenderResult<&mut [f32]> {
    let buffer_len = buffer.len();
    offset
        .checked_add(len)
        .and_then(|end| buffer.get_mut(offset..end))
        .ok_or(RenderError::BufferOverflow {
            offset,
            needed: len,
            len: buffer_len,
        })
}

/// One pipeline's worth of nodes handed to [`Shader::process_batch`]
pub struct BatchContext<'a> {
    scene: &'a SceneGraph,
    nodes: &'a [NodeId],
    pool: &'a mut MatrixPool,
}

impl<'a> BatchContext<'a> {
    /// Create a batch over `nodes`
    pub fn new(scene: &'a SceneGraph, nodes: &'a [NodeId], pool: &'a mut MatrixPool) -> Self {
        Self { scene, nodes, pool }
    }

    /// Nodes in draw order
    pub fn nodes(&self) -> &[NodeId] {
        self.nodes
    }

    /// Number of nodes in the batch
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the batch is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Scene the nodes belong to
    pub fn scene(&self) -> &SceneGraph {
        self.scene
    }

    /// Total instances the batch expands to
    pub fn instance_count(&self) -> RenderResult<usize> {
        let mut total = 0;
        for &id in self.nodes {
            if let Some(renderable) = self.scene.get(id)?.renderable() {
                total = renderable.instance_count().saturating_add(total);
            }
        }
        Ok(total)
    }

    /// Write node `index` of the batch at float `offset`, returning its instance count.
    ///
    /// Fails when the drawable writes a different count than it declares.
    pub fn write_node(
        &mut self,
        index: usize,
        buffer: &mut [f32],
        offset: usize,
    ) -> RenderResult<usize> {
        let Some(&id) = self.nodes.get(index) else {
            return Ok(0);
        };
        let scene = self.scene;
        let node = scene.get(id)?;
        let Some(renderable) = node.renderable() else {
            return Ok(0);
        };

        let mut ctx = InstanceContext {
            node: id,
            matrix: scene.matrix(id)?,
            size: node.size(),
            layer: scene.layer(id)?,
            pool: &mut *self.pool,
        };
        let declared = renderable.instance_count();
        let written = renderable.write_instance(&mut ctx, buffer, offset)?;
        if written != declared {
            return Err(RenderError::InstanceCountMismatch { node: id, declared, written });
        }
        Ok(written)
    }
}
