//! Render error types

use crate::foundation::collections::NodeId;
use crate::scene::SceneError;

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Instance capacity violations.
///
/// Fatal to the remainder of the current frame; frame cleanup still runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapacityError {
    /// More drawables were enqueued than the global per-frame limit
    #[error("Frame instance limit exceeded: {requested} enqueued > {limit} allowed")]
    FrameLimit {
        /// Number of drawables enqueued this frame
        requested: usize,
        /// Configured per-frame limit
        limit: usize,
    },

    /// A batch needs more instances than a shader's preallocated buffer holds
    #[error("Shader '{shader}' instance capacity exceeded: {requested} > {capacity}")]
    ShaderLimit {
        /// Name of the rejecting shader
        shader: String,
        /// Instances the batch would write
        requested: usize,
        /// Preallocated instance capacity
        capacity: usize,
    },
}

/// Errors that can occur while batching or submitting a frame
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Instance capacity violation
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// Scene lookup failure during traversal
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// A drawable wrote past the end of the instance buffer
    #[error("Instance write of {needed} floats at offset {offset} overflows buffer of {len}")]
    BufferOverflow {
        /// Float offset of the write
        offset: usize,
        /// Floats the write needed
        needed: usize,
        /// Buffer length in floats
        len: usize,
    },

    /// A drawable wrote a different number of instances than it declared
    #[error("Node {node:?} wrote {written} instances but declared {declared}")]
    InstanceCountMismatch {
        /// Node whose drawable misreported
        node: NodeId,
        /// Value of `instance_count`
        declared: usize,
        /// Value returned by `write_instance`
        written: usize,
    },

    /// Atlas frame could not be resolved
    #[error("Atlas has no region named '{0}'")]
    MissingRegion(String),

    /// Shader-specific failure
    #[error("Shader error: {0}")]
    Shader(String),
}

impl RenderError {
    /// Check whether this is a capacity error
    pub fn is_capacity(&self) -> bool {
        matches!(self, Self::Capacity(_))
    }
}
