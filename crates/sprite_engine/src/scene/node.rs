//! Scene node data and construction descriptors

use std::cell::Cell;
use std::fmt;

use crate::foundation::collections::NodeId;
use crate::foundation::math::{utils, Mat3, Transform2D, Vec2};
use crate::render::Renderable;
use crate::scene::Bounds;

/// Cached values derived from the node's ancestor chain.
///
/// Cleared as a unit by [`crate::scene::SceneGraph::set_dirty`].
#[derive(Debug, Default)]
pub(crate) struct NodeCache {
    pub(crate) matrix: Cell<Option<Mat3>>,
    pub(crate) bounds: Cell<Option<Bounds>>,
    pub(crate) layer: Cell<Option<i32>>,
    pub(crate) active: Cell<Option<bool>>,
}

impl NodeCache {
    pub(crate) fn clear(&self) {
        self.matrix.set(None);
        self.bounds.set(None);
        self.layer.set(None);
        self.active.set(None);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.matrix.get().is_none()
            && self.bounds.get().is_none()
            && self.layer.get().is_none()
            && self.active.get().is_none()
    }
}

/// One element of the scene tree.
///
/// Nodes are owned by a [`crate::scene::SceneGraph`] and mutated through it,
/// so cache invalidation always reaches the whole subtree.
pub struct Node {
    pub(crate) id: u64,
    pub(crate) label: Option<String>,
    pub(crate) transform: Transform2D,
    pub(crate) size: Option<Vec2>,
    pub(crate) layer: Option<i32>,
    pub(crate) active: bool,
    pub(crate) renderable: Option<Box<dyn Renderable>>,
    pub(crate) kids: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) deleted: bool,
    pub(crate) cache: NodeCache,
}

impl Node {
    pub(crate) fn new(id: u64, transform: Transform2D, size: Option<Vec2>) -> Self {
        Self {
            id,
            label: None,
            transform,
            size,
            layer: None,
            active: true,
            renderable: None,
            kids: Vec::new(),
            parent: None,
            deleted: false,
            cache: NodeCache::default(),
        }
    }

    /// Serial id, unique within the owning graph
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Optional debug label
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Local transform relative to the parent
    pub fn transform(&self) -> &Transform2D {
        &self.transform
    }

    /// Local position
    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Local scale
    pub fn scale(&self) -> Vec2 {
        self.transform.scale
    }

    /// Local rotation in degrees
    pub fn rotation(&self) -> f32 {
        utils::rad_to_deg(self.transform.rotation)
    }

    /// Local rotation in radians
    pub fn rotation_radians(&self) -> f32 {
        self.transform.rotation
    }

    /// Own size, not inherited by children
    pub fn size(&self) -> Option<Vec2> {
        self.size
    }

    /// Explicit layer, `None` when inherited
    pub fn own_layer(&self) -> Option<i32> {
        self.layer
    }

    /// Own activity flag, ignoring ancestors
    pub fn own_active(&self) -> bool {
        self.active
    }

    /// Drawable capability, `None` for pure grouping nodes
    pub fn renderable(&self) -> Option<&dyn Renderable> {
        self.renderable.as_deref()
    }

    /// Children in draw order
    pub fn children(&self) -> &[NodeId] {
        &self.kids
    }

    /// Parent handle, `None` at a root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the node has been torn down by `delete`
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn local_matrix(&self) -> Mat3 {
        self.transform.to_matrix()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("transform", &self.transform)
            .field("size", &self.size)
            .field("layer", &self.layer)
            .field("active", &self.active)
            .field("renderable", &self.renderable.as_ref().map(|r| r.describe()))
            .field("kids", &self.kids)
            .field("parent", &self.parent)
            .field("deleted", &self.deleted)
            .finish()
    }
}

/// Size specification for a new node
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SizeSpec {
    /// Use the graph's configured default size
    #[default]
    Default,
    /// Explicit size
    Fixed(Vec2),
    /// No size; the node is a pure transform group
    Unset,
}

/// Construction descriptor for [`crate::scene::SceneGraph::create`]
#[derive(Default)]
pub struct NodeDesc {
    pub(crate) label: Option<String>,
    pub(crate) position: Vec2,
    pub(crate) scale: Option<Vec2>,
    pub(crate) rotation: Option<f32>,
    pub(crate) rotation_radians: Option<f32>,
    pub(crate) size: SizeSpec,
    pub(crate) layer: Option<i32>,
    pub(crate) active: Option<bool>,
    pub(crate) renderable: Option<Box<dyn Renderable>>,
    pub(crate) children: Vec<NodeId>,
}

impl NodeDesc {
    /// Create an empty descriptor (identity transform, default size)
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: Set debug label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Builder pattern: Set position
    pub fn position(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    /// Builder pattern: Set scale
    pub fn scale(mut self, x: f32, y: f32) -> Self {
        self.scale = Some(Vec2::new(x, y));
        self
    }

    /// Builder pattern: Set rotation in degrees
    pub fn rotation(mut self, degrees: f32) -> Self {
        self.rotation = Some(degrees);
        self
    }

    /// Builder pattern: Set rotation in radians
    pub fn rotation_radians(mut self, radians: f32) -> Self {
        self.rotation_radians = Some(radians);
        self
    }

    /// Builder pattern: Set size
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.size = SizeSpec::Fixed(Vec2::new(width, height));
        self
    }

    /// Builder pattern: Create the node without a size
    pub fn without_size(mut self) -> Self {
        self.size = SizeSpec::Unset;
        self
    }

    /// Builder pattern: Set explicit layer
    pub fn layer(mut self, layer: i32) -> Self {
        self.layer = Some(layer);
        self
    }

    /// Builder pattern: Set own activity flag
    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Builder pattern: Attach a drawable capability
    pub fn renderable(mut self, renderable: impl Renderable + 'static) -> Self {
        self.renderable = Some(Box::new(renderable));
        self
    }

    /// Builder pattern: Attach an already boxed drawable capability
    pub fn boxed_renderable(mut self, renderable: Box<dyn Renderable>) -> Self {
        self.renderable = Some(renderable);
        self
    }

    /// Builder pattern: Adopt existing nodes as children, in order
    pub fn children(mut self, children: impl IntoIterator<Item = NodeId>) -> Self {
        self.children.extend(children);
        self
    }
}
