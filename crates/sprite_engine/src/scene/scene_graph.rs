//! Scene graph arena
//!
//! Owns every node, the parent/child links between them, and the serial id
//! counter. Derived state (world matrix, bounds, effective layer and activity)
//! is computed lazily and cached per node; every mutation clears the cache of
//! the mutated node and, eagerly and depth-first, of its whole subtree.

use crate::core::config::SceneConfig;
use crate::foundation::collections::{NodeId, NodeMap, SerialCounter};
use crate::foundation::math::{utils, Mat3, Mat3Ext, Transform2D, Vec2};
use crate::render::Renderable;
use crate::scene::node::{Node, NodeDesc, SizeSpec};
use crate::scene::{Bounds, BoundsEdit};

/// Result type for scene graph operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Errors raised by invalid scene mutations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SceneError {
    /// `remove` was called with a node that is not a child of the parent
    #[error("Node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Node that was asked to be removed
        child: NodeId,
        /// Node it was supposed to be removed from
        parent: NodeId,
    },

    /// Both degree and radian rotations were given at construction
    #[error("Rotation may be specified in degrees or radians, not both")]
    ConflictingRotation,

    /// A drawable requires a size but the node has none.
    ///
    /// The handle is `None` when the node was rejected during construction.
    #[error("Drawable requires a size but node {0:?} has none")]
    MissingSize(Option<NodeId>),

    /// The handle does not refer to a node in this graph
    #[error("Node {0:?} not found")]
    NodeNotFound(NodeId),

    /// The node was torn down by `delete` and can no longer be linked
    #[error("Node {0:?} has been deleted")]
    Deleted(NodeId),

    /// Adding the child would make a node its own ancestor
    #[error("Adding {child:?} under {parent:?} would create a cycle")]
    WouldCycle {
        /// Node being added
        child: NodeId,
        /// Requested new parent
        parent: NodeId,
    },

    /// An edge setter needed to invert a degenerate parent transform
    #[error("Parent transform of node {0:?} is not invertible")]
    SingularTransform(NodeId),
}

/// Arena of scene nodes
pub struct SceneGraph {
    nodes: NodeMap<Node>,
    serials: SerialCounter,
    config: SceneConfig,
}

impl SceneGraph {
    /// Create an empty graph with default configuration
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    /// Create an empty graph with custom configuration
    pub fn with_config(config: SceneConfig) -> Self {
        Self {
            nodes: NodeMap::with_key(),
            serials: SerialCounter::new(),
            config,
        }
    }

    /// Create a node from a descriptor, adopting its listed children
    pub fn create(&mut self, desc: NodeDesc) -> SceneResult<NodeId> {
        let rotation = match (desc.rotation, desc.rotation_radians) {
            (Some(_), Some(_)) => return Err(SceneError::ConflictingRotation),
            (Some(degrees), None) => utils::deg_to_rad(degrees),
            (None, Some(radians)) => radians,
            (None, None) => 0.0,
        };
        let size = match desc.size {
            SizeSpec::Default => Some(Vec2::from(self.config.default_size)),
            SizeSpec::Fixed(size) => Some(size),
            SizeSpec::Unset => None,
        };
        if size.is_none() && desc.renderable.as_ref().is_some_and(|r| r.requires_size()) {
            return Err(SceneError::MissingSize(None));
        }
        for &child in &desc.children {
            self.live(child)?;
        }

        let transform = Transform2D {
            position: desc.position,
            rotation,
            scale: desc.scale.unwrap_or_else(|| Vec2::new(1.0, 1.0)),
        };
        let mut node = Node::new(self.serials.next(), transform, size);
        node.label = desc.label;
        node.layer = desc.layer;
        node.active = desc.active.unwrap_or(true);
        node.renderable = desc.renderable;

        let id = self.nodes.insert(node);
        log::trace!("Created node {:?}", id);

        for child in desc.children {
            self.add(id, child)?;
        }
        Ok(id)
    }

    /// Access a node
    pub fn get(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Access a node that has not been deleted
    fn live(&self, id: NodeId) -> SceneResult<&Node> {
        match self.get(id)? {
            node if node.deleted => Err(SceneError::Deleted(id)),
            node => Ok(node),
        }
    }

    /// Check whether a handle refers to a node in this graph
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes held by the arena, including deleted tombstones
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live parentless nodes
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none() && !node.deleted)
            .map(|(id, _)| id)
    }

    /// Find a node by its serial id
    pub fn find_by_serial(&self, serial: u64) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.id == serial)
            .map(|(id, _)| id)
    }

    /// Children of a node in draw order
    pub fn children(&self, id: NodeId) -> SceneResult<&[NodeId]> {
        Ok(&self.get(id)?.kids)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> SceneResult<Option<NodeId>> {
        Ok(self.get(id)?.parent)
    }

    // ----------------------------------------------------------------------
    // Hierarchy
    // ----------------------------------------------------------------------

    /// Append `child` under `parent`, detaching it from any previous parent
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> SceneResult<NodeId> {
        self.insert(parent, child, None)
    }

    /// Insert `child` under `parent` at `index` (append when `None`).
    ///
    /// Inserting a node that is already a child relocates it.
    pub fn insert(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: Option<usize>,
    ) -> SceneResult<NodeId> {
        let leaf = self.live(child)?.kids.is_empty();
        self.live(parent)?;

        // A childless node can only be its own ancestor
        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::WouldCycle { child, parent });
            }
            ancestor = if leaf { None } else { self.get(current)?.parent };
        }

        self.detach(child);

        let kids = &mut self.get_mut(parent)?.kids;
        let at = index.map_or(kids.len(), |i| i.min(kids.len()));
        kids.insert(at, child);
        self.get_mut(child)?.parent = Some(parent);

        self.set_dirty(child)?;
        Ok(child)
    }

    /// Detach `child` from `parent` without deactivating it
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        if self.get(child)?.parent != Some(parent) {
            return Err(SceneError::NotAChild { child, parent });
        }
        self.detach(child);
        self.set_dirty(child)
    }

    /// Unlink a node from its parent's child list, if any
    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.nodes.get(child).and_then(|node| node.parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.kids.retain(|&kid| kid != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
        }
    }

    /// Detach a node and tear down its entire subtree.
    ///
    /// Every node in the subtree ends inactive, childless, without an explicit
    /// layer and without a drawable. Torn-down nodes stay queryable until
    /// [`SceneGraph::sweep`] releases them, but can no longer be linked.
    pub fn delete(&mut self, id: NodeId) -> SceneResult<()> {
        self.get(id)?;
        self.detach(id);
        self.teardown(id);
        self.set_dirty(id)
    }

    fn teardown(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get_mut(current) else {
                continue;
            };
            stack.append(&mut node.kids);
            node.parent = None;
            node.active = false;
            node.layer = None;
            node.renderable = None;
            node.deleted = true;
            node.cache.clear();
        }
    }

    /// Release every deleted node from the arena, returning how many were freed.
    ///
    /// Live nodes never keep a link to a released node.
    pub fn sweep(&mut self) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| !node.deleted);
        let freed = before - self.nodes.len();
        if freed == 0 {
            return 0;
        }

        let nodes = &self.nodes;
        let stale: Vec<NodeId> = nodes
            .iter()
            .filter(|(_, node)| {
                node.parent.is_some_and(|parent| !nodes.contains_key(parent))
                    || node.kids.iter().any(|&kid| !nodes.contains_key(kid))
            })
            .map(|(id, _)| id)
            .collect();
        for id in stale {
            log::warn!("Unlinking swept nodes from {:?}", id);
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            let kids: Vec<NodeId> = node
                .kids
                .iter()
                .copied()
                .filter(|&kid| self.nodes.contains_key(kid))
                .collect();
            let parent = node.parent.filter(|&parent| self.nodes.contains_key(parent));
            if let Some(node) = self.nodes.get_mut(id) {
                node.kids = kids;
                node.parent = parent;
            }
            self.clear_subtree(id);
        }

        log::debug!("Swept {} deleted scene nodes", freed);
        freed
    }

    // ----------------------------------------------------------------------
    // Invalidation
    // ----------------------------------------------------------------------

    /// Clear cached derived state on a node and every descendant
    pub fn set_dirty(&self, id: NodeId) -> SceneResult<()> {
        self.get(id)?;
        self.clear_subtree(id);
        Ok(())
    }

    fn clear_subtree(&self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                node.cache.clear();
                stack.extend(node.kids.iter().rev().copied());
            }
        }
    }

    fn mutate(&mut self, id: NodeId, apply: impl FnOnce(&mut Node)) -> SceneResult<()> {
        apply(self.get_mut(id)?);
        self.set_dirty(id)
    }

    // ----------------------------------------------------------------------
    // Property setters
    // ----------------------------------------------------------------------

    /// Set local position
    pub fn set_position(&mut self, id: NodeId, position: Vec2) -> SceneResult<()> {
        self.mutate(id, |node| node.transform.position = position)
    }

    /// Set local scale
    pub fn set_scale(&mut self, id: NodeId, scale: Vec2) -> SceneResult<()> {
        self.mutate(id, |node| node.transform.scale = scale)
    }

    /// Set local rotation in degrees
    pub fn set_rotation(&mut self, id: NodeId, degrees: f32) -> SceneResult<()> {
        self.set_rotation_radians(id, utils::deg_to_rad(degrees))
    }

    /// Set local rotation in radians
    pub fn set_rotation_radians(&mut self, id: NodeId, radians: f32) -> SceneResult<()> {
        self.mutate(id, |node| node.transform.rotation = radians)
    }

    /// Set or clear the node's own size
    pub fn set_size(&mut self, id: NodeId, size: Option<Vec2>) -> SceneResult<()> {
        let node = self.get(id)?;
        if size.is_none() && node.renderable.as_ref().is_some_and(|r| r.requires_size()) {
            return Err(SceneError::MissingSize(Some(id)));
        }
        self.mutate(id, |node| node.size = size)
    }

    /// Set or clear the explicit layer
    pub fn set_layer(&mut self, id: NodeId, layer: Option<i32>) -> SceneResult<()> {
        self.mutate(id, |node| node.layer = layer)
    }

    /// Set the node's own activity flag
    pub fn set_active(&mut self, id: NodeId, active: bool) -> SceneResult<()> {
        self.mutate(id, |node| node.active = active)
    }

    /// Set or clear the debug label
    pub fn set_label(&mut self, id: NodeId, label: Option<String>) -> SceneResult<()> {
        self.get_mut(id)?.label = label;
        Ok(())
    }

    /// Attach, replace or clear the drawable capability
    pub fn set_renderable(
        &mut self,
        id: NodeId,
        renderable: Option<Box<dyn Renderable>>,
    ) -> SceneResult<()> {
        let node = self.get_mut(id)?;
        if node.size.is_none() && renderable.as_ref().is_some_and(|r| r.requires_size()) {
            return Err(SceneError::MissingSize(Some(id)));
        }
        node.renderable = renderable;
        Ok(())
    }

    // ----------------------------------------------------------------------
    // Derived state
    // ----------------------------------------------------------------------

    /// Effective layer: own explicit value, else nearest explicit ancestor, else 0
    pub fn layer(&self, id: NodeId) -> SceneResult<i32> {
        if let Some(layer) = self.get(id)?.cache.layer.get() {
            return Ok(layer);
        }
        let chain = self.chain_up(id, |node| {
            node.cache.layer.get().is_some() || node.layer.is_some()
        })?;

        let mut layer = 0;
        for node in chain.iter().rev() {
            layer = node.cache.layer.get().or(node.layer).unwrap_or(layer);
            node.cache.layer.set(Some(layer));
        }
        Ok(layer)
    }

    /// Effective activity: own flag AND every ancestor's own flag
    pub fn is_active(&self, id: NodeId) -> SceneResult<bool> {
        if let Some(active) = self.get(id)?.cache.active.get() {
            return Ok(active);
        }
        let chain = self.chain_up(id, |node| node.cache.active.get().is_some())?;

        let mut active = true;
        for node in chain.iter().rev() {
            active = node.cache.active.get().unwrap_or(node.active && active);
            node.cache.active.set(Some(active));
        }
        Ok(active)
    }

    /// World matrix: parent's world matrix composed with the local transform
    pub fn matrix(&self, id: NodeId) -> SceneResult<Mat3> {
        if let Some(matrix) = self.get(id)?.cache.matrix.get() {
            return Ok(matrix);
        }
        let chain = self.chain_up(id, |node| node.cache.matrix.get().is_some())?;

        let mut matrix = Mat3::identity();
        for node in chain.iter().rev() {
            matrix = match node.cache.matrix.get() {
                Some(cached) => cached,
                None => matrix * node.local_matrix(),
            };
            node.cache.matrix.set(Some(matrix));
        }
        Ok(matrix)
    }

    /// Nodes from `id` up to the first ancestor where `stop` holds, or the root.
    ///
    /// Derived values are filled top-down along the returned chain, so every
    /// ancestor of a cached node ends up cached as well.
    fn chain_up(&self, id: NodeId, stop: impl Fn(&Node) -> bool) -> SceneResult<Vec<&Node>> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(next) = current {
            let node = self.get(next)?;
            chain.push(node);
            current = if stop(node) { None } else { node.parent };
        }
        Ok(chain)
    }

    /// World-space bounds of the node's own size rectangle
    pub fn bounds(&self, id: NodeId) -> SceneResult<Bounds> {
        let node = self.get(id)?;
        if let Some(bounds) = node.cache.bounds.get() {
            return Ok(bounds);
        }
        let bounds = Bounds::from_matrix(&self.matrix(id)?, node.size);
        node.cache.bounds.set(Some(bounds));
        Ok(bounds)
    }

    // ----------------------------------------------------------------------
    // World-space placement
    // ----------------------------------------------------------------------

    /// Move the node so its world bounds match the requested edges/center.
    ///
    /// The world delta is carried into local space through the inverse of the
    /// parent's matrix with translation zeroed, since it is a direction.
    pub fn set_bounds(&mut self, id: NodeId, edit: BoundsEdit) -> SceneResult<()> {
        let delta = edit.delta_from(&self.bounds(id)?);
        if delta == Vec2::zeros() {
            return Ok(());
        }

        let local_delta = match self.get(id)?.parent {
            Some(parent) => {
                let inverse = self
                    .matrix(parent)?
                    .without_translation()
                    .try_inverse_affine()
                    .ok_or(SceneError::SingularTransform(id))?;
                inverse.transform_vector(&delta)
            }
            None => delta,
        };

        self.mutate(id, |node| node.transform.position += local_delta)
    }

    /// Place the world-space left edge
    pub fn set_left(&mut self, id: NodeId, left: f32) -> SceneResult<()> {
        self.set_bounds(id, BoundsEdit { left: Some(left), ..Default::default() })
    }

    /// Place the world-space right edge
    pub fn set_right(&mut self, id: NodeId, right: f32) -> SceneResult<()> {
        self.set_bounds(id, BoundsEdit { right: Some(right), ..Default::default() })
    }

    /// Place the world-space top edge
    pub fn set_top(&mut self, id: NodeId, top: f32) -> SceneResult<()> {
        self.set_bounds(id, BoundsEdit { top: Some(top), ..Default::default() })
    }

    /// Place the world-space bottom edge
    pub fn set_bottom(&mut self, id: NodeId, bottom: f32) -> SceneResult<()> {
        self.set_bounds(id, BoundsEdit { bottom: Some(bottom), ..Default::default() })
    }

    /// Place the world-space horizontal center
    pub fn set_center_x(&mut self, id: NodeId, x: f32) -> SceneResult<()> {
        self.set_bounds(id, BoundsEdit { x: Some(x), ..Default::default() })
    }

    /// Place the world-space vertical center
    pub fn set_center_y(&mut self, id: NodeId, y: f32) -> SceneResult<()> {
        self.set_bounds(id, BoundsEdit { y: Some(y), ..Default::default() })
    }

    pub(crate) fn serials(&self) -> &SerialCounter {
        &self.serials
    }

    pub(crate) fn serials_mut(&mut self) -> &mut SerialCounter {
        &mut self.serials
    }

    pub(crate) fn insert_node(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
