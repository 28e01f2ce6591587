//! # Batch Renderer
//!
//! Enumerates the drawable nodes of a scene each frame and groups them for
//! instanced drawing with as few pipeline switches as possible.
//!
//! ## Architecture
//!
//! - **Batcher**: Depth-first collection of active drawables
//! - **Layer**: Explicit draw-order group, kept sorted ascending
//! - **Pipeline**: Nodes of one layer sharing one shader, in traversal order
//!
//! Layers are submitted as independent draws in ascending order. Within a
//! layer, pipelines keep first-seen order and each becomes one instanced call.

use crate::foundation::collections::NodeId;
use crate::render::renderable::{ShaderKey, SharedShader};
use crate::scene::{SceneGraph, SceneResult};

/// Nodes of one layer that share one shader
pub struct Pipeline {
    shader: SharedShader,
    key: ShaderKey,
    nodes: Vec<NodeId>,
}

impl Pipeline {
    fn new(shader: SharedShader) -> Self {
        let key = ShaderKey::of(&shader);
        Self {
            shader,
            key,
            nodes: Vec::new(),
        }
    }

    /// Shader every node in this pipeline draws with
    pub fn shader(&self) -> &SharedShader {
        &self.shader
    }

    /// Identity of the shader
    pub fn key(&self) -> ShaderKey {
        self.key
    }

    /// Nodes in traversal order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

/// Pipelines sharing one effective layer value
pub struct Layer {
    z: i32,
    pipelines: Vec<Pipeline>,
}

impl Layer {
    fn new(z: i32) -> Self {
        Self {
            z,
            pipelines: Vec::new(),
        }
    }

    /// Numeric layer value
    pub fn z(&self) -> i32 {
        self.z
    }

    /// Pipelines in first-seen order
    pub fn pipelines(&self) -> &[Pipeline] {
        &self.pipelines
    }

    fn push(&mut self, shader: &SharedShader, node: NodeId) {
        let key = ShaderKey::of(shader);
        let index = match self.pipelines.iter().position(|p| p.key == key) {
            Some(index) => index,
            None => {
                self.pipelines.push(Pipeline::new(shader.clone()));
                self.pipelines.len() - 1
            }
        };
        self.pipelines[index].nodes.push(node);
    }
}

/// Per-frame collection of drawables grouped by (layer, shader)
#[derive(Default)]
pub struct Batcher {
    nodes: Vec<NodeId>,
    layers: Vec<Layer>,
    pipeline_count: usize,
}

impl Batcher {
    /// Create an empty batcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every active drawable under `root`, pre-order.
    ///
    /// Inactive nodes are skipped together with their subtree. Nodes without
    /// a drawable are visited as containers. Returns the number of drawables
    /// added by this call.
    pub fn enqueue(&mut self, scene: &SceneGraph, root: NodeId) -> SceneResult<usize> {
        let before = self.nodes.len();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if !scene.is_active(id)? {
                log::trace!("Skipping inactive subtree at {:?}", id);
                continue;
            }

            let node = scene.get(id)?;
            if let Some(renderable) = node.renderable() {
                let z = scene.layer(id)?;
                self.nodes.push(id);
                self.push(z, renderable.shader(), id);
            }

            // Reversed so the first child is visited next
            stack.extend(node.children().iter().rev().copied());
        }

        Ok(self.nodes.len() - before)
    }

    fn push(&mut self, z: i32, shader: &SharedShader, node: NodeId) {
        let index = match self.layers.binary_search_by_key(&z, |layer| layer.z) {
            Ok(index) => index,
            Err(index) => {
                self.layers.insert(index, Layer::new(z));
                index
            }
        };

        let layer = &mut self.layers[index];
        let pipelines_before = layer.pipelines.len();
        layer.push(shader, node);
        self.pipeline_count += layer.pipelines.len() - pipelines_before;
    }

    /// Every enqueued drawable in traversal order
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of enqueued drawables
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Layers sorted ascending by value
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Pipelines across all layers, in submission order
    pub fn pipelines(&self) -> impl Iterator<Item = &Pipeline> {
        self.layers.iter().flat_map(|layer| layer.pipelines.iter())
    }

    /// Total number of pipelines across all layers
    pub fn pipeline_count(&self) -> usize {
        self.pipeline_count
    }

    /// Every distinct shader referenced this frame, in first-submission order
    pub fn distinct_shaders(&self) -> Vec<SharedShader> {
        let mut seen: Vec<ShaderKey> = Vec::new();
        let mut shaders = Vec::new();
        for pipeline in self.pipelines() {
            if !seen.contains(&pipeline.key) {
                seen.push(pipeline.key);
                shaders.push(pipeline.shader.clone());
            }
        }
        shaders
    }

    /// Check if nothing has been enqueued
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop all collected state for the next frame
    pub fn flush(&mut self) {
        self.nodes.clear();
        self.layers.clear();
        self.pipeline_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{recording_shader, TestQuad};
    use crate::scene::NodeDesc;

    #[test]
    fn test_container_root_still_visits_children() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let a = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader))).unwrap();
        let b = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader))).unwrap();
        let root = scene.create(NodeDesc::new().children([a, b])).unwrap();

        let mut batcher = Batcher::new();
        assert_eq!(batcher.enqueue(&scene, root).unwrap(), 2);
        assert_eq!(batcher.nodes(), &[a, b]);
    }

    #[test]
    fn test_inactive_subtrees_are_skipped() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let leaf = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader))).unwrap();
        let middle = scene
            .create(NodeDesc::new().renderable(TestQuad::new(&shader)).children([leaf]))
            .unwrap();
        let root = scene.create(NodeDesc::new().children([middle])).unwrap();

        let mut batcher = Batcher::new();
        scene.set_active(middle, false).unwrap();
        assert_eq!(batcher.enqueue(&scene, root).unwrap(), 0);

        scene.set_active(middle, true).unwrap();
        scene.set_active(root, false).unwrap();
        assert_eq!(batcher.enqueue(&scene, root).unwrap(), 0);
        assert!(batcher.is_empty());
    }

    #[test]
    fn test_preorder_traversal() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let quad = |scene: &mut SceneGraph, label: &str| {
            scene
                .create(NodeDesc::new().label(label).renderable(TestQuad::new(&shader)))
                .unwrap()
        };
        let root = quad(&mut scene, "root");
        let child_a = quad(&mut scene, "childA");
        let child_b = quad(&mut scene, "childB");
        let grandchild = quad(&mut scene, "grandchild");
        scene.add(root, child_a).unwrap();
        scene.add(root, child_b).unwrap();
        scene.add(child_a, grandchild).unwrap();

        let mut batcher = Batcher::new();
        batcher.enqueue(&scene, root).unwrap();
        assert_eq!(batcher.nodes(), &[root, child_a, grandchild, child_b]);
    }

    #[test]
    fn test_sequential_enqueues_concatenate() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let first = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader))).unwrap();
        let second = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader))).unwrap();

        let mut batcher = Batcher::new();
        batcher.enqueue(&scene, second).unwrap();
        batcher.enqueue(&scene, first).unwrap();
        assert_eq!(batcher.nodes(), &[second, first]);
        assert_eq!(batcher.pipeline_count(), 1);
        assert_eq!(batcher.layers()[0].pipelines()[0].nodes(), &[second, first]);
    }

    #[test]
    fn test_grouping_by_layer_and_shader_identity() {
        let shader_a = recording_shader("same");
        let shader_b = recording_shader("same");
        let mut scene = SceneGraph::new();
        let a = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader_a))).unwrap();
        let b = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader_b))).unwrap();

        let mut batcher = Batcher::new();
        batcher.enqueue(&scene, a).unwrap();
        batcher.enqueue(&scene, b).unwrap();
        assert_eq!(batcher.layers().len(), 1);
        assert_eq!(batcher.pipeline_count(), 2);
        assert_eq!(batcher.distinct_shaders().len(), 2);

        batcher.flush();
        scene.set_layer(a, Some(1)).unwrap();
        batcher.enqueue(&scene, a).unwrap();
        batcher.enqueue(&scene, b).unwrap();

        let layers: Vec<i32> = batcher.layers().iter().map(Layer::z).collect();
        assert_eq!(layers, vec![0, 1]);
        assert_eq!(batcher.layers()[0].pipelines()[0].nodes(), &[b]);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let node = scene.create(NodeDesc::new().renderable(TestQuad::new(&shader))).unwrap();

        let mut batcher = Batcher::new();
        batcher.enqueue(&scene, node).unwrap();
        batcher.flush();
        batcher.flush();

        assert!(batcher.is_empty());
        assert!(batcher.layers().is_empty());
        assert_eq!(batcher.pipelines().count(), 0);
    }
}
