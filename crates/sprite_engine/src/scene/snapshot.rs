//! Structural snapshots of scene subtrees
//!
//! Snapshots carry only portable state. Drawables usually hold GPU-side
//! handles, so `render` is a debug description and is not restored.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::foundation::collections::NodeId;
use crate::foundation::math::{Transform2D, Vec2};
use crate::scene::node::Node;
use crate::scene::{SceneError, SceneGraph, SceneResult};

/// Serializable local transform and size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    /// Local position
    pub position: [f32; 2],
    /// Local scale
    pub scale: [f32; 2],
    /// Local rotation in radians
    pub rotation: f32,
    /// Own size, `None` for unsized nodes
    pub size: Option<[f32; 2]>,
}

/// Serializable subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Serial id at capture time
    pub id: u64,
    /// Debug label
    pub label: Option<String>,
    /// Local transform
    pub transform: TransformSnapshot,
    /// Explicit layer
    pub layer: Option<i32>,
    /// Own activity flag
    pub is_active: bool,
    /// Children in draw order
    pub kids: Vec<NodeSnapshot>,
    /// Debug description of the drawable, if any
    pub render: Option<String>,
}

impl NodeSnapshot {
    /// Serialize to a RON string
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Parse from a RON string
    pub fn from_ron(source: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(source)
    }

    /// Number of nodes in the snapshot, including this one
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(snapshot) = stack.pop() {
            count += 1;
            stack.extend(&snapshot.kids);
        }
        count
    }
}

impl Drop for NodeSnapshot {
    fn drop(&mut self) {
        // Flatten so deep chains do not drop recursively
        let mut stack = std::mem::take(&mut self.kids);
        while let Some(mut snapshot) = stack.pop() {
            stack.append(&mut snapshot.kids);
        }
    }
}

fn capture(node: &Node, kids: Vec<NodeSnapshot>) -> NodeSnapshot {
    NodeSnapshot {
        id: node.id,
        label: node.label.clone(),
        transform: TransformSnapshot {
            position: node.transform.position.into(),
            scale: node.transform.scale.into(),
            rotation: node.transform.rotation,
            size: node.size.map(Into::into),
        },
        layer: node.layer,
        is_active: node.active,
        kids,
        render: node.renderable.as_ref().map(|r| r.describe()),
    }
}

impl SceneGraph {
    /// Capture the subtree rooted at `id`
    pub fn snapshot(&self, id: NodeId) -> SceneResult<NodeSnapshot> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(&self.get(current)?.kids);
            order.push(current);
        }

        // Reverse pre-order finishes every child before its parent
        let mut done: SecondaryMap<NodeId, NodeSnapshot> = SecondaryMap::new();
        for &current in order.iter().rev() {
            let node = self.get(current)?;
            let kids = node
                .kids
                .iter()
                .map(|&kid| done.remove(kid).ok_or(SceneError::NodeNotFound(kid)))
                .collect::<SceneResult<Vec<_>>>()?;
            done.insert(current, capture(node, kids));
        }
        done.remove(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Rebuild a detached subtree from a snapshot, returning its root.
    ///
    /// Snapshot ids are kept only when none of them has been issued by this
    /// graph yet; otherwise every node gets a fresh id. Drawables are not
    /// restored.
    pub fn restore(&mut self, snapshot: &NodeSnapshot) -> SceneResult<NodeId> {
        let reuse = self.serials_unissued(snapshot);
        let root = self.restore_node(snapshot, reuse);

        let mut stack: Vec<(&NodeSnapshot, NodeId)> =
            snapshot.kids.iter().rev().map(|kid| (kid, root)).collect();
        while let Some((current, parent)) = stack.pop() {
            let id = self.restore_node(current, reuse);
            self.add(parent, id)?;
            stack.extend(current.kids.iter().rev().map(|kid| (kid, id)));
        }
        Ok(root)
    }

    /// Check that every snapshot id is distinct and at or above the next serial
    fn serials_unissued(&self, snapshot: &NodeSnapshot) -> bool {
        let floor = self.serials().peek();
        let mut seen = HashSet::new();
        let mut stack = vec![snapshot];
        while let Some(current) = stack.pop() {
            if current.id < floor || !seen.insert(current.id) {
                return false;
            }
            stack.extend(&current.kids);
        }
        true
    }

    fn restore_node(&mut self, snapshot: &NodeSnapshot, reuse: bool) -> NodeId {
        let serial = if reuse {
            self.serials_mut().advance_past(snapshot.id);
            snapshot.id
        } else {
            self.serials_mut().next()
        };

        let t = &snapshot.transform;
        let transform = Transform2D {
            position: Vec2::from(t.position),
            rotation: t.rotation,
            scale: Vec2::from(t.scale),
        };
        let mut node = Node::new(serial, transform, t.size.map(Vec2::from));
        node.label = snapshot.label.clone();
        node.layer = snapshot.layer;
        node.active = snapshot.is_active;

        if let Some(render) = &snapshot.render {
            log::debug!("Snapshot drawable '{}' on node {} is not restored", render, serial);
        }
        self.insert_node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeDesc;
    use crate::foundation::math::Mat3Ext;
    use approx::assert_relative_eq;

    fn sample(scene: &mut SceneGraph) -> NodeId {
        let leaf = scene
            .create(NodeDesc::new().label("leaf").position(1.0, 2.0).rotation_radians(0.25))
            .unwrap();
        let hidden = scene.create(NodeDesc::new().active(false).without_size()).unwrap();
        scene
            .create(NodeDesc::new().label("root").layer(3).size(8.0, 4.0).children([leaf, hidden]))
            .unwrap()
    }

    #[test]
    fn test_snapshot_structure() {
        let mut scene = SceneGraph::new();
        let root = sample(&mut scene);
        let snapshot = scene.snapshot(root).unwrap();

        assert_eq!(snapshot.node_count(), 3);
        assert_eq!(snapshot.label.as_deref(), Some("root"));
        assert_eq!(snapshot.layer, Some(3));
        assert_eq!(snapshot.kids[0].transform.position, [1.0, 2.0]);
        assert!(!snapshot.kids[1].is_active);
        assert_eq!(snapshot.kids[1].transform.size, None);
    }

    #[test]
    fn test_restore_into_other_graph_keeps_ids() {
        let mut scene = SceneGraph::new();
        let root = sample(&mut scene);
        let text = scene.snapshot(root).unwrap().to_ron().unwrap();

        let parsed = NodeSnapshot::from_ron(&text).unwrap();
        let mut other = SceneGraph::new();
        let restored = other.restore(&parsed).unwrap();

        assert_eq!(other.snapshot(restored).unwrap(), parsed);
        let kids = other.children(restored).unwrap().to_vec();
        assert_eq!(other.parent(kids[0]).unwrap(), Some(restored));
        assert_relative_eq!(other.get(kids[0]).unwrap().rotation_radians(), 0.25);
        assert_eq!(other.layer(kids[0]).unwrap(), 3);

        // New nodes never reuse restored ids
        let fresh = other.create(NodeDesc::new()).unwrap();
        assert!(other.get(fresh).unwrap().id() > parsed.id.max(parsed.kids[1].id));
    }

    #[test]
    fn test_restore_into_same_graph_issues_fresh_ids() {
        let mut scene = SceneGraph::new();
        let root = sample(&mut scene);
        let snapshot = scene.snapshot(root).unwrap();

        let clone = scene.restore(&snapshot).unwrap();
        assert_ne!(scene.get(clone).unwrap().id(), snapshot.id);
        assert_eq!(scene.get(clone).unwrap().label(), Some("root"));
        assert_eq!(scene.children(clone).unwrap().len(), 2);
    }

    #[test]
    fn test_restore_after_sweep_issues_fresh_ids() {
        let mut scene = SceneGraph::new();
        let root = sample(&mut scene);
        let snapshot = scene.snapshot(root).unwrap();
        scene.delete(root).unwrap();
        assert_eq!(scene.sweep(), 3);

        let restored = scene.restore(&snapshot).unwrap();
        let serial = scene.get(restored).unwrap().id();
        assert_ne!(serial, snapshot.id);
        assert!(serial > snapshot.id.max(snapshot.kids[0].id).max(snapshot.kids[1].id));
        for &kid in scene.children(restored).unwrap() {
            assert!(scene.get(kid).unwrap().id() > snapshot.id);
        }
    }

    #[test]
    fn test_restore_duplicate_ids_issues_fresh_ids() {
        let mut scene = SceneGraph::new();
        let root = sample(&mut scene);
        let mut snapshot = scene.snapshot(root).unwrap();
        snapshot.kids[1].id = snapshot.kids[0].id;

        let mut other = SceneGraph::new();
        let restored = other.restore(&snapshot).unwrap();
        let kids = other.children(restored).unwrap();
        assert_ne!(other.get(kids[0]).unwrap().id(), other.get(kids[1]).unwrap().id());
    }

    #[test]
    fn test_deep_snapshot_roundtrip() {
        const DEPTH: usize = 50_000;
        let mut scene = SceneGraph::new();
        let root = scene.create(NodeDesc::new().layer(2)).unwrap();
        let mut leaf = root;
        for _ in 0..DEPTH {
            let next = scene.create(NodeDesc::new().position(0.5, 0.0)).unwrap();
            scene.add(leaf, next).unwrap();
            leaf = next;
        }

        let snapshot = scene.snapshot(root).unwrap();
        assert_eq!(snapshot.node_count(), DEPTH + 1);

        let mut other = SceneGraph::new();
        let restored = other.restore(&snapshot).unwrap();
        drop(snapshot);
        assert_eq!(other.len(), DEPTH + 1);

        let mut tail = restored;
        while let Some(&next) = other.children(tail).unwrap().first() {
            tail = next;
        }
        assert_eq!(other.layer(tail).unwrap(), 2);
        assert_relative_eq!(
            other.matrix(tail).unwrap().translation_part().x,
            DEPTH as f32 * 0.5
        );
    }
}
