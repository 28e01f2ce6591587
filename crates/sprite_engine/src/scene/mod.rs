//! Scene graph
//!
//! A retained tree of 2D nodes. Each node holds a local transform, an
//! optional size, an optional explicit layer, an activity flag and an
//! optional drawable. World matrix, bounds, effective layer and effective
//! activity are derived from the ancestor chain and cached per node.
//!
//! ## Architecture
//!
//! ```text
//! SceneGraph (arena, serial ids)
//!      ├── Node (local state + cache)
//!      ├── Bounds / BoundsEdit (world-space placement)
//!      └── NodeSnapshot (portable structure)
//! ```

mod bounds;
mod node;
mod scene_graph;
mod snapshot;

pub use crate::foundation::collections::NodeId;
pub use bounds::{Bounds, BoundsEdit};
pub use node::{Node, NodeDesc, SizeSpec};
pub use scene_graph::{SceneError, SceneGraph, SceneResult};
pub use snapshot::{NodeSnapshot, TransformSnapshot};
