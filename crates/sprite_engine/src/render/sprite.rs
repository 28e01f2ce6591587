//! Sprite drawables
//!
//! Each sprite instance is `SPRITE_STRIDE` floats:
//!
//! ```text
//! | m00 m10 m01 m11 m02 m12 | u0 v0 u1 v1 | r g b a | depth | pad |
//! ```
//!
//! The affine part is the node's world matrix with the node's own size (and
//! flip) applied. Descendants never see that scale.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Mat3Ext, Vec2};
use crate::render::error::{RenderError, RenderResult};
use crate::render::renderable::{instance_slice, InstanceContext, Renderable, SharedShader};
use crate::scene::SceneError;

/// Floats written per sprite instance
pub const SPRITE_STRIDE: usize = 16;

bitflags! {
    /// Mirroring applied to a sprite's own quad
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpriteFlip: u8 {
        /// Mirror horizontally
        const X = 1 << 0;
        /// Mirror vertically
        const Y = 1 << 1;
    }
}

impl SpriteFlip {
    fn scale(self) -> Vec2 {
        Vec2::new(
            if self.contains(Self::X) { -1.0 } else { 1.0 },
            if self.contains(Self::Y) { -1.0 } else { 1.0 },
        )
    }
}

/// Normalized texture region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UvRect {
    /// Left texture coordinate
    pub u0: f32,
    /// Bottom texture coordinate
    pub v0: f32,
    /// Right texture coordinate
    pub u1: f32,
    /// Top texture coordinate
    pub v1: f32,
}

impl UvRect {
    /// Region covering the whole texture
    pub const FULL: Self = Self {
        u0: 0.0,
        v0: 0.0,
        u1: 1.0,
        v1: 1.0,
    };

    /// Create a region from its corners
    pub fn new(u0: f32, v0: f32, u1: f32, v1: f32) -> Self {
        Self { u0, v0, u1, v1 }
    }

    fn to_array(self) -> [f32; 4] {
        [self.u0, self.v0, self.u1, self.v1]
    }
}

impl Default for UvRect {
    fn default() -> Self {
        Self::FULL
    }
}

/// Texture atlas frame lookup, provided by the asset layer
pub trait AtlasLookup {
    /// Region of a named frame, if the atlas has one
    fn region(&self, frame: &str) -> Option<UvRect>;
}

/// Single textured quad sized to its node
pub struct Sprite {
    shader: SharedShader,
    /// Texture region drawn on the quad
    pub region: UvRect,
    /// RGBA color multiplier
    pub tint: [f32; 4],
    /// Mirroring of the quad
    pub flip: SpriteFlip,
    frame: Option<String>,
}

impl Sprite {
    /// Sprite showing the whole texture, untinted
    pub fn new(shader: SharedShader) -> Self {
        Self {
            shader,
            region: UvRect::FULL,
            tint: [1.0; 4],
            flip: SpriteFlip::empty(),
            frame: None,
        }
    }

    /// Sprite showing a named atlas frame
    pub fn from_atlas(
        shader: SharedShader,
        atlas: &dyn AtlasLookup,
        frame: &str,
    ) -> RenderResult<Self> {
        let region = atlas
            .region(frame)
            .ok_or_else(|| RenderError::MissingRegion(frame.to_string()))?;
        let mut sprite = Self::new(shader).with_region(region);
        sprite.frame = Some(frame.to_string());
        Ok(sprite)
    }

    /// Set the texture region
    pub fn with_region(mut self, region: UvRect) -> Self {
        self.region = region;
        self
    }

    /// Set the tint color
    pub fn with_tint(mut self, tint: [f32; 4]) -> Self {
        self.tint = tint;
        self
    }

    /// Set the mirroring
    pub fn with_flip(mut self, flip: SpriteFlip) -> Self {
        self.flip = flip;
        self
    }

    fn write_record(&self, out: &mut [f32], matrix: &Mat3, region: UvRect, depth: f32) {
        out[0] = matrix[(0, 0)];
        out[1] = matrix[(1, 0)];
        out[2] = matrix[(0, 1)];
        out[3] = matrix[(1, 1)];
        out[4] = matrix[(0, 2)];
        out[5] = matrix[(1, 2)];
        out[6..10].copy_from_slice(&region.to_array());
        out[10..14].copy_from_slice(&self.tint);
        out[14] = depth;
        out[15] = 0.0;
    }
}

fn required_size(ctx: &InstanceContext<'_>) -> RenderResult<Vec2> {
    ctx.size
        .ok_or(RenderError::Scene(SceneError::MissingSize(Some(ctx.node))))
}

impl Renderable for Sprite {
    fn shader(&self) -> &SharedShader {
        &self.shader
    }

    fn write_instance(
        &self,
        ctx: &mut InstanceContext<'_>,
        buffer: &mut [f32],
        offset: usize,
    ) -> RenderResult<usize> {
        let size = required_size(ctx)?;
        let out = instance_slice(buffer, offset, SPRITE_STRIDE)?;

        let scaled = ctx.matrix * Mat3::scaling_2d(size.component_mul(&self.flip.scale()));
        let matrix = ctx.pool.acquire(scaled);
        self.write_record(out, matrix, self.region, ctx.layer as f32);
        Ok(1)
    }

    fn describe(&self) -> String {
        match &self.frame {
            Some(frame) => format!("Sprite({})", frame),
            None => format!("Sprite({:?})", self.region.to_array()),
        }
    }
}

/// Grid of identical tiles covering its node
pub struct TiledSprite {
    sprite: Sprite,
    columns: u32,
    rows: u32,
}

impl TiledSprite {
    /// Tile `sprite` in a `columns x rows` grid
    pub fn new(sprite: Sprite, columns: u32, rows: u32) -> Self {
        Self {
            sprite,
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }

    /// Tiles per row
    pub fn columns(&self) -> u32 {
        self.columns
    }

    /// Tiles per column
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Local transform of tile (`column`, `row`) inside the unit quad
    fn tile_matrix(&self, column: u32, row: u32) -> Mat3 {
        let cols = self.columns as f32;
        let rows = self.rows as f32;
        let center = Vec2::new(
            -0.5 + (column as f32 + 0.5) / cols,
            -0.5 + (row as f32 + 0.5) / rows,
        );
        Mat3::translation_2d(center) * Mat3::scaling_2d(Vec2::new(1.0 / cols, 1.0 / rows))
    }
}

impl Renderable for TiledSprite {
    fn shader(&self) -> &SharedShader {
        self.sprite.shader()
    }

    fn write_instance(
        &self,
        ctx: &mut InstanceContext<'_>,
        buffer: &mut [f32],
        offset: usize,
    ) -> RenderResult<usize> {
        let size = required_size(ctx)?;
        let count = self.instance_count();
        let out = instance_slice(buffer, offset, count.saturating_mul(SPRITE_STRIDE))?;
        let quad = ctx.matrix * Mat3::scaling_2d(size.component_mul(&self.sprite.flip.scale()));
        let depth = ctx.layer as f32;

        // Row-major, bottom row first
        let tiles = (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |column| (column, row)));
        for ((column, row), record) in tiles.zip(out.chunks_exact_mut(SPRITE_STRIDE)) {
            let matrix = ctx.pool.acquire(quad * self.tile_matrix(column, row));
            self.sprite.write_record(record, matrix, self.sprite.region, depth);
        }
        Ok(count)
    }

    fn instance_count(&self) -> usize {
        (self.columns as usize).saturating_mul(self.rows as usize)
    }

    fn describe(&self) -> String {
        format!("Tiled{}x{}({})", self.columns, self.rows, self.sprite.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::memory::MatrixPool;
    use crate::render::renderable::BatchContext;
    use crate::render::tests::recording_shader;
    use crate::render::InstanceBuffer;
    use crate::scene::{NodeDesc, SceneGraph};
    use approx::assert_relative_eq;
    use std::collections::HashMap;

    struct MapAtlas(HashMap<String, UvRect>);

    impl AtlasLookup for MapAtlas {
        fn region(&self, frame: &str) -> Option<UvRect> {
            self.0.get(frame).copied()
        }
    }

    fn pack(
        scene: &SceneGraph,
        nodes: &[crate::scene::NodeId],
        capacity: usize,
    ) -> (InstanceBuffer, MatrixPool) {
        let mut pool = MatrixPool::new(8);
        let mut buffer = InstanceBuffer::new(SPRITE_STRIDE, capacity);
        {
            let mut batch = BatchContext::new(scene, nodes, &mut pool);
            buffer.pack("sprite", &mut batch).unwrap();
        }
        (buffer, pool)
    }

    #[test]
    fn test_sprite_record_layout() {
        let shader = recording_shader("sprite");
        let mut scene = SceneGraph::new();
        let sprite = Sprite::new(shader.clone())
            .with_region(UvRect::new(0.25, 0.0, 0.5, 0.5))
            .with_tint([1.0, 0.5, 0.25, 1.0]);
        let parent = scene.create(NodeDesc::new().position(10.0, 20.0).layer(4)).unwrap();
        let node = scene.create(NodeDesc::new().size(8.0, 2.0).renderable(sprite)).unwrap();
        scene.add(parent, node).unwrap();

        let (buffer, pool) = pack(&scene, &[node], 1);
        let record = buffer.instance(0).unwrap();
        assert_eq!(&record[..6], &[8.0, 0.0, 0.0, 2.0, 10.0, 20.0]);
        assert_eq!(&record[6..10], &[0.25, 0.0, 0.5, 0.5]);
        assert_eq!(&record[10..14], &[1.0, 0.5, 0.25, 1.0]);
        assert_eq!(record[14], 4.0);
        assert_eq!(pool.in_use(), 1);
    }

    #[test]
    fn test_flip_stays_on_own_quad() {
        let shader = recording_shader("sprite");
        let mut scene = SceneGraph::new();
        let flipped = Sprite::new(shader.clone()).with_flip(SpriteFlip::X | SpriteFlip::Y);
        let parent = scene.create(NodeDesc::new().size(2.0, 2.0).renderable(flipped)).unwrap();
        let child = scene
            .create(NodeDesc::new().position(1.0, 0.0).renderable(Sprite::new(shader.clone())))
            .unwrap();
        scene.add(parent, child).unwrap();

        let (buffer, _) = pack(&scene, &[parent, child], 2);
        assert_eq!(buffer.instance(0).unwrap()[0], -2.0);
        assert_eq!(buffer.instance(0).unwrap()[3], -2.0);
        assert_eq!(buffer.instance(1).unwrap()[0], 1.0);
        assert_eq!(buffer.instance(1).unwrap()[4], 1.0);
    }

    #[test]
    fn test_tiles_cover_node() {
        let shader = recording_shader("sprite");
        let mut scene = SceneGraph::new();
        let tiled = TiledSprite::new(Sprite::new(shader.clone()), 2, 1);
        let node = scene.create(NodeDesc::new().size(4.0, 2.0).renderable(tiled)).unwrap();

        let (buffer, pool) = pack(&scene, &[node], 2);
        assert_eq!(buffer.instance_count(), 2);
        assert_eq!(pool.in_use(), 2);

        let left = buffer.instance(0).unwrap();
        let right = buffer.instance(1).unwrap();
        assert_relative_eq!(left[0], 2.0);
        assert_relative_eq!(left[3], 2.0);
        assert_relative_eq!(left[4], -1.0);
        assert_relative_eq!(right[4], 1.0);
        assert_relative_eq!(right[5], 0.0);
    }

    #[test]
    fn test_from_atlas() {
        let shader = recording_shader("sprite");
        let mut frames = HashMap::new();
        frames.insert("ship".to_string(), UvRect::new(0.0, 0.5, 0.5, 1.0));
        let atlas = MapAtlas(frames);

        let sprite = Sprite::from_atlas(shader.clone(), &atlas, "ship").unwrap();
        assert_eq!(sprite.region, UvRect::new(0.0, 0.5, 0.5, 1.0));
        assert_eq!(sprite.describe(), "Sprite(ship)");

        let missing = Sprite::from_atlas(shader, &atlas, "rock");
        assert!(matches!(missing, Err(RenderError::MissingRegion(name)) if name == "rock"));
    }

    #[test]
    fn test_unsized_sprite_rejected() {
        let shader = recording_shader("sprite");
        let mut scene = SceneGraph::new();
        let result = scene.create(NodeDesc::new().without_size().renderable(Sprite::new(shader)));
        assert!(matches!(result, Err(SceneError::MissingSize(None))));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_large_grid_count_does_not_wrap() {
        let shader = recording_shader("sprite");
        let tiles = TiledSprite::new(Sprite::new(shader), 65_536, 65_536);
        assert_eq!(tiles.instance_count(), 1_usize << 32);

        // Rejected by capacity instead of overflowing
        let mut scene = SceneGraph::new();
        let node = scene.create(NodeDesc::new().renderable(tiles)).unwrap();
        let nodes = [node];
        let mut pool = MatrixPool::new(8);
        let mut buffer = InstanceBuffer::new(SPRITE_STRIDE, 4);
        let mut batch = BatchContext::new(&scene, &nodes, &mut pool);
        let err = buffer.pack("sprite", &mut batch).unwrap_err();
        assert!(err.is_capacity());
    }
}
