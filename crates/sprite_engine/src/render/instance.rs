//! CPU-side instance buffer
//!
//! A preallocated, fixed-stride float buffer that shaders fill from a batch
//! before uploading the written region and issuing one instanced draw.
//!
//! ```text
//! BatchContext ──pack──▶ InstanceBuffer ──as_bytes──▶ GPU upload
//!                        [node0][node1][tile0 tile1 tile2]...
//! ```

use crate::render::error::{CapacityError, RenderResult};
use crate::render::renderable::BatchContext;

/// Preallocated instance storage for one shader
#[derive(Debug, Clone)]
pub struct InstanceBuffer {
    data: Vec<f32>,
    stride: usize,
    capacity: usize,
    written: usize,
}

impl InstanceBuffer {
    /// Create a buffer of `capacity` instances, `stride` floats each
    pub fn new(stride: usize, capacity: usize) -> Self {
        Self {
            data: vec![0.0; stride * capacity],
            stride,
            capacity,
            written: 0,
        }
    }

    /// Floats per instance
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Maximum instances per batch
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Instances written by the last successful [`InstanceBuffer::pack`]
    pub fn instance_count(&self) -> usize {
        self.written
    }

    /// Write every node of `batch` at successive offsets.
    ///
    /// Rejects the whole batch before writing anything when it expands to
    /// more instances than the buffer holds. Returns the instance count.
    pub fn pack(&mut self, shader: &str, batch: &mut BatchContext<'_>) -> RenderResult<usize> {
        self.written = 0;

        let requested = batch.instance_count()?;
        if requested > self.capacity {
            return Err(CapacityError::ShaderLimit {
                shader: shader.to_string(),
                requested,
                capacity: self.capacity,
            }
            .into());
        }

        let mut count = 0;
        for index in 0..batch.len() {
            count += batch.write_node(index, &mut self.data, count * self.stride)?;
        }
        if count > self.capacity {
            return Err(CapacityError::ShaderLimit {
                shader: shader.to_string(),
                requested: count,
                capacity: self.capacity,
            }
            .into());
        }

        self.written = count;
        Ok(count)
    }

    /// Region written by the last pack
    pub fn written(&self) -> &[f32] {
        &self.data[..self.written * self.stride]
    }

    /// Written region as raw bytes for upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.written())
    }

    /// One written instance record
    pub fn instance(&self, index: usize) -> Option<&[f32]> {
        if index >= self.written {
            return None;
        }
        let start = index * self.stride;
        Some(&self.data[start..start + self.stride])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::memory::MatrixPool;
    use crate::render::tests::{recording_shader, TestQuad, TEST_STRIDE};
    use crate::render::{instance_slice, InstanceContext, RenderError, Renderable, SharedShader};
    use crate::scene::{NodeDesc, SceneGraph};

    #[test]
    fn test_pack_writes_successive_offsets() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let a = scene
            .create(NodeDesc::new().position(1.0, 0.0).renderable(TestQuad::new(&shader)))
            .unwrap();
        let b = scene
            .create(NodeDesc::new().position(2.0, 0.0).renderable(TestQuad::tiles(&shader, 3)))
            .unwrap();
        let nodes = [a, b];

        let mut pool = MatrixPool::new(4);
        let mut buffer = InstanceBuffer::new(TEST_STRIDE, 8);
        let mut batch = BatchContext::new(&scene, &nodes, &mut pool);

        assert_eq!(buffer.pack("quad", &mut batch).unwrap(), 4);
        assert_eq!(buffer.written().len(), 4 * TEST_STRIDE);
        assert_eq!(buffer.as_bytes().len(), 4 * TEST_STRIDE * 4);
        assert_eq!(buffer.instance(0).unwrap()[0], 1.0);
        assert_eq!(buffer.instance(3).unwrap()[0], 2.0);
        assert!(buffer.instance(4).is_none());
    }

    #[test]
    fn test_pack_rejects_over_capacity() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let nodes: Vec<_> = (0..3)
            .map(|_| scene.create(NodeDesc::new().renderable(TestQuad::new(&shader))).unwrap())
            .collect();

        let mut pool = MatrixPool::new(4);
        let mut buffer = InstanceBuffer::new(TEST_STRIDE, 2);
        let mut batch = BatchContext::new(&scene, &nodes, &mut pool);

        let err = buffer.pack("quad", &mut batch).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Capacity(CapacityError::ShaderLimit { requested: 3, capacity: 2, .. })
        ));
        assert_eq!(buffer.instance_count(), 0);
    }

    /// Writes one record but reports `claimed` instances
    struct Overcounting {
        shader: SharedShader,
        claimed: usize,
    }

    impl Renderable for Overcounting {
        fn shader(&self) -> &SharedShader {
            &self.shader
        }

        fn write_instance(
            &self,
            _ctx: &mut InstanceContext<'_>,
            buffer: &mut [f32],
            offset: usize,
        ) -> RenderResult<usize> {
            instance_slice(buffer, offset, TEST_STRIDE)?.fill(1.0);
            Ok(self.claimed)
        }

        fn requires_size(&self) -> bool {
            false
        }

        fn describe(&self) -> String {
            "Overcounting".to_string()
        }
    }

    #[test]
    fn test_pack_rejects_miscounted_writes() {
        let shader = recording_shader("quad");
        let mut scene = SceneGraph::new();
        let liar = scene
            .create(NodeDesc::new().renderable(Overcounting { shader: shader.clone(), claimed: 5 }))
            .unwrap();
        let nodes = [liar];

        let mut pool = MatrixPool::new(4);
        let mut buffer = InstanceBuffer::new(TEST_STRIDE, 2);
        let mut batch = BatchContext::new(&scene, &nodes, &mut pool);

        let err = buffer.pack("quad", &mut batch).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InstanceCountMismatch { node, declared: 1, written: 5 } if node == liar
        ));
        assert_eq!(buffer.instance_count(), 0);
        assert!(buffer.written().is_empty());
        assert!(buffer.as_bytes().is_empty());
    }
}
