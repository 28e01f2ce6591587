//! Shared render test doubles and frame integration tests


use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::collections::NodeId;
use crate::render::{
    instance_slice, BatchContext, FrameUniform, InstanceBuffer, InstanceContext, RenderError,
    RenderResult, Renderable, Shader, SharedShader,
};

/// Floats per test instance: world x, world y, tile index
pub(crate) const TEST_STRIDE: usize = 3;

/// Hook invocation seen by a [`RecordingShader`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Start(String),
    Batch(String, Vec<NodeId>),
    End(String),
}

/// Call log shared between several shaders
pub(crate) type EventLog = Rc<RefCell<Vec<Event>>>;

/// Shader that records its hooks and packs into a real instance buffer
pub(crate) struct RecordingShader {
    name: String,
    buffer: InstanceBuffer,
    events: EventLog,
    pub uniforms: Vec<FrameUniform>,
    pub packed: Vec<Vec<f32>>,
    pub fail_next_batch: bool,
}

impl RecordingShader {
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

impl Shader for RecordingShader {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_frame(&mut self, uniform: &FrameUniform) {
        self.uniforms.push(*uniform);
        self.events.borrow_mut().push(Event::Start(self.name.clone()));
    }

    fn process_batch(&mut self, batch: &mut BatchContext<'_>) -> RenderResult<usize> {
        self.events
            .borrow_mut()
            .push(Event::Batch(self.name.clone(), batch.nodes().to_vec()));
        if self.fail_next_batch {
            self.fail_next_batch = false;
            return Err(RenderError::Shader(format!("{} failed", self.name)));
        }
        self.buffer.pack(&self.name, batch)?;
        self.packed.push(self.buffer.written().to_vec());
        Ok(1)
    }

    fn end_frame(&mut self) {
        self.events.borrow_mut().push(Event::End(self.name.clone()));
    }
}

pub(crate) fn recording_shader(name: &str) -> Rc<RefCell<RecordingShader>> {
    recording_shader_with(name, 4096, &EventLog::default())
}

pub(crate) fn recording_shader_with(
    name: &str,
    capacity: usize,
    events: &EventLog,
) -> Rc<RefCell<RecordingShader>> {
    Rc::new(RefCell::new(RecordingShader {
        name: name.to_string(),
        buffer: InstanceBuffer::new(TEST_STRIDE, capacity),
        events: events.clone(),
        uniforms: Vec::new(),
        packed: Vec::new(),
        fail_next_batch: false,
    }))
}

/// Drawable writing its world origin once per tile
pub(crate) struct TestQuad {
    shader: SharedShader,
    tiles: usize,
}

impl TestQuad {
    pub fn new(shader: &Rc<RefCell<RecordingShader>>) -> Self {
        Self::tiles(shader, 1)
    }

    pub fn tiles(shader: &Rc<RefCell<RecordingShader>>, tiles: usize) -> Self {
        let shared: SharedShader = shader.clone();
        Self { shader: shared, tiles }
    }
}

impl Renderable for TestQuad {
    fn shader(&self) -> &SharedShader {
        &self.shader
    }

    fn write_instance(
        &self,
        ctx: &mut InstanceContext<'_>,
        buffer: &mut [f32],
        offset: usize,
    ) -> RenderResult<usize> {
        let out = instance_slice(buffer, offset, self.tiles * TEST_STRIDE)?;
        let matrix = *ctx.pool.acquire(ctx.matrix);
        for (tile, record) in out.chunks_exact_mut(TEST_STRIDE).enumerate() {
            record[0] = matrix[(0, 2)];
            record[1] = matrix[(1, 2)];
            record[2] = tile as f32;
        }
        Ok(self.tiles)
    }

    fn instance_count(&self) -> usize {
        self.tiles
    }

    fn requires_size(&self) -> bool {
        false
    }

    fn describe(&self) -> String {
        format!("TestQuad({})", self.tiles)
    }
}
