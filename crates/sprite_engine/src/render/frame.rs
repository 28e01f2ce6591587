//! # Frame Renderer
//!
//! Drives the per-frame state machine:
//!
//! ```text
//! Idle ──start_frame / draw──▶ Accumulating ──end_frame──▶ Idle
//! ```
//!
//! `end_frame` checks the global instance limit, runs the shader hooks,
//! submits every pipeline layer by layer, and always finishes with cleanup:
//! the batcher is flushed, scratch matrices are released and the frame
//! counter advances, whether or not submission failed.

use std::cell::RefMut;

use crate::core::config::RendererConfig;
use crate::foundation::collections::NodeId;
use crate::foundation::memory::MatrixPool;
use crate::render::batch_renderer::Batcher;
use crate::render::camera::{Camera, FrameUniform};
use crate::render::error::{CapacityError, RenderError, RenderResult};
use crate::render::renderable::{BatchContext, Shader, ShaderKey, SharedShader};
use crate::scene::SceneGraph;

/// Frame lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// No frame in progress
    Idle,
    /// Drawables are being enqueued
    Accumulating,
}

/// Per-frame diagnostics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Draw calls reported by shaders
    pub draw_calls: usize,
    /// Times the bound shader changed between pipelines
    pub pipeline_switches: usize,
    /// Drawables enqueued this frame
    pub instances_enqueued: usize,
    /// Distinct layers submitted
    pub layers: usize,
    /// Pipelines submitted
    pub pipelines: usize,
}

/// Per-frame batching and submission controller
pub struct FrameRenderer {
    config: RendererConfig,
    camera: Box<dyn Camera>,
    batcher: Batcher,
    pool: MatrixPool,
    stats: FrameStats,
    state: FrameState,
    frame_count: u64,
}

impl FrameRenderer {
    /// Create an idle renderer
    pub fn new(config: RendererConfig, camera: Box<dyn Camera>) -> Self {
        log::info!(
            "Initialized frame renderer with max {} instances per frame",
            config.max_instances_per_frame
        );
        let pool = MatrixPool::new(config.scratch_pool_capacity);
        Self {
            config,
            camera,
            batcher: Batcher::new(),
            pool,
            stats: FrameStats::default(),
            state: FrameState::Idle,
            frame_count: 0,
        }
    }

    /// Begin a frame, resetting the diagnostic counters.
    ///
    /// Drawables enqueued by an unfinished frame are discarded.
    pub fn start_frame(&mut self) {
        if self.state == FrameState::Accumulating && !self.batcher.is_empty() {
            log::warn!(
                "Frame {} restarted, discarding {} pending drawables",
                self.frame_count,
                self.batcher.node_count()
            );
            self.batcher.flush();
            self.pool.release_all();
        }
        self.stats = FrameStats::default();
        self.state = FrameState::Accumulating;
    }

    /// Enqueue the active drawables under `root`, starting a frame if idle.
    ///
    /// Returns the number of drawables added.
    pub fn draw(&mut self, scene: &SceneGraph, root: NodeId) -> RenderResult<usize> {
        if self.state == FrameState::Idle {
            self.start_frame();
        }
        let added = self.batcher.enqueue(scene, root)?;
        self.stats.instances_enqueued = self.batcher.node_count();
        Ok(added)
    }

    /// Submit the frame and return its diagnostics
    pub fn end_frame(&mut self, scene: &SceneGraph) -> RenderResult<FrameStats> {
        if self.state == FrameState::Idle {
            log::debug!("end_frame called with no frame in progress");
        }

        let frame = self.frame_count;
        let result = self.submit(scene);
        self.cleanup();

        match &result {
            Ok(stats) if self.config.log_frame_stats => log::info!("Frame {}: {:?}", frame, stats),
            Ok(stats) => log::debug!("Frame {}: {:?}", frame, stats),
            Err(e) => log::error!("Frame {} aborted: {}", frame, e),
        }
        result
    }

    fn submit(&mut self, scene: &SceneGraph) -> RenderResult<FrameStats> {
        let enqueued = self.batcher.node_count();
        self.stats.instances_enqueued = enqueued;
        self.stats.layers = self.batcher.layers().len();
        self.stats.pipelines = self.batcher.pipeline_count();

        // Checked before any hook so shaders never see an unmatched start_frame
        let limit = self.config.max_instances_per_frame;
        if enqueued > limit {
            return Err(CapacityError::FrameLimit {
                requested: enqueued,
                limit,
            }
            .into());
        }
        if enqueued == 0 {
            return Ok(self.stats.clone());
        }

        let uniform = FrameUniform {
            view_projection: self.camera.view_projection(),
            frame: self.frame_count,
        };

        let shaders = self.batcher.distinct_shaders();
        let mut started = 0;
        let mut result = Ok(());
        for shader in &shaders {
            match shader_mut(shader) {
                Ok(mut shader) => shader.start_frame(&uniform),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
            started += 1;
        }

        if result.is_ok() {
            result = process_layers(&self.batcher, &mut self.pool, scene, &mut self.stats);
        }

        for shader in &shaders[..started] {
            match shader_mut(shader) {
                Ok(mut shader) => shader.end_frame(),
                Err(e) => log::error!("Skipped end_frame hook: {}", e),
            }
        }

        result.map(|()| self.stats.clone())
    }

    fn cleanup(&mut self) {
        self.batcher.flush();
        self.pool.release_all();
        self.frame_count += 1;
        self.state = FrameState::Idle;
    }

    /// Diagnostics of the current or most recent frame
    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Current lifecycle state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Number of frames ended, including aborted ones
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Drawables collected for the current frame
    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    /// Scratch matrix pool
    pub fn pool(&self) -> &MatrixPool {
        &self.pool
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Replace the camera used for subsequent frames
    pub fn set_camera(&mut self, camera: Box<dyn Camera>) {
        self.camera = camera;
    }
}

fn shader_mut(shader: &SharedShader) -> RenderResult<RefMut<'_, dyn Shader + 'static>> {
    shader
        .try_borrow_mut()
        .map_err(|e| RenderError::Shader(format!("shader already borrowed: {}", e)))
}

fn process_layers(
    batcher: &Batcher,
    pool: &mut MatrixPool,
    scene: &SceneGraph,
    stats: &mut FrameStats,
) -> RenderResult<()> {
    let mut bound: Option<ShaderKey> = None;

    for layer in batcher.layers() {
        for pipeline in layer.pipelines() {
            if bound != Some(pipeline.key()) {
                stats.pipeline_switches += 1;
                bound = Some(pipeline.key());
            }

            let mut batch = BatchContext::new(scene, pipeline.nodes(), pool);
            let mut shader = shader_mut(pipeline.shader())?;
            log::trace!(
                "Layer {}: '{}' drawing {} nodes",
                layer.z(),
                shader.name(),
                batch.len()
            );
            stats.draw_calls += shader.process_batch(&mut batch)?;
        }
    }
    Ok(())
}
