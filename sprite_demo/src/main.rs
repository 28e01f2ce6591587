//! Sprite Batching Demo
//!
//! Builds a small asteroid field scene and runs it through the frame
//! renderer with a console-backed shader:
//! - A background layer of tiled starfield quads
//! - Rocks orbiting a ship, grouped under one parent
//! - A HUD panel anchored to the top-left edge of the view
//!
//! Usage: `sprite_demo [renderer_config.toml|.ron]`

use std::collections::HashMap;

use sprite_engine::foundation::logging;
use sprite_engine::prelude::*;

const FRAMES: u64 = 5;
const NUM_ROCKS: usize = 12;
const ORBIT_RADIUS: f32 = 6.0;
const VIEW_WIDTH: f32 = 32.0;
const VIEW_HEIGHT: f32 = 18.0;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Shader that packs batches and reports what it would upload
struct ConsoleShader {
    name: String,
    buffer: InstanceBuffer,
    uploaded_bytes: usize,
}

impl ConsoleShader {
    fn shared(name: &str, capacity: usize) -> SharedShader {
        std::rc::Rc::new(std::cell::RefCell::new(Self {
            name: name.to_string(),
            buffer: InstanceBuffer::new(SPRITE_STRIDE, capacity),
            uploaded_bytes: 0,
        }))
    }
}

impl Shader for ConsoleShader {
    fn name(&self) -> &str {
        &self.name
    }

    fn start_frame(&mut self, uniform: &FrameUniform) {
        self.uploaded_bytes = 0;
        log::trace!("[{}] frame {} view {:?}", self.name, uniform.frame, uniform.view_projection);
    }

    fn process_batch(&mut self, batch: &mut BatchContext<'_>) -> RenderResult<usize> {
        let instances = self.buffer.pack(&self.name, batch)?;
        self.uploaded_bytes += self.buffer.as_bytes().len();
        log::debug!("[{}] draw {} instances", self.name, instances);
        Ok(1)
    }

    fn end_frame(&mut self) {
        log::debug!("[{}] uploaded {} bytes", self.name, self.uploaded_bytes);
    }
}

struct DemoAtlas(HashMap<&'static str, UvRect>);

impl DemoAtlas {
    fn new() -> Self {
        let mut frames = HashMap::new();
        frames.insert("stars", UvRect::new(0.0, 0.0, 0.5, 0.5));
        frames.insert("ship", UvRect::new(0.5, 0.0, 1.0, 0.5));
        frames.insert("rock", UvRect::new(0.0, 0.5, 0.5, 1.0));
        frames.insert("panel", UvRect::new(0.5, 0.5, 1.0, 1.0));
        Self(frames)
    }
}

impl AtlasLookup for DemoAtlas {
    fn region(&self, frame: &str) -> Option<UvRect> {
        self.0.get(frame).copied()
    }
}

struct DemoApp {
    scene: SceneGraph,
    renderer: FrameRenderer,
    root: NodeId,
    orbit: NodeId,
    ship: NodeId,
    hud: NodeId,
}

impl DemoApp {
    fn new(config: RendererConfig) -> Result<Self, DemoError> {
        config.validate()?;
        let atlas = DemoAtlas::new();
        let world = ConsoleShader::shared("world", config.max_instances_per_frame);
        let ui = ConsoleShader::shared("ui", 16);
        let mut scene = SceneGraph::new();

        let stars = TiledSprite::new(Sprite::from_atlas(world.clone(), &atlas, "stars")?, 4, 2);
        let background = scene.create(
            NodeDesc::new()
                .label("background")
                .size(VIEW_WIDTH, VIEW_HEIGHT)
                .layer(-1)
                .renderable(stars),
        )?;

        let ship = scene.create(
            NodeDesc::new()
                .label("ship")
                .size(1.5, 1.0)
                .renderable(Sprite::from_atlas(world.clone(), &atlas, "ship")?),
        )?;

        let orbit = scene.create(NodeDesc::new().label("orbit").without_size())?;
        for i in 0..NUM_ROCKS {
            let angle = i as f32 / NUM_ROCKS as f32 * std::f32::consts::TAU;
            let flip = if i % 2 == 0 { SpriteFlip::X } else { SpriteFlip::empty() };
            let rock = Sprite::from_atlas(world.clone(), &atlas, "rock")?.with_flip(flip);
            let node = scene.create(
                NodeDesc::new()
                    .label(format!("rock{}", i))
                    .position(angle.cos() * ORBIT_RADIUS, angle.sin() * ORBIT_RADIUS)
                    .rotation(i as f32 * 30.0)
                    .renderable(rock),
            )?;
            scene.add(orbit, node)?;
        }

        let panel = Sprite::from_atlas(ui, &atlas, "panel")?.with_tint([1.0, 1.0, 1.0, 0.8]);
        let hud = scene.create(
            NodeDesc::new()
                .label("hud")
                .size(6.0, 1.5)
                .layer(10)
                .renderable(panel),
        )?;

        let root = scene.create(
            NodeDesc::new()
                .label("root")
                .children([background, ship, orbit, hud]),
        )?;

        // Anchor the HUD to the top-left corner of the view
        scene.set_bounds(
            hud,
            BoundsEdit {
                left: Some(-VIEW_WIDTH / 2.0 + 0.5),
                top: Some(VIEW_HEIGHT / 2.0 - 0.5),
                ..BoundsEdit::default()
            },
        )?;

        let camera = OrthoCamera::new(VIEW_WIDTH, VIEW_HEIGHT);
        let renderer = FrameRenderer::new(config, Box::new(camera));

        Ok(Self {
            scene,
            renderer,
            root,
            orbit,
            ship,
            hud,
        })
    }

    fn update(&mut self, frame: u64) -> Result<(), DemoError> {
        let t = frame as f32;
        self.scene.set_rotation(self.orbit, t * 15.0)?;
        self.scene.set_position(self.ship, Vec2::new(t * 0.5, 0.0))?;

        // Hide the HUD every other frame
        self.scene.set_active(self.hud, frame % 2 == 0)?;
        Ok(())
    }

    fn run(mut self) -> Result<(), DemoError> {
        for frame in 0..FRAMES {
            self.update(frame)?;

            self.renderer.start_frame();
            self.renderer.draw(&self.scene, self.root)?;
            let stats = self.renderer.end_frame(&self.scene)?;

            let bounds = self.scene.bounds(self.ship)?;
            log::info!(
                "Frame {}: {} instances, {} draw calls, {} switches, ship at ({:.1}, {:.1})",
                frame,
                stats.instances_enqueued,
                stats.draw_calls,
                stats.pipeline_switches,
                bounds.center().x,
                bounds.center().y
            );
        }

        match self.scene.snapshot(self.orbit)?.to_ron() {
            Ok(text) => log::debug!("Orbit snapshot:\n{}", text),
            Err(e) => log::warn!("Failed to serialize orbit snapshot: {}", e),
        }

        // Tear down the rocks and reclaim their slots
        self.scene.delete(self.orbit)?;
        let freed = self.scene.sweep();
        log::info!("Deleted orbit group, freed {} nodes", freed);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_with_default("info");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading renderer config from {}", path);
            RendererConfig::load_from_file(&path)?
        }
        None => RendererConfig::default(),
    };

    println!("=== Sprite Batching Demo ===");
    println!("Set RUST_LOG=debug to see per-shader batches");
    println!();

    let app = DemoApp::new(config)?;
    app.run()?;
    Ok(())
}
