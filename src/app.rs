use std::time::{Instant, SystemTime};

use anyhow::Result;
use log::{info, warn};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use winit::{
    event::{ElementState, MouseButton, VirtualKeyCode},
    window::Window,
};

use crate::{
    assets::SceneAssets,
    config::DemoConfig,
    input::InputState,
    particles::ParticleEmitter,
    renderer::Renderer,
    scene::Scene,
    window::{HasSize, Size},
};

pub struct App {
    window: Window,
    input: InputState,
    scene: Scene,
    renderer: Renderer,
    started_at: Instant,
    cursor_grabbed: bool,
}

impl App {
    pub async fn new(window: Window, config: &DemoConfig) -> Result<Self> {
        let seed = config.particles.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64
        });
        info!("Seeded RNG with {}", seed);
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let emitter = ParticleEmitter::new(&config.particles, &mut rng);

        let assets = SceneAssets::load(&config.assets);
        let scene = Scene::new(config, window.size().aspect_ratio(), emitter);
        let renderer = Renderer::new(&window, config, &assets, &scene.emitter).await?;

        Ok(Self {
            window,
            input: InputState::new(),
            scene,
            renderer,
            started_at: Instant::now(),
            cursor_grabbed: false,
        })
    }

    pub fn on_resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        let size = Size::from(size);
        if size.is_empty() {
            return;
        }
        self.scene.set_aspect_ratio(size.aspect_ratio());
        self.renderer.resize(size);
    }

    pub fn on_key(&mut self, keycode: VirtualKeyCode, state: ElementState) {
        if keycode == VirtualKeyCode::Escape && state == ElementState::Released {
            self.grab_cursor(false);
        }
        self.input.on_key(keycode, state);
    }

    pub fn on_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left && state == ElementState::Released && !self.cursor_grabbed {
            self.grab_cursor(true);
        }
        self.input.on_mouse_button(button, state);
    }

    pub fn on_mouse_move(&mut self, delta: (f64, f64)) {
        if !self.cursor_grabbed {
            return;
        }
        self.input.on_mouse_motion(delta);
    }

    fn grab_cursor(&mut self, grab: bool) {
        if let Err(e) = self.window.set_cursor_grab(grab) {
            warn!("Failed to set cursor grab to {}: {}", grab, e);
        }
        self.window.set_cursor_visible(!grab);
        self.cursor_grabbed = grab;
    }

    /// Advances the scene to the current time and draws it.
    pub fn update(&mut self) -> Result<()> {
        let t = self.started_at.elapsed().as_secs_f32();
        self.scene.update(t, &self.input);
        self.input.end_frame();
        self.renderer.render(&self.scene)
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}
