//! Host-facing facade: one `tick` per frame, pointer queries, a trigger, and
//! three completion hooks.

use crate::catalog::BodyId;
use crate::config::EngineConfig;
use crate::launch::{LaunchEvent, LaunchSequencer};
use crate::orbit::SpeedMultipliers;
use crate::raster::{Framebuffer, Renderer};
use crate::scene::{InfoPanel, Scene};
use tracing::{debug, info};

type Hook = Box<dyn FnMut()>;
type SelectHook = Box<dyn FnMut(&InfoPanel)>;

/// Frame delta with anomalies removed: non-finite or negative becomes 0,
/// anything above `max` becomes `max`.
pub fn clamp_delta(dt: f32, max: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 0.0;
    }
    dt.min(max.max(0.0))
}

pub struct Engine {
    config: EngineConfig,
    seed: u64,
    scene: Scene,
    launch: LaunchSequencer,
    renderer: Renderer,
    framebuffer: Framebuffer,
    frames: u64,
    on_launch_complete: Option<Hook>,
    on_body_selected: Option<SelectHook>,
    on_flash_finished: Option<Hook>,
}

impl Engine {
    pub fn new(config: EngineConfig, width: u32, height: u32) -> Self {
        let seed = config.resolved_seed();
        Self::with_seed(config, seed, width, height)
    }

    pub fn with_seed(config: EngineConfig, seed: u64, width: u32, height: u32) -> Self {
        let scene = Scene::new(&config, seed, width, height);
        let launch = LaunchSequencer::new(config.launch.clone());
        let (w, h) = scene.viewport();
        info!(seed, bodies = scene.bodies().len(), width = w, height = h, "engine ready");
        Self {
            config,
            seed,
            scene,
            launch,
            renderer: Renderer::default(),
            framebuffer: Framebuffer::new(w, h),
            frames: 0,
            on_launch_complete: None,
            on_body_selected: None,
            on_flash_finished: None,
        }
    }

    pub fn on_launch_complete(&mut self, f: impl FnMut() + 'static) {
        self.on_launch_complete = Some(Box::new(f));
    }

    pub fn on_body_selected(&mut self, f: impl FnMut(&InfoPanel) + 'static) {
        self.on_body_selected = Some(Box::new(f));
    }

    pub fn on_flash_finished(&mut self, f: impl FnMut() + 'static) {
        self.on_flash_finished = Some(Box::new(f));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn launch(&self) -> &LaunchSequencer {
        &self.launch
    }

    pub fn multipliers(&self) -> SpeedMultipliers {
        self.launch.multipliers()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn trigger(&mut self) -> bool {
        self.launch.trigger()
    }

    /// Advances the whole engine by one frame.
    pub fn tick(&mut self, dt: f32) -> Option<LaunchEvent> {
        let max = self.config.max_frame_delta;
        let step = clamp_delta(dt, max);
        if step != dt {
            debug!(raw = dt, clamped = step, "frame delta clamped");
        }
        self.frames += 1;

        let event = self.launch.tick(step);
        let m = self.launch.multipliers();
        self.scene.advance(step, &m);

        match event {
            Some(LaunchEvent::Completed) => {
                if let Some(f) = self.on_launch_complete.as_mut() {
                    f();
                }
            }
            Some(LaunchEvent::FlashFinished) => {
                if let Some(f) = self.on_flash_finished.as_mut() {
                    f();
                }
            }
            None => {}
        }
        event
    }

    pub fn pick(&self, x: f32, y: f32) -> Option<BodyId> {
        self.scene.pick(x, y)
    }

    /// Hover whatever is under the pointer (or nothing).
    pub fn hover_at(&mut self, x: f32, y: f32) -> Option<BodyId> {
        let id = self.scene.pick(x, y);
        self.scene.hover(id);
        id
    }

    pub fn clear_hover(&mut self) {
        self.scene.hover(None);
    }

    /// Selects the body under the pointer; clicking empty space deselects.
    pub fn click(&mut self, x: f32, y: f32) -> Option<InfoPanel> {
        let id = self.scene.pick(x, y);
        self.select(id)
    }

    pub fn select(&mut self, id: Option<BodyId>) -> Option<InfoPanel> {
        let panel = self.scene.select(id)?;
        debug!(body = %panel.name, "body selected");
        if let Some(f) = self.on_body_selected.as_mut() {
            f(&panel);
        }
        Some(panel)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
        let (w, h) = self.scene.viewport();
        self.framebuffer.resize(w, h);
    }

    pub fn render(&mut self) -> &Framebuffer {
        self.renderer.render(&self.scene, self.launch.flash(), &mut self.framebuffer);
        &self.framebuffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, CelestialBodyDescriptor, SunDescriptor};
    use crate::config::TextureConfig;
    use crate::launch::LaunchPhase;
    use std::cell::Cell;
    use std::rc::Rc;

    fn small_config() -> EngineConfig {
        EngineConfig {
            starfield: Vec::new(),
            texture: TextureConfig { width: 16, height: 8, normal_maps: false },
            ..EngineConfig::default()
        }
    }

    #[test]
    fn clamp_delta_handles_anomalies() {
        let max = 1.0 / 30.0;
        assert_eq!(clamp_delta(0.01, max), 0.01);
        assert_eq!(clamp_delta(5.0, max), max);
        assert_eq!(clamp_delta(-1.0, max), 0.0);
        assert_eq!(clamp_delta(f32::NAN, max), 0.0);
        assert_eq!(clamp_delta(f32::INFINITY, max), 0.0);
    }

    #[test]
    fn a_long_stall_cannot_skip_the_sequence() {
        let mut engine = Engine::with_seed(small_config(), 1, 40, 20);
        engine.trigger();
        assert_eq!(engine.tick(10.0), None);
        assert_eq!(engine.launch().phase(), LaunchPhase::Accelerating);
        assert!((engine.launch().elapsed() - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn hooks_fire_once_each() {
        let mut engine = Engine::with_seed(small_config(), 1, 40, 20);
        let completed = Rc::new(Cell::new(0));
        let flashed = Rc::new(Cell::new(0));
        let c = Rc::clone(&completed);
        engine.on_launch_complete(move || c.set(c.get() + 1));
        let f = Rc::clone(&flashed);
        engine.on_flash_finished(move || f.set(f.get() + 1));

        engine.trigger();
        for _ in 0..400 {
            engine.tick(1.0 / 32.0);
            engine.trigger();
        }
        assert_eq!(completed.get(), 1);
        assert_eq!(flashed.get(), 1);
        assert!(engine.launch().is_done());
        assert_eq!(engine.frame_count(), 400);
    }

    #[test]
    fn selection_hook_gets_the_panel() {
        let mut cfg = small_config();
        let mut d = CelestialBodyDescriptor::new("Target", 50.0, 0.0);
        d.radius = 5.0;
        cfg.catalog = Catalog::new(SunDescriptor::default(), vec![d]);
        let mut engine = Engine::with_seed(cfg, 1, 160, 100);

        let seen = Rc::new(Cell::new(None));
        let s = Rc::clone(&seen);
        engine.on_body_selected(move |p| s.set(Some(p.id)));

        let spot = engine.scene().screen_positions()[0];
        let panel = engine.click(spot.x, spot.y).unwrap();
        assert_eq!(panel.name, "Target");
        assert_eq!(seen.get(), Some(BodyId(0)));

        assert!(engine.click(0.0, 0.0).is_none());
        assert_eq!(engine.scene().selected(), None);
    }

    #[test]
    fn hover_follows_the_pointer() {
        let mut cfg = small_config();
        cfg.catalog = Catalog::new(SunDescriptor::default(), vec![CelestialBodyDescriptor::new("P", 40.0, 0.0)]);
        let mut engine = Engine::with_seed(cfg, 1, 160, 100);
        let spot = engine.scene().screen_positions()[0];
        assert_eq!(engine.hover_at(spot.x, spot.y), Some(BodyId(0)));
        assert_eq!(engine.scene().hovered(), Some(BodyId(0)));
        engine.clear_hover();
        assert_eq!(engine.scene().hovered(), None);
    }

    #[test]
    fn render_tracks_resize() {
        let mut engine = Engine::with_seed(small_config(), 1, 40, 20);
        assert_eq!(engine.render().width(), 40);
        engine.resize(64, 32);
        let fb = engine.render();
        assert_eq!((fb.width(), fb.height()), (64, 32));
    }
}
