//! Scene compositor: one sun, the catalog's bodies in order, the starfield,
//! and everything needed to shade and pick them.

use crate::camera::{Camera, Ray};
use crate::catalog::{BodyId, BodyKind, Catalog, CelestialBodyDescriptor, ElementTag, SunDescriptor};
use crate::config::EngineConfig;
use crate::glow::GlowStack;
use crate::orbit::{OrbitalModel, SpeedMultipliers};
use crate::starfield::Starfield;
use crate::texture::{SynthesizedTexture, TextureSynthesizer};
use glam::Vec3;
use serde::Serialize;
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    pub sun: PointLight,
    pub ambient: f32,
}

impl Lighting {
    /// Lambert term from the sun plus ambient fill, in [ambient, 1].
    pub fn shade(&self, point: Vec3, normal: Vec3) -> f32 {
        let to_light = (self.sun.position - point).normalize_or_zero();
        let diffuse = normal.dot(to_light).max(0.0) * self.sun.intensity;
        (self.ambient + (1.0 - self.ambient) * diffuse).min(1.0)
    }
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            sun: PointLight { position: Vec3::ZERO, color: Vec3::new(1.0, 0.96, 0.9), intensity: 1.0 },
            ambient: 0.08,
        }
    }
}

/// Data handed to the UI layer when a body is selected.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InfoPanel {
    pub id: BodyId,
    pub name: String,
    pub element: ElementTag,
    pub orbit_radius: f32,
    pub orbit_speed: f32,
    pub description: Option<String>,
}

impl InfoPanel {
    fn from_descriptor(id: BodyId, d: &CelestialBodyDescriptor) -> Self {
        Self {
            id,
            name: d.name.clone(),
            element: d.element,
            orbit_radius: d.orbit_radius,
            orbit_speed: d.orbit_speed,
            description: d.description.clone(),
        }
    }
}

/// Everything the renderer needs for one body besides its orbital state.
#[derive(Clone, Debug)]
pub struct BodyVisual {
    pub descriptor: CelestialBodyDescriptor,
    pub kind: BodyKind,
    /// `None` renders the flat base colour.
    pub texture: Option<Rc<SynthesizedTexture>>,
    pub glow: GlowStack,
}

#[derive(Clone, Debug)]
pub struct SunVisual {
    pub descriptor: SunDescriptor,
    pub texture: Option<Rc<SynthesizedTexture>>,
    pub glow: GlowStack,
}

/// Screen-space placement of a body for labels and overlays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenBody {
    pub id: BodyId,
    pub x: f32,
    pub y: f32,
    pub depth: f32,
    pub pixel_radius: f32,
}

fn texture_or_flat(textures: &mut TextureSynthesizer, name: &str) -> Option<Rc<SynthesizedTexture>> {
    match textures.synthesize(name) {
        Ok(tex) => Some(tex),
        Err(e) => {
            warn!(body = name, error = %e, "texture synthesis failed, using flat colour");
            None
        }
    }
}

pub struct Scene {
    catalog: Catalog,
    camera: Camera,
    lighting: Lighting,
    orbits: OrbitalModel,
    starfield: Starfield,
    textures: TextureSynthesizer,
    sun: SunVisual,
    bodies: Vec<BodyVisual>,
    hovered: Option<BodyId>,
    selected: Option<BodyId>,
    time: f32,
    width: u32,
    height: u32,
}

impl Scene {
    pub fn new(config: &EngineConfig, seed: u64, width: u32, height: u32) -> Self {
        Self::with_synthesizer(config, TextureSynthesizer::new(&config.texture, seed), seed, width, height)
    }

    /// Builds the scene around a caller-supplied synthesizer (custom palettes
    /// or texture sizes).
    pub fn with_synthesizer(
        config: &EngineConfig,
        mut textures: TextureSynthesizer,
        seed: u64,
        width: u32,
        height: u32,
    ) -> Self {
        let catalog = config.catalog.sanitized();
        if catalog.is_empty() {
            info!("catalog has no bodies, rendering sun only");
        }

        let sun = SunVisual {
            texture: texture_or_flat(&mut textures, &catalog.sun.name),
            descriptor: catalog.sun.clone(),
            glow: GlowStack::for_sun(),
        };
        let bodies = catalog
            .bodies
            .iter()
            .map(|d| BodyVisual {
                texture: texture_or_flat(&mut textures, &d.name),
                kind: d.effective_kind(),
                glow: GlowStack::for_body(d),
                descriptor: d.clone(),
            })
            .collect();

        let (width, height) = (width.max(1), height.max(1));
        let camera = Camera::from_config(&config.camera, width as f32 / height as f32);
        let orbits = OrbitalModel::new(&catalog, &config.orbit);
        let starfield = Starfield::new(&config.starfield, seed);
        debug!(
            bodies = catalog.len(),
            stars = starfield.total_points(),
            textures = textures.generated_count(),
            "scene built"
        );

        Self {
            catalog,
            camera,
            lighting: Lighting::default(),
            orbits,
            starfield,
            textures,
            sun,
            bodies,
            hovered: None,
            selected: None,
            time: 0.0,
            width,
            height,
        }
    }

    pub fn advance(&mut self, dt: f32, m: &SpeedMultipliers) {
        self.time += dt;
        self.orbits.advance(dt, m);
        self.starfield.advance(dt, m.system);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.camera.set_aspect(self.width as f32 / self.height as f32);
    }

    pub fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn orbits(&self) -> &OrbitalModel {
        &self.orbits
    }

    pub fn starfield(&self) -> &Starfield {
        &self.starfield
    }

    pub fn textures(&self) -> &TextureSynthesizer {
        &self.textures
    }

    pub fn sun(&self) -> &SunVisual {
        &self.sun
    }

    pub fn bodies(&self) -> &[BodyVisual] {
        &self.bodies
    }

    pub fn body_ids(&self) -> impl Iterator<Item = BodyId> {
        (0..self.bodies.len()).map(BodyId)
    }

    /// Seconds of scene time, used for shimmer.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn hovered(&self) -> Option<BodyId> {
        self.hovered
    }

    pub fn selected(&self) -> Option<BodyId> {
        self.selected
    }

    pub fn body_position(&self, id: BodyId) -> Option<Vec3> {
        self.orbits.world_position(id)
    }

    pub fn body_radius(&self, id: BodyId) -> Option<f32> {
        self.orbits.display_radius(id)
    }

    pub fn sun_radius(&self) -> f32 {
        self.sun.descriptor.radius
    }

    /// Nearest body hit by `ray`. The sun is not selectable, but it blocks
    /// bodies behind it.
    pub fn pick_ray(&self, ray: &Ray) -> Option<BodyId> {
        let nearest = self
            .body_ids()
            .filter_map(|id| {
                let center = self.body_position(id)?;
                let radius = self.body_radius(id)?;
                ray.hit_sphere(center, radius).map(|t| (id, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let (id, t) = nearest?;
        match ray.hit_sphere(self.lighting.sun.position, self.sun_radius()) {
            Some(sun_t) if sun_t < t => None,
            _ => Some(id),
        }
    }

    pub fn pick(&self, x: f32, y: f32) -> Option<BodyId> {
        let ray = self.camera.screen_ray(x, y, self.width as f32, self.height as f32);
        self.pick_ray(&ray)
    }

    /// Updates the hover target; returns whether it changed.
    pub fn hover(&mut self, id: Option<BodyId>) -> bool {
        let id = id.filter(|i| i.0 < self.bodies.len());
        if id == self.hovered {
            return false;
        }
        self.hovered = id;
        self.orbits.set_hovered(id);
        true
    }

    pub fn select(&mut self, id: Option<BodyId>) -> Option<InfoPanel> {
        self.selected = id.filter(|i| i.0 < self.bodies.len());
        self.selected.and_then(|i| self.info_panel(i))
    }

    pub fn info_panel(&self, id: BodyId) -> Option<InfoPanel> {
        self.catalog.get(id).map(|d| InfoPanel::from_descriptor(id, d))
    }

    /// Projected centre and pixel radius of every body in front of the camera.
    pub fn screen_positions(&self) -> Vec<ScreenBody> {
        let (w, h) = (self.width as f32, self.height as f32);
        self.body_ids()
            .filter_map(|id| {
                let p = self.camera.project(self.body_position(id)?, w, h)?;
                let radius = self.body_radius(id)?;
                Some(ScreenBody {
                    id,
                    x: p.x,
                    y: p.y,
                    depth: p.z,
                    pixel_radius: self.camera.projected_radius(radius, p.z, h),
                })
            })
            .collect()
    }
}
