//! Software renderer. Each sphere is ray-cast over its projected bounding
//! box; passes run background → opaque → glow → overlay.

use crate::camera::{Camera, Ray};
use crate::catalog::BodyId;
use crate::glow::{BlendMode, Culling, GlowShell, RenderPass, RingSpec};
use crate::launch::FlashOverlay;
use crate::math::{clamp01, smoothstep, Rgb};
use crate::scene::Scene;
use crate::texture::SynthesizedTexture;
use glam::{Quat, Vec3};
use std::f32::consts::{PI, TAU};

pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Vec3>,
    /// Ray distance of the nearest opaque surface; `INFINITY` when empty.
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let n = (width as usize) * (height as usize);
        Self { width, height, color: vec![Vec3::ZERO; n], depth: vec![f32::INFINITY; n] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != (self.width, self.height) {
            *self = Self::new(width, height);
        }
    }

    pub fn clear(&mut self, color: Vec3) {
        self.color.fill(color);
        self.depth.fill(f32::INFINITY);
    }

    fn idx(&self, x: u32, y: u32) -> usize {
        (y * self.width + x) as usize
    }

    pub fn pixel(&self, x: u32, y: u32) -> Vec3 {
        if x >= self.width || y >= self.height {
            return Vec3::ZERO;
        }
        self.color[self.idx(x, y)]
    }

    pub fn depth(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return f32::INFINITY;
        }
        self.depth[self.idx(x, y)]
    }

    pub fn rgb(&self, x: u32, y: u32) -> Rgb {
        Rgb::from_unit(self.pixel(x, y))
    }

    /// Packed 8-bit RGB rows, top to bottom.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.color.len() * 3);
        for c in &self.color {
            let p = Rgb::from_unit(*c);
            out.extend_from_slice(&[p.r, p.g, p.b]);
        }
        out
    }

    fn add(&mut self, x: u32, y: u32, c: Vec3) {
        let i = self.idx(x, y);
        self.color[i] += c;
    }

    fn blend(&mut self, x: u32, y: u32, c: Vec3, alpha: f32, mode: BlendMode) {
        let i = self.idx(x, y);
        let a = clamp01(alpha);
        self.color[i] = match mode {
            BlendMode::Additive => self.color[i] + c * a,
            BlendMode::Alpha => self.color[i].lerp(c, a),
        };
    }
}

/// Pixel rectangle `[x0, x1) × [y0, y1)` covering a sphere's projection.
fn sphere_bounds(cam: &Camera, center: Vec3, radius: f32, w: u32, h: u32) -> Option<(u32, u32, u32, u32)> {
    let (wf, hf) = (w as f32, h as f32);
    let (x0, y0, x1, y1) = match cam.project(center, wf, hf) {
        Some(p) if p.z > radius * 1.05 => {
            let r = cam.projected_radius(radius, p.z - radius, hf) * 1.1 + 2.0;
            (p.x - r, p.y - r, p.x + r, p.y + r)
        }
        // camera inside or very near the sphere: scan everything
        _ if (cam.position - center).length() < radius * 1.05 => (0.0, 0.0, wf, hf),
        _ => return None,
    };
    let cx = |v: f32| v.clamp(0.0, wf) as u32;
    let cy = |v: f32| v.clamp(0.0, hf) as u32;
    let b = (cx(x0), cy(y0), cx(x1.ceil()), cy(y1.ceil()));
    (b.0 < b.2 && b.1 < b.3).then_some(b)
}

/// Equirectangular coordinates of a unit direction in body space.
fn sphere_uv(n: Vec3) -> (f32, f32) {
    let u = 0.5 + n.z.atan2(n.x) / TAU;
    let v = n.y.clamp(-1.0, 1.0).acos() / PI;
    (u, v)
}

fn textured(tex: Option<&SynthesizedTexture>, flat: Rgb, local: Vec3) -> Vec3 {
    match tex {
        Some(t) => {
            let (u, v) = sphere_uv(local);
            t.sample(u, v).to_unit()
        }
        None => flat.to_unit(),
    }
}

/// Tilts a body-space normal by the texture's luminance slope.
fn bumped(tex: Option<&SynthesizedTexture>, local: Vec3, strength: f32) -> Vec3 {
    let Some(t) = tex.filter(|t| t.slopes.is_some()) else {
        return local;
    };
    let (u, v) = sphere_uv(local);
    let s = t.slope(u, v);
    let east = Vec3::new(-local.z, 0.0, local.x).normalize_or_zero();
    let south = local.cross(east).normalize_or_zero();
    (local - (east * s.x + south * s.y) * strength).normalize_or_zero()
}

#[derive(Clone, Copy)]
struct GlowDraw<'a> {
    pass: RenderPass,
    center: Vec3,
    body_radius: f32,
    frame: Quat,
    layer: GlowLayer<'a>,
    depth: f32,
}

#[derive(Clone, Copy)]
enum GlowLayer<'a> {
    Shell(&'a GlowShell),
    Ring(&'a RingSpec),
}

pub struct Renderer {
    pub background: Vec3,
    pub star_gain: f32,
    pub bump_strength: f32,
    /// Brightens the selected body's rim.
    pub highlight: Vec3,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            background: Vec3::new(0.004, 0.005, 0.016),
            star_gain: 0.85,
            bump_strength: 0.9,
            highlight: Vec3::new(0.35, 0.45, 0.6),
        }
    }
}

impl Renderer {
    pub fn render(&self, scene: &Scene, flash: Option<FlashOverlay>, fb: &mut Framebuffer) {
        let (w, h) = scene.viewport();
        fb.resize(w, h);
        fb.clear(self.background);
        self.draw_stars(scene, fb);
        self.draw_sun(scene, fb);
        for id in scene.body_ids() {
            self.draw_body(scene, id, fb);
        }
        self.draw_glow(scene, fb);
        if let Some(f) = flash {
            self.draw_flash(f, fb);
        }
    }

    fn draw_stars(&self, scene: &Scene, fb: &mut Framebuffer) {
        let cam = scene.camera();
        let (wf, hf) = (fb.width as f32, fb.height as f32);
        for layer in scene.starfield().layers() {
            let rot = layer.orientation();
            for star in &layer.points {
                let Some(p) = cam.project(rot * star.position, wf, hf) else {
                    continue;
                };
                if p.x < 0.0 || p.y < 0.0 || p.x >= wf || p.y >= hf {
                    continue;
                }
                let c = star.color.to_unit() * self.star_gain * (star.size / 2.0).min(1.0);
                let (x, y) = (p.x as u32, p.y as u32);
                fb.add(x, y, c);
                if star.size > 1.8 {
                    let halo = c * 0.35;
                    if x + 1 < fb.width {
                        fb.add(x + 1, y, halo);
                    }
                    if y + 1 < fb.height {
                        fb.add(x, y + 1, halo);
                    }
                }
            }
        }
    }

    fn draw_sun(&self, scene: &Scene, fb: &mut Framebuffer) {
        let cam = scene.camera();
        let sun = scene.sun();
        let center = scene.lighting().sun.position;
        let radius = sun.descriptor.radius;
        let spin = Quat::from_rotation_y(scene.orbits().sun_angle());
        let inv = spin.inverse();
        let Some((x0, y0, x1, y1)) = sphere_bounds(cam, center, radius, fb.width, fb.height) else {
            return;
        };
        let (wf, hf) = (fb.width as f32, fb.height as f32);
        for y in y0..y1 {
            for x in x0..x1 {
                let ray = cam.screen_ray(x as f32 + 0.5, y as f32 + 0.5, wf, hf);
                let Some(t) = ray.hit_sphere(center, radius) else {
                    continue;
                };
                if t >= fb.depth(x, y) {
                    continue;
                }
                let n = (ray.at(t) - center) / radius;
                let base = textured(sun.texture.as_deref(), sun.descriptor.color, inv * n);
                let limb = 0.55 + 0.45 * n.dot(-ray.dir).max(0.0);
                let i = fb.idx(x, y);
                fb.color[i] = base * 1.25 * limb;
                fb.depth[i] = t;
            }
        }
    }

    fn draw_body(&self, scene: &Scene, id: BodyId, fb: &mut Framebuffer) {
        let (Some(center), Some(radius), Some(rot)) =
            (scene.body_position(id), scene.body_radius(id), scene.orbits().body_rotation(id))
        else {
            return;
        };
        let Some(visual) = scene.bodies().get(id.0) else {
            return;
        };
        let cam = scene.camera();
        let Some((x0, y0, x1, y1)) = sphere_bounds(cam, center, radius, fb.width, fb.height) else {
            return;
        };
        let inv = rot.inverse();
        let tex = visual.texture.as_deref();
        let selected = scene.selected() == Some(id);
        let (wf, hf) = (fb.width as f32, fb.height as f32);
        for y in y0..y1 {
            for x in x0..x1 {
                let ray = cam.screen_ray(x as f32 + 0.5, y as f32 + 0.5, wf, hf);
                let Some(t) = ray.hit_sphere(center, radius) else {
                    continue;
                };
                if t >= fb.depth(x, y) {
                    continue;
                }
                let p = ray.at(t);
                let n = (p - center) / radius;
                let local = inv * n;
                let shading_n = rot * bumped(tex, local, self.bump_strength);
                let albedo = textured(tex, visual.descriptor.color, local);
                let lit = scene.lighting().shade(p, shading_n);
                let mut c = albedo * scene.lighting().sun.color * lit;
                if selected {
                    let rim = (1.0 - n.dot(-ray.dir).max(0.0)).powi(3);
                    c += self.highlight * rim;
                }
                let i = fb.idx(x, y);
                fb.color[i] = c;
                fb.depth[i] = t;
            }
        }
    }

    fn glow_draws<'a>(&self, scene: &'a Scene) -> Vec<GlowDraw<'a>> {
        let cam_pos = scene.camera().position;
        let mut draws = Vec::new();
        let sun = scene.sun();
        let sun_center = scene.lighting().sun.position;
        let sun_frame = Quat::from_rotation_y(scene.orbits().sun_angle());
        for shell in &sun.glow.shells {
            draws.push(GlowDraw {
                pass: shell.pass,
                center: sun_center,
                body_radius: sun.descriptor.radius,
                frame: sun_frame,
                layer: GlowLayer::Shell(shell),
                depth: (sun_center - cam_pos).length(),
            });
        }
        for (id, visual) in scene.body_ids().zip(scene.bodies()) {
            let (Some(center), Some(radius), Some(frame)) =
                (scene.body_position(id), scene.body_radius(id), scene.orbits().body_rotation(id))
            else {
                continue;
            };
            let depth = (center - cam_pos).length();
            for shell in &visual.glow.shells {
                draws.push(GlowDraw { pass: shell.pass, center, body_radius: radius, frame, layer: GlowLayer::Shell(shell), depth });
            }
            if let Some(ring) = &visual.glow.ring {
                let frame = scene.orbits().system_rotation();
                draws.push(GlowDraw { pass: ring.pass(), center, body_radius: radius, frame, layer: GlowLayer::Ring(ring), depth });
            }
        }
        // pass order first, then back to front
        draws.sort_by(|a, b| a.pass.cmp(&b.pass).then(b.depth.total_cmp(&a.depth)));
        draws
    }

    fn draw_glow(&self, scene: &Scene, fb: &mut Framebuffer) {
        for d in self.glow_draws(scene) {
            match d.layer {
                GlowLayer::Shell(shell) => self.draw_shell(scene, &d, shell, fb),
                GlowLayer::Ring(ring) => self.draw_ring(scene, &d, ring, fb),
            }
        }
    }

    fn draw_shell(&self, scene: &Scene, d: &GlowDraw<'_>, shell: &GlowShell, fb: &mut Framebuffer) {
        let cam = scene.camera();
        let radius = d.body_radius * shell.radius_scale;
        let Some((x0, y0, x1, y1)) = sphere_bounds(cam, d.center, radius, fb.width, fb.height) else {
            return;
        };
        let inv = d.frame.inverse();
        let color = shell.color.to_unit();
        let (wf, hf) = (fb.width as f32, fb.height as f32);
        for y in y0..y1 {
            for x in x0..x1 {
                let ray = cam.screen_ray(x as f32 + 0.5, y as f32 + 0.5, wf, hf);
                let Some((near, far)) = ray.intersect_sphere(d.center, radius) else {
                    continue;
                };
                let t = match shell.culling {
                    Culling::Front => far,
                    Culling::Back if near > 0.0 => near,
                    Culling::Back => continue,
                    Culling::None => {
                        if near > 0.0 {
                            near
                        } else {
                            far
                        }
                    }
                };
                if t >= fb.depth(x, y) {
                    continue;
                }
                let p = ray.at(t);
                let n = (p - d.center) / radius;
                let edge = smoothstep(1.0, 0.8, ray.distance_to_point(d.center) / radius);
                let a = shell.intensity(n, -ray.dir, inv * n, scene.time()) * edge;
                fb.blend(x, y, color, a, shell.blend);
                if shell.depth_write {
                    let i = fb.idx(x, y);
                    fb.depth[i] = t;
                }
            }
        }
    }

    fn draw_ring(&self, scene: &Scene, d: &GlowDraw<'_>, ring: &RingSpec, fb: &mut Framebuffer) {
        let cam = scene.camera();
        let outer = d.body_radius * ring.outer_scale;
        let inner = d.body_radius * ring.inner_scale;
        let Some((x0, y0, x1, y1)) = sphere_bounds(cam, d.center, outer, fb.width, fb.height) else {
            return;
        };
        let normal = ring.normal(d.frame);
        let color = ring.color.to_unit();
        let (wf, hf) = (fb.width as f32, fb.height as f32);
        for y in y0..y1 {
            for x in x0..x1 {
                let ray: Ray = cam.screen_ray(x as f32 + 0.5, y as f32 + 0.5, wf, hf);
                let Some(t) = ray.intersect_plane(d.center, normal) else {
                    continue;
                };
                if t >= fb.depth(x, y) {
                    continue;
                }
                let p = ray.at(t);
                let r = (p - d.center).length();
                let a = ring.alpha_at((r - inner) / (outer - inner));
                if a <= 0.0 {
                    continue;
                }
                // planet shadow on the far half of the ring
                let lit = scene.lighting().shade(p, normal).max(scene.lighting().shade(p, -normal));
                let to_sun = (scene.lighting().sun.position - p).normalize_or_zero();
                let shadowed = Ray::new(p, to_sun).hit_sphere(d.center, d.body_radius).is_some();
                let k = if shadowed { 0.25 } else { lit.max(0.45) };
                fb.blend(x, y, color * k, a, ring.blend());
            }
        }
    }

    fn draw_flash(&self, flash: FlashOverlay, fb: &mut Framebuffer) {
        if flash.opacity <= 0.0 || flash.scale <= 0.0 {
            return;
        }
        let (wf, hf) = (fb.width as f32, fb.height as f32);
        let (cx, cy) = (wf * 0.5, hf * 0.5);
        let radius = flash.scale * (cx * cx + cy * cy).sqrt();
        for y in 0..fb.height {
            for x in 0..fb.width {
                let d = ((x as f32 + 0.5 - cx).powi(2) + (y as f32 + 0.5 - cy).powi(2)).sqrt();
                let cover = if flash.scale >= 1.0 { 1.0 } else { smoothstep(radius + 1.5, radius - 1.5, d) };
                if cover > 0.0 {
                    fb.blend(x, y, Vec3::ONE, flash.opacity * cover, BlendMode::Alpha);
                }
            }
        }
    }
}
