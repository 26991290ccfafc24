//! Procedural surface textures.
//!
//! Every texture is built in three passes over an equirectangular buffer:
//! a 2–3 stop gradient, soft radial blobs for surface detail, and an optional
//! sparse dot pass for rough terrain. Results are cached by (lowercased) name
//! since a body's appearance is derived from its name and the session seed.

use crate::config::TextureConfig;
use crate::error::{EngineError, Result};
use crate::math::{clamp01, fbm, name_seed, smoothstep, Rgb};
use glam::{Vec2, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradientKind {
    /// Pole to pole.
    Vertical,
    /// Tilted sweep, reads as hemispheric shading variation.
    Diagonal,
    /// Centre outwards.
    Radial,
    /// Latitude bands warped by noise (gas giants).
    Banded { bands: u8 },
}

/// Blob pass flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceTreatment {
    /// Muted patches in the palette colours.
    Mottled,
    /// Small dark spots.
    Sunspots,
    /// Many bright, low-opacity cells.
    Granulation,
    /// Dark bowls.
    Craters,
    /// Wide, flattened white streaks.
    Clouds,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    pub primary: Rgb,
    pub secondary: Rgb,
    pub tertiary: Option<Rgb>,
    pub gradient: GradientKind,
    pub treatments: Vec<SurfaceTreatment>,
    /// Adds the sparse dot pass.
    pub rough: bool,
}

impl Palette {
    pub fn generic_rocky() -> Palette {
        Palette {
            primary: Rgb::new(120, 112, 104),
            secondary: Rgb::new(168, 158, 146),
            tertiary: Some(Rgb::new(92, 86, 80)),
            gradient: GradientKind::Diagonal,
            treatments: vec![SurfaceTreatment::Mottled, SurfaceTreatment::Craters],
            rough: true,
        }
    }

    fn stop(&self, t: f32) -> Rgb {
        let t = clamp01(t);
        match self.tertiary {
            None => self.primary.mix(self.secondary, t),
            Some(_) if t < 0.5 => self.primary.mix(self.secondary, t * 2.0),
            Some(third) => self.secondary.mix(third, (t - 0.5) * 2.0),
        }
    }
}

/// Name → palette map with a generic fallback.
#[derive(Clone, Debug)]
pub struct PaletteRegistry {
    palettes: HashMap<String, Palette>,
    fallback: Palette,
}

impl Default for PaletteRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PaletteRegistry {
    pub fn empty() -> Self {
        Self { palettes: HashMap::new(), fallback: Palette::generic_rocky() }
    }

    pub fn register(&mut self, name: &str, palette: Palette) {
        self.palettes.insert(name.to_ascii_lowercase(), palette);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.palettes.contains_key(&name.to_ascii_lowercase())
    }

    /// Never fails: unknown names get the generic rocky palette.
    pub fn lookup(&self, name: &str) -> &Palette {
        self.palettes.get(&name.to_ascii_lowercase()).unwrap_or(&self.fallback)
    }

    pub fn builtin() -> Self {
        use GradientKind::*;
        use SurfaceTreatment::*;

        let mut reg = Self::empty();
        let mut add = |name: &str,
                       primary: Rgb,
                       secondary: Rgb,
                       tertiary: Option<Rgb>,
                       gradient: GradientKind,
                       treatments: &[SurfaceTreatment],
                       rough: bool| {
            reg.register(
                name,
                Palette { primary, secondary, tertiary, gradient, treatments: treatments.to_vec(), rough },
            );
        };

        add(
            "sun",
            Rgb::new(255, 150, 40),
            Rgb::new(255, 200, 80),
            Some(Rgb::new(255, 236, 170)),
            Radial,
            &[Granulation, Sunspots],
            false,
        );
        add(
            "mercury",
            Rgb::new(110, 108, 112),
            Rgb::new(160, 156, 160),
            None,
            Diagonal,
            &[Craters],
            true,
        );
        add(
            "venus",
            Rgb::new(220, 170, 90),
            Rgb::new(245, 215, 150),
            Some(Rgb::new(200, 150, 80)),
            Banded { bands: 5 },
            &[Clouds],
            false,
        );
        add(
            "earth",
            Rgb::new(20, 60, 130),
            Rgb::new(40, 110, 170),
            Some(Rgb::new(30, 70, 140)),
            Vertical,
            &[Mottled, Clouds],
            false,
        );
        add(
            "mars",
            Rgb::new(170, 70, 40),
            Rgb::new(215, 110, 60),
            Some(Rgb::new(150, 60, 35)),
            Diagonal,
            &[Mottled, Craters],
            true,
        );
        add(
            "jupiter",
            Rgb::new(200, 160, 120),
            Rgb::new(240, 220, 190),
            Some(Rgb::new(170, 110, 80)),
            Banded { bands: 9 },
            &[Mottled],
            false,
        );
        add(
            "saturn",
            Rgb::new(210, 185, 135),
            Rgb::new(240, 225, 185),
            None,
            Banded { bands: 7 },
            &[Mottled],
            false,
        );
        add(
            "uranus",
            Rgb::new(140, 210, 215),
            Rgb::new(190, 240, 240),
            None,
            Vertical,
            &[Clouds],
            false,
        );
        add(
            "neptune",
            Rgb::new(50, 90, 190),
            Rgb::new(90, 140, 230),
            Some(Rgb::new(40, 70, 160)),
            Banded { bands: 4 },
            &[Clouds, Sunspots],
            false,
        );
        add(
            "pluto",
            Rgb::new(150, 130, 115),
            Rgb::new(215, 200, 185),
            None,
            Diagonal,
            &[Mottled],
            true,
        );
        reg
    }
}

/// Equirectangular colour buffer, `u` along longitude and `v` pole to pole.
#[derive(Clone, Debug, PartialEq)]
pub struct SynthesizedTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Rgb>,
    /// Per-texel luminance slope (d/du, d/dv) used to perturb shading normals.
    pub slopes: Option<Vec<Vec2>>,
}

impl SynthesizedTexture {
    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let x = x.min(self.width - 1);
        let y = y.min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }

    /// Bilinear sample; `u` wraps, `v` clamps.
    pub fn sample(&self, u: f32, v: f32) -> Rgb {
        let fx = u.rem_euclid(1.0) * self.width as f32 - 0.5;
        let fy = (clamp01(v) * self.height as f32 - 0.5).max(0.0);
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let w = self.width as i64;
        let wrap = |x: i64| x.rem_euclid(w) as u32;
        let (xa, xb) = (wrap(x0 as i64), wrap(x0 as i64 + 1));
        let (ya, yb) = (y0 as u32, y0 as u32 + 1);

        let top = self.pixel(xa, ya).to_unit().lerp(self.pixel(xb, ya).to_unit(), tx);
        let bottom = self.pixel(xa, yb).to_unit().lerp(self.pixel(xb, yb).to_unit(), tx);
        Rgb::from_unit(top.lerp(bottom, ty))
    }

    pub fn slope(&self, u: f32, v: f32) -> Vec2 {
        let Some(slopes) = &self.slopes else {
            return Vec2::ZERO;
        };
        let x = ((u.rem_euclid(1.0) * self.width as f32) as u32).min(self.width - 1);
        let y = ((clamp01(v) * self.height as f32) as u32).min(self.height - 1);
        slopes[(y * self.width + x) as usize]
    }
}

pub struct TextureSynthesizer {
    width: u32,
    height: u32,
    normal_maps: bool,
    seed: u64,
    palettes: PaletteRegistry,
    cache: HashMap<String, Rc<SynthesizedTexture>>,
    generated: usize,
}

impl TextureSynthesizer {
    pub fn new(config: &TextureConfig, seed: u64) -> Self {
        Self::with_palettes(config, seed, PaletteRegistry::builtin())
    }

    pub fn with_palettes(config: &TextureConfig, seed: u64, palettes: PaletteRegistry) -> Self {
        Self {
            width: config.width,
            height: config.height,
            normal_maps: config.normal_maps,
            seed,
            palettes,
            cache: HashMap::new(),
            generated: 0,
        }
    }

    pub fn palettes(&self) -> &PaletteRegistry {
        &self.palettes
    }

    /// Number of textures actually generated (cache misses).
    pub fn generated_count(&self) -> usize {
        self.generated
    }

    pub fn cached(&self, name: &str) -> Option<Rc<SynthesizedTexture>> {
        self.cache.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Returns the cached texture for `name`, generating it on first use.
    pub fn synthesize(&mut self, name: &str) -> Result<Rc<SynthesizedTexture>> {
        let key = name.to_ascii_lowercase();
        if let Some(tex) = self.cache.get(&key) {
            debug!(texture = name, "texture cache hit");
            return Ok(Rc::clone(tex));
        }

        let palette = self.palettes.lookup(&key).clone();
        let mut rng = StdRng::seed_from_u64(self.seed ^ name_seed(&key));
        let tex = Rc::new(bake(
            name,
            self.width,
            self.height,
            &palette,
            self.normal_maps,
            &mut rng,
        )?);
        self.generated += 1;
        debug!(texture = name, width = self.width, height = self.height, "texture generated");
        self.cache.insert(key, Rc::clone(&tex));
        Ok(tex)
    }
}

fn alloc<T: Clone>(name: &str, len: usize, fill: T) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| EngineError::TextureAlloc {
        name: name.to_string(),
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, fill);
    Ok(v)
}

fn bake(
    name: &str,
    width: u32,
    height: u32,
    palette: &Palette,
    normal_maps: bool,
    rng: &mut StdRng,
) -> Result<SynthesizedTexture> {
    if width == 0 || height == 0 {
        return Err(EngineError::EmptyTexture { name: name.to_string(), width, height });
    }
    let len = (width as usize).saturating_mul(height as usize);
    let mut buf = alloc(name, len, Vec3::ZERO)?;
    let noise_seed = rng.gen::<u32>();

    paint_gradient(&mut buf, width, height, palette, noise_seed);
    for &treatment in &palette.treatments {
        paint_blobs(&mut buf, width, height, palette, treatment, rng);
    }
    if palette.rough {
        paint_grit(&mut buf, width, height, rng);
    }

    let mut pixels = alloc(name, len, Rgb::BLACK)?;
    for (dst, src) in pixels.iter_mut().zip(&buf) {
        *dst = Rgb::from_unit(*src);
    }
    let slopes = if normal_maps { Some(luma_slopes(name, &pixels, width, height)?) } else { None };

    Ok(SynthesizedTexture { name: name.to_string(), width, height, pixels, slopes })
}

fn paint_gradient(buf: &mut [Vec3], width: u32, height: u32, palette: &Palette, seed: u32) {
    let (wf, hf) = (width as f32, height as f32);
    for y in 0..height {
        for x in 0..width {
            let u = (x as f32 + 0.5) / wf;
            let v = (y as f32 + 0.5) / hf;
            let t = match palette.gradient {
                GradientKind::Vertical => v,
                GradientKind::Diagonal => 0.35 * u + 0.65 * v,
                GradientKind::Radial => {
                    let d = Vec2::new(u - 0.5, (v - 0.5) * 2.0).length();
                    clamp01(d / 0.75)
                }
                GradientKind::Banded { bands } => {
                    // sample on a cylinder so the seam at u = 0/1 matches
                    let ang = u * std::f32::consts::TAU;
                    let p = Vec3::new(ang.cos() * 1.5, v * 6.0, ang.sin() * 1.5);
                    let warp = fbm(p, seed, 4) - 0.5;
                    0.5 + 0.5 * ((v * bands as f32 + warp * 1.6) * std::f32::consts::PI).sin()
                }
            };
            buf[(y * width + x) as usize] = palette.stop(t).to_unit();
        }
    }
}

fn paint_blobs(
    buf: &mut [Vec3],
    width: u32,
    height: u32,
    palette: &Palette,
    treatment: SurfaceTreatment,
    rng: &mut StdRng,
) {
    let wf = width as f32;
    let (count, radius_frac, opacity, squash) = match treatment {
        SurfaceTreatment::Mottled => (rng.gen_range(40..=90), (0.03, 0.10), (0.10, 0.35), 1.0),
        SurfaceTreatment::Sunspots => (rng.gen_range(12..=30), (0.01, 0.035), (0.45, 0.85), 1.0),
        SurfaceTreatment::Granulation => (rng.gen_range(120..=220), (0.01, 0.03), (0.12, 0.40), 1.0),
        SurfaceTreatment::Craters => (rng.gen_range(30..=80), (0.01, 0.05), (0.20, 0.50), 1.0),
        SurfaceTreatment::Clouds => (rng.gen_range(25..=60), (0.04, 0.10), (0.20, 0.55), 0.35),
    };

    for _ in 0..count {
        let cx = rng.gen_range(0.0..wf);
        let cy = rng.gen_range(0.0..height as f32);
        let r = (rng.gen_range(radius_frac.0..radius_frac.1) * wf).max(1.0);
        let alpha = rng.gen_range(opacity.0..opacity.1);
        let color = match treatment {
            SurfaceTreatment::Mottled => {
                let other = palette.tertiary.unwrap_or(palette.secondary);
                palette.primary.mix(other, rng.gen::<f32>())
            }
            SurfaceTreatment::Sunspots => palette.primary.scale(0.22),
            SurfaceTreatment::Granulation => {
                palette.tertiary.unwrap_or(palette.secondary).mix(Rgb::WHITE, 0.35)
            }
            SurfaceTreatment::Craters => palette.primary.scale(0.55),
            SurfaceTreatment::Clouds => Rgb::new(245, 245, 250),
        }
        .to_unit();

        let ry = r * squash;
        let y0 = (cy - ry).floor().max(0.0) as u32;
        let y1 = ((cy + ry).ceil() as u32).min(height - 1);
        let span = r.ceil() as i64;
        for y in y0..=y1 {
            let dy = (y as f32 + 0.5 - cy) / ry;
            for dx_px in -span..=span {
                let x = (cx as i64 + dx_px).rem_euclid(width as i64) as u32;
                let dx = (cx.floor() + dx_px as f32 + 0.5 - cx) / r;
                let d = (dx * dx + dy * dy).sqrt();
                if d >= 1.0 {
                    continue;
                }
                let falloff = 1.0 - smoothstep(0.0, 1.0, d);
                let a = alpha * falloff * falloff;
                let px = &mut buf[(y * width + x) as usize];
                *px = px.lerp(color, a);
            }
        }
    }
}

fn paint_grit(buf: &mut [Vec3], width: u32, height: u32, rng: &mut StdRng) {
    let dots = (width as usize * height as usize) / 40;
    for _ in 0..dots {
        let x = rng.gen_range(0..width);
        let y = rng.gen_range(0..height);
        let a = rng.gen_range(0.3..1.0);
        let tone = if rng.gen_bool(0.6) { 0.55 } else { 1.35 };
        let px = &mut buf[(y * width + x) as usize];
        *px = px.lerp(*px * tone, a);
    }
}

fn luma_slopes(name: &str, pixels: &[Rgb], width: u32, height: u32) -> Result<Vec<Vec2>> {
    let mut out = alloc(name, pixels.len(), Vec2::ZERO)?;
    let luma = |x: i64, y: i64| {
        let x = x.rem_euclid(width as i64) as u32;
        let y = y.clamp(0, height as i64 - 1) as u32;
        pixels[(y * width + x) as usize].luma()
    };
    for y in 0..height as i64 {
        for x in 0..width as i64 {
            let du = (luma(x + 1, y) - luma(x - 1, y)) * 0.5;
            let dv = (luma(x, y + 1) - luma(x, y - 1)) * 0.5;
            out[(y as u32 * width + x as u32) as usize] = Vec2::new(du, dv);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> TextureConfig {
        TextureConfig { width: 64, height: 32, normal_maps: true }
    }

    #[test]
    fn second_request_returns_the_cached_buffer() {
        let mut synth = TextureSynthesizer::new(&small(), 7);
        let a = synth.synthesize("mars").unwrap();
        let b = synth.synthesize("mars").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(synth.generated_count(), 1);

        let c = synth.synthesize("Mars").unwrap();
        assert!(Rc::ptr_eq(&a, &c));
        assert_eq!(synth.generated_count(), 1);
    }

    #[test]
    fn unknown_name_uses_generic_palette() {
        let reg = PaletteRegistry::builtin();
        assert!(!reg.contains("xyzzy"));
        assert_eq!(reg.lookup("xyzzy"), &Palette::generic_rocky());

        let mut synth = TextureSynthesizer::new(&small(), 1);
        let tex = synth.synthesize("xyzzy").unwrap();
        assert_eq!(tex.pixels.len(), 64 * 32);
    }

    #[test]
    fn same_seed_same_pixels_different_seed_differs() {
        let a = TextureSynthesizer::new(&small(), 99).synthesize("jupiter").unwrap();
        let b = TextureSynthesizer::new(&small(), 99).synthesize("jupiter").unwrap();
        let c = TextureSynthesizer::new(&small(), 100).synthesize("jupiter").unwrap();
        assert_eq!(a.pixels, b.pixels);
        assert_ne!(a.pixels, c.pixels);
    }

    #[test]
    fn empty_size_is_reported_and_not_cached() {
        let cfg = TextureConfig { width: 0, height: 32, normal_maps: false };
        let mut synth = TextureSynthesizer::new(&cfg, 3);
        let err = synth.synthesize("earth").unwrap_err();
        assert!(matches!(err, EngineError::EmptyTexture { width: 0, .. }));
        assert!(synth.cached("earth").is_none());
        assert_eq!(synth.generated_count(), 0);
    }

    #[test]
    fn slopes_follow_the_config_flag() {
        let with = TextureSynthesizer::new(&small(), 5).synthesize("moon").unwrap();
        assert_eq!(with.slopes.as_ref().map(Vec::len), Some(64 * 32));

        let cfg = TextureConfig { normal_maps: false, ..small() };
        let without = TextureSynthesizer::new(&cfg, 5).synthesize("moon").unwrap();
        assert!(without.slopes.is_none());
        assert_eq!(without.slope(0.3, 0.3), Vec2::ZERO);
    }

    #[test]
    fn sample_wraps_horizontally() {
        let tex = TextureSynthesizer::new(&small(), 11).synthesize("sun").unwrap();
        assert_eq!(tex.sample(0.25, 0.5), tex.sample(1.25, 0.5));
        assert_eq!(tex.sample(0.25, 0.5), tex.sample(-0.75, 0.5));
    }

    #[test]
    fn gradient_stops_cover_all_three_colours() {
        let p = PaletteRegistry::builtin().lookup("sun").clone();
        assert_eq!(p.stop(0.0), p.primary);
        assert_eq!(p.stop(0.5), p.secondary);
        assert_eq!(p.stop(1.0), p.tertiary.unwrap());
    }
}
