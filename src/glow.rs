//! Layered glow: concentric back-face shells with a fresnel rim term, the
//! sun's corona stack, and planetary ring annuli.

use crate::catalog::{BodyKind, CelestialBodyDescriptor};
use crate::math::{clamp01, smoothstep, Rgb};
use glam::{Quat, Vec3};

/// `clamp(k - n·v, 0, 1)^p`, where `v` points from the surface toward the eye.
pub fn fresnel_intensity(normal: Vec3, view_dir: Vec3, k: f32, p: f32) -> f32 {
    clamp01(k - normal.dot(view_dir)).powf(p)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    /// Source-over with alpha.
    Alpha,
    /// Colours sum; never darkens.
    Additive,
}

/// Which faces are discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Culling {
    None,
    Back,
    /// Near side discarded, so only the far hemisphere of a shell shades.
    Front,
}

/// Draw order. Everything in a later pass composites over earlier passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderPass {
    Background,
    Opaque,
    Glow,
    Overlay,
}

/// Low-frequency sinusoidal perturbation over a shell's local coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shimmer {
    pub amplitude: f32,
    pub frequency: f32,
    pub speed: f32,
}

impl Shimmer {
    /// Multiplicative factor in `[1 - amplitude, 1 + amplitude]`.
    pub fn factor(&self, local: Vec3, time: f32) -> f32 {
        let f = self.frequency;
        let t = time * self.speed;
        let wave = (local.x * f + t).sin() * 0.5
            + (local.y * f * 1.7 - t * 1.3).sin() * 0.3
            + (local.z * f * 0.6 + t * 0.7).sin() * 0.2;
        1.0 + self.amplitude * wave
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlowShell {
    /// Shell radius relative to the body radius.
    pub radius_scale: f32,
    pub color: Rgb,
    pub opacity: f32,
    pub k: f32,
    pub power: f32,
    pub shimmer: Option<Shimmer>,
    pub blend: BlendMode,
    pub culling: Culling,
    pub depth_write: bool,
    pub pass: RenderPass,
}

impl GlowShell {
    pub fn new(radius_scale: f32, color: Rgb, opacity: f32) -> Self {
        Self {
            radius_scale,
            color,
            opacity,
            k: 0.65,
            power: 3.0,
            shimmer: None,
            blend: BlendMode::Additive,
            culling: Culling::Front,
            depth_write: false,
            pass: RenderPass::Glow,
        }
    }

    pub fn with_fresnel(mut self, k: f32, power: f32) -> Self {
        self.k = k;
        self.power = power;
        self
    }

    pub fn with_shimmer(mut self, shimmer: Shimmer) -> Self {
        self.shimmer = Some(shimmer);
        self
    }

    /// Shaded intensity at a point on the shell's far side. `local` is the
    /// surface point in the shell's own frame, used for shimmer.
    pub fn intensity(&self, normal: Vec3, view_dir: Vec3, local: Vec3, time: f32) -> f32 {
        let base = fresnel_intensity(normal, view_dir, self.k, self.power);
        let wobble = self.shimmer.map_or(1.0, |s| s.factor(local, time));
        (base * wobble * self.opacity).max(0.0)
    }
}

/// Flat annulus around a body, tilted off the orbital plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingSpec {
    pub inner_scale: f32,
    pub outer_scale: f32,
    /// Radians from the orbital plane, about the local X axis.
    pub tilt: f32,
    pub color: Rgb,
    pub opacity: f32,
}

impl RingSpec {
    pub fn for_color(body: Rgb) -> Self {
        Self {
            inner_scale: 1.2,
            outer_scale: 2.2,
            tilt: 20f32.to_radians(),
            color: body.mix(Rgb::new(230, 215, 180), 0.5),
            opacity: 0.6,
        }
    }

    /// Ring plane normal in world space, given the system rotation.
    pub fn normal(&self, frame: Quat) -> Vec3 {
        frame * (Quat::from_rotation_x(self.tilt) * Vec3::Y)
    }

    /// Opacity at normalised position `t` across the annulus (0 = inner edge).
    /// Banded with one dark gap and soft edges; zero outside `[0, 1]`.
    pub fn alpha_at(&self, t: f32) -> f32 {
        if !(0.0..=1.0).contains(&t) {
            return 0.0;
        }
        let bands = 0.75 + 0.25 * (t * std::f32::consts::PI * 9.0).sin();
        let gap = if (t - 0.58).abs() < 0.035 { 0.15 } else { 1.0 };
        let edges = smoothstep(0.0, 0.06, t) * smoothstep(1.0, 0.9, t);
        self.opacity * bands * gap * edges
    }

    pub fn blend(&self) -> BlendMode {
        BlendMode::Alpha
    }

    pub fn pass(&self) -> RenderPass {
        RenderPass::Glow
    }
}

/// All translucent layers attached to one body.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlowStack {
    pub shells: Vec<GlowShell>,
    pub ring: Option<RingSpec>,
}

impl GlowStack {
    /// Chromosphere to corona: five shells, pale yellow through orange to red,
    /// fading outward.
    pub fn for_sun() -> Self {
        let layers = [
            (1.02, Rgb::new(255, 246, 205), 0.60, 2.0),
            (1.15, Rgb::new(255, 222, 140), 0.42, 2.5),
            (1.30, Rgb::new(255, 172, 80), 0.28, 3.0),
            (1.45, Rgb::new(240, 112, 52), 0.17, 3.5),
            (1.60, Rgb::new(200, 58, 38), 0.09, 4.0),
        ];
        let shells = layers
            .iter()
            .enumerate()
            .map(|(i, &(scale, color, opacity, power))| {
                GlowShell::new(scale, color, opacity).with_fresnel(0.68, power).with_shimmer(Shimmer {
                    amplitude: 0.18,
                    frequency: 3.0 + i as f32,
                    speed: 0.6 + 0.2 * i as f32,
                })
            })
            .collect();
        Self { shells, ring: None }
    }

    /// Layers for a planet, chosen by its rendered kind.
    pub fn for_body(body: &CelestialBodyDescriptor) -> Self {
        let sky = body.color.mix(Rgb::new(150, 200, 255), 0.6);
        let kind = body.effective_kind();
        let shells = match kind {
            BodyKind::Atmospheric if body.has_atmosphere => vec![
                GlowShell::new(1.02, sky, 0.55).with_fresnel(0.7, 2.0),
                GlowShell::new(1.35, sky.mix(Rgb::new(90, 150, 255), 0.5), 0.25).with_fresnel(0.65, 3.0),
            ],
            _ if body.has_atmosphere => vec![GlowShell::new(1.08, sky, 0.35).with_fresnel(0.65, 3.0)],
            _ => Vec::new(),
        };
        let ring = body.has_ring().then(|| RingSpec::for_color(body.color));
        Self { shells, ring }
    }

    pub fn is_empty(&self) -> bool {
        self.shells.is_empty() && self.ring.is_none()
    }

    /// Largest extent of any layer, relative to the body radius.
    pub fn max_scale(&self) -> f32 {
        let shells = self.shells.iter().map(|s| s.radius_scale).fold(1.0, f32::max);
        self.ring.map_or(shells, |r| shells.max(r.outer_scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fresnel_matches_formula() {
        let n = Vec3::Z;
        assert_abs_diff_eq!(fresnel_intensity(n, Vec3::Z, 0.65, 2.0), 0.0);
        // grazing: n·v = 0
        assert_abs_diff_eq!(fresnel_intensity(n, Vec3::X, 0.65, 2.0), 0.4225, epsilon = 1e-6);
        // far side facing away from the eye saturates
        assert_abs_diff_eq!(fresnel_intensity(n, -Vec3::Z, 0.65, 3.0), 1.0);
        let v = Vec3::new(0.0, 0.6, -0.8);
        assert_abs_diff_eq!(fresnel_intensity(Vec3::Y, v, 0.6, 2.0), 0.0);
    }

    #[test]
    fn sun_corona_fades_and_reddens_outward() {
        let stack = GlowStack::for_sun();
        assert_eq!(stack.shells.len(), 5);
        let scales: Vec<f32> = stack.shells.iter().map(|s| s.radius_scale).collect();
        assert_eq!(scales, vec![1.02, 1.15, 1.30, 1.45, 1.60]);
        for pair in stack.shells.windows(2) {
            assert!(pair[1].opacity < pair[0].opacity);
            assert!(pair[1].color.g < pair[0].color.g);
        }
        assert!(stack.shells.iter().all(|s| s.shimmer.is_some()));
    }

    #[test]
    fn shells_never_write_depth_and_draw_after_opaque() {
        let mut earth = CelestialBodyDescriptor::new("Earth", 28.0, 0.2);
        earth.kind = BodyKind::Atmospheric;
        earth.has_atmosphere = true;
        for stack in [GlowStack::for_sun(), GlowStack::for_body(&earth)] {
            for s in &stack.shells {
                assert!(!s.depth_write);
                assert_eq!(s.blend, BlendMode::Additive);
                assert_eq!(s.culling, Culling::Front);
                assert!(s.pass > RenderPass::Opaque);
            }
        }
    }

    #[test]
    fn body_layers_follow_kind() {
        let mut d = CelestialBodyDescriptor::new("Rock", 10.0, 1.0);
        assert!(GlowStack::for_body(&d).is_empty());

        d.has_atmosphere = true;
        let thin = GlowStack::for_body(&d);
        assert_eq!(thin.shells.len(), 1);
        assert!(thin.ring.is_none());

        d.kind = BodyKind::Atmospheric;
        let thick = GlowStack::for_body(&d);
        assert_eq!(thick.shells.len(), 2);
        assert!(thick.shells.iter().all(|s| (1.02..=1.35).contains(&s.radius_scale)));

        d.kind = BodyKind::Ringed;
        let ringed = GlowStack::for_body(&d);
        let ring = ringed.ring.unwrap();
        assert_eq!((ring.inner_scale, ring.outer_scale), (1.2, 2.2));
        assert_abs_diff_eq!(ringed.max_scale(), 2.2);
    }

    #[test]
    fn atmospheric_kind_needs_the_atmosphere_flag() {
        let mut d = CelestialBodyDescriptor::new("Dry", 30.0, 0.2);
        d.kind = BodyKind::Atmospheric;
        assert!(GlowStack::for_body(&d).shells.is_empty());
        d.has_atmosphere = true;
        assert_eq!(GlowStack::for_body(&d).shells.len(), 2);
    }

    #[test]
    fn ring_flag_survives_a_non_generic_kind() {
        let mut d = CelestialBodyDescriptor::new("Hazy", 60.0, 0.05);
        d.kind = BodyKind::Atmospheric;
        d.has_atmosphere = true;
        d.has_rings = true;
        let stack = GlowStack::for_body(&d);
        assert_eq!(stack.shells.len(), 2);
        assert!(stack.ring.is_some());
    }

    #[test]
    fn ring_alpha_is_bounded_and_gapped() {
        let ring = RingSpec::for_color(Rgb::new(220, 200, 150));
        assert_eq!(ring.alpha_at(-0.1), 0.0);
        assert_eq!(ring.alpha_at(1.1), 0.0);
        for i in 0..=100 {
            let a = ring.alpha_at(i as f32 / 100.0);
            assert!((0.0..=ring.opacity).contains(&a));
        }
        assert!(ring.alpha_at(0.58) < ring.alpha_at(0.45));
    }

    #[test]
    fn ring_tilt_leans_normal_off_vertical() {
        let ring = RingSpec::for_color(Rgb::WHITE);
        let n = ring.normal(Quat::IDENTITY);
        assert_abs_diff_eq!(n.dot(Vec3::Y), 20f32.to_radians().cos(), epsilon = 1e-5);
    }

    #[test]
    fn shimmer_stays_within_amplitude() {
        let s = Shimmer { amplitude: 0.2, frequency: 4.0, speed: 1.0 };
        for i in 0..50 {
            let f = s.factor(Vec3::new(i as f32 * 0.1, 0.3, -0.2), i as f32 * 0.37);
            assert!((0.8..=1.2).contains(&f));
        }
    }
}
