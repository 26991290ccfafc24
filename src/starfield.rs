//! Three concentric star shells, each rotated at its own rate for parallax.

use crate::math::{wrap_angle, Rgb};
use glam::{Quat, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use tracing::warn;

/// Per-shell star cap; the three default shells total 9,800.
pub const MAX_STARS_PER_SHELL: usize = 50_000;
/// Shells beyond this radius would overflow the cubed-radius sampling.
pub const MAX_SHELL_RADIUS: f32 = 1.0e6;
pub const MAX_STAR_SIZE: f32 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StarColor {
    pub color: Rgb,
    /// Relative probability; need not sum to one.
    pub weight: f32,
}

impl StarColor {
    pub const fn new(color: Rgb, weight: f32) -> Self {
        Self { color, weight }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShellSpec {
    pub count: usize,
    pub inner_radius: f32,
    pub outer_radius: f32,
    pub size_min: f32,
    pub size_max: f32,
    /// rad/s at ambient speed.
    pub rotation_speed: f32,
    pub colors: Vec<StarColor>,
}

impl ShellSpec {
    /// Copy that is safe to generate from, or `None` when the shell cannot be
    /// repaired. Counts are capped, sizes clamped and unusable colour entries
    /// dropped; every repair is logged.
    pub fn sanitized(&self, index: usize) -> Option<ShellSpec> {
        let radii = [self.inner_radius, self.outer_radius];
        if radii.iter().any(|r| !r.is_finite() || *r < 0.0 || *r > MAX_SHELL_RADIUS) {
            warn!(shell = index, inner = self.inner_radius, outer = self.outer_radius, "dropping star shell with bad radii");
            return None;
        }
        if !self.size_min.is_finite() || !self.size_max.is_finite() {
            warn!(shell = index, "dropping star shell with non-finite sizes");
            return None;
        }
        let mut spec = self.clone();

        if spec.count > MAX_STARS_PER_SHELL {
            warn!(shell = index, count = spec.count, cap = MAX_STARS_PER_SHELL, "star count capped");
            spec.count = MAX_STARS_PER_SHELL;
        }

        let (lo, hi) = (spec.size_min.clamp(0.0, MAX_STAR_SIZE), spec.size_max.clamp(0.0, MAX_STAR_SIZE));
        if (lo, hi) != (spec.size_min, spec.size_max) {
            warn!(shell = index, size_min = spec.size_min, size_max = spec.size_max, "star sizes clamped");
            spec.size_min = lo;
            spec.size_max = hi;
        }

        if !spec.rotation_speed.is_finite() {
            warn!(shell = index, "non-finite shell rotation, holding still");
            spec.rotation_speed = 0.0;
        }

        let before = spec.colors.len();
        spec.colors.retain(|c| c.weight.is_finite() && c.weight >= 0.0);
        if spec.colors.len() != before {
            warn!(shell = index, dropped = before - spec.colors.len(), "unusable star colour weights dropped");
        }
        let total: f32 = spec.colors.iter().map(|c| c.weight).sum();
        if !total.is_finite() {
            let peak = spec.colors.iter().map(|c| c.weight).fold(0.0, f32::max);
            warn!(shell = index, "star colour weights overflow, rescaling");
            for c in &mut spec.colors {
                c.weight /= peak;
            }
        }
        Some(spec)
    }

    /// Outer, middle, inner. Counts run 100% / 30% / 10%; the outer shell has
    /// the smallest, mostly white stars and turns slowest.
    pub fn default_layers() -> Vec<ShellSpec> {
        let white = Rgb::new(235, 238, 245);
        let blue = Rgb::new(170, 195, 255);
        let yellow = Rgb::new(255, 236, 180);
        let orange = Rgb::new(255, 190, 130);
        let red = Rgb::new(255, 140, 120);
        vec![
            ShellSpec {
                count: 7000,
                inner_radius: 400.0,
                outer_radius: 500.0,
                size_min: 0.6,
                size_max: 1.2,
                rotation_speed: 0.004,
                colors: vec![
                    StarColor::new(white, 0.90),
                    StarColor::new(blue, 0.05),
                    StarColor::new(yellow, 0.05),
                ],
            },
            ShellSpec {
                count: 2100,
                inner_radius: 260.0,
                outer_radius: 340.0,
                size_min: 0.9,
                size_max: 1.8,
                rotation_speed: 0.009,
                colors: vec![
                    StarColor::new(white, 0.70),
                    StarColor::new(blue, 0.10),
                    StarColor::new(yellow, 0.10),
                    StarColor::new(orange, 0.10),
                ],
            },
            ShellSpec {
                count: 700,
                inner_radius: 160.0,
                outer_radius: 220.0,
                size_min: 1.4,
                size_max: 2.6,
                rotation_speed: 0.016,
                colors: vec![
                    StarColor::new(white, 0.50),
                    StarColor::new(blue, 0.20),
                    StarColor::new(yellow, 0.15),
                    StarColor::new(red, 0.15),
                ],
            },
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarPoint {
    /// Position in the layer's own (unrotated) frame.
    pub position: Vec3,
    pub color: Rgb,
    pub size: f32,
}

#[derive(Clone, Debug)]
pub struct StarfieldLayer {
    pub index: usize,
    pub points: Vec<StarPoint>,
    pub rotation: f32,
    pub rotation_speed: f32,
}

impl StarfieldLayer {
    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.rotation)
    }

    pub fn advance(&mut self, dt: f32, multiplier: f32) {
        self.rotation = wrap_angle(self.rotation + self.rotation_speed * multiplier * dt);
    }
}

fn usable_weight(c: &StarColor) -> f32 {
    if c.weight.is_finite() {
        c.weight.max(0.0)
    } else {
        0.0
    }
}

fn pick_color<R: Rng + ?Sized>(table: &[StarColor], rng: &mut R) -> Rgb {
    let total: f32 = table.iter().map(usable_weight).sum();
    if !(total.is_finite() && total > 0.0) {
        return table.iter().find(|c| usable_weight(c) > 0.0).map_or(Rgb::WHITE, |c| c.color);
    }
    let mut roll = rng.gen::<f32>() * total;
    for entry in table {
        let w = usable_weight(entry);
        if roll < w {
            return entry.color;
        }
        roll -= w;
    }
    // float slop on the last bucket
    table.iter().rev().find(|c| usable_weight(c) > 0.0).map_or(Rgb::WHITE, |c| c.color)
}

/// `count` stars spread uniformly by solid angle (and by volume) through the
/// shell between `inner_radius` and `outer_radius`.
pub fn generate<R: Rng + ?Sized>(
    layer_index: usize,
    count: usize,
    inner_radius: f32,
    outer_radius: f32,
    color_table: &[StarColor],
    size_range: (f32, f32),
    rng: &mut R,
) -> StarfieldLayer {
    let lo = inner_radius.max(0.0).min(outer_radius.max(0.0));
    let hi = inner_radius.max(0.0).max(outer_radius.max(0.0));
    let (lo3, hi3) = (lo * lo * lo, hi * hi * hi);
    let (size_lo, size_hi) = (size_range.0.min(size_range.1), size_range.0.max(size_range.1));

    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let azimuth = rng.gen_range(0.0..TAU);
        let cos_polar = 1.0 - 2.0 * rng.gen::<f32>();
        let sin_polar = (1.0 - cos_polar * cos_polar).max(0.0).sqrt();
        let dir = Vec3::new(sin_polar * azimuth.cos(), cos_polar, sin_polar * azimuth.sin());

        let r = (lo3 + rng.gen::<f32>() * (hi3 - lo3)).cbrt().clamp(lo, hi);
        let span = size_hi - size_lo;
        let size = if span.is_finite() && span > 0.0 { size_lo + rng.gen::<f32>() * span } else { size_lo };

        points.push(StarPoint { position: dir * r, color: pick_color(color_table, rng), size });
    }

    StarfieldLayer { index: layer_index, points, rotation: 0.0, rotation_speed: 0.0 }
}

#[derive(Clone, Debug, Default)]
pub struct Starfield {
    layers: Vec<StarfieldLayer>,
}

impl Starfield {
    /// Shells that cannot be repaired are skipped, see [`ShellSpec::sanitized`].
    pub fn new(specs: &[ShellSpec], seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed ^ 0x5A17_5A17);
        let layers = specs
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| spec.sanitized(i).map(|s| (i, s)))
            .map(|(i, spec)| {
                let mut layer = generate(
                    i,
                    spec.count,
                    spec.inner_radius,
                    spec.outer_radius,
                    &spec.colors,
                    (spec.size_min, spec.size_max),
                    &mut rng,
                );
                layer.rotation_speed = spec.rotation_speed;
                layer
            })
            .collect();
        Self { layers }
    }

    pub fn layers(&self) -> &[StarfieldLayer] {
        &self.layers
    }

    pub fn total_points(&self) -> usize {
        self.layers.iter().map(|l| l.points.len()).sum()
    }

    pub fn advance(&mut self, dt: f32, multiplier: f32) {
        for layer in &mut self.layers {
            layer.advance(dt, multiplier);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(0xC0FFEE)
    }

    #[test]
    fn generates_exact_count_within_shell() {
        let table = [StarColor::new(Rgb::WHITE, 1.0)];
        for &n in &[0usize, 1, 17, 2500] {
            let layer = generate(0, n, 100.0, 120.0, &table, (0.5, 1.0), &mut rng());
            assert_eq!(layer.points.len(), n);
            for p in &layer.points {
                let r = p.position.length();
                assert!((100.0 - 1e-3..=120.0 + 1e-3).contains(&r), "radius {r}");
                assert!((0.5..=1.0).contains(&p.size));
            }
        }
    }

    #[test]
    fn swapped_radii_are_tolerated() {
        let layer = generate(1, 200, 50.0, 40.0, &[], (1.0, 1.0), &mut rng());
        assert!(layer.points.iter().all(|p| {
            let r = p.position.length();
            (40.0 - 1e-3..=50.0 + 1e-3).contains(&r)
        }));
        // empty colour table → white, fixed size
        assert!(layer.points.iter().all(|p| p.color == Rgb::WHITE && p.size == 1.0));
    }

    #[test]
    fn colour_weights_are_respected() {
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        let only_blue = [StarColor::new(red, 0.0), StarColor::new(blue, 3.0)];
        let layer = generate(0, 300, 10.0, 20.0, &only_blue, (1.0, 2.0), &mut rng());
        assert!(layer.points.iter().all(|p| p.color == blue));

        let mostly_red = [StarColor::new(red, 0.9), StarColor::new(blue, 0.1)];
        let layer = generate(0, 4000, 10.0, 20.0, &mostly_red, (1.0, 2.0), &mut rng());
        let reds = layer.points.iter().filter(|p| p.color == red).count() as f32 / 4000.0;
        assert!((0.85..0.95).contains(&reds), "red share {reds}");
    }

    #[test]
    fn hemispheres_are_balanced() {
        let layer = generate(0, 6000, 1.0, 1.0, &[], (1.0, 1.0), &mut rng());
        let north = layer.points.iter().filter(|p| p.position.y > 0.0).count() as f32;
        let polar = layer.points.iter().filter(|p| p.position.y.abs() > 0.9).count() as f32;
        assert!((north / 6000.0 - 0.5).abs() < 0.03);
        // uniform by solid angle: |y| > 0.9 covers 10% of the sphere
        assert!((polar / 6000.0 - 0.1).abs() < 0.02);
    }

    #[test]
    fn default_layers_have_depth_ordering() {
        let specs = ShellSpec::default_layers();
        assert_eq!(specs.len(), 3);
        let field = Starfield::new(&specs, 9);
        let total = field.total_points();
        assert!((8000..=12000).contains(&total));

        let (outer, inner) = (&specs[0], &specs[2]);
        assert!(outer.count > specs[1].count && specs[1].count > inner.count);
        assert!(outer.size_max <= inner.size_min);
        assert!(outer.rotation_speed < inner.rotation_speed);
    }

    fn shell(colors: Vec<StarColor>) -> ShellSpec {
        ShellSpec {
            count: 50,
            inner_radius: 10.0,
            outer_radius: 20.0,
            size_min: 1.0,
            size_max: 2.0,
            rotation_speed: 0.01,
            colors,
        }
    }

    #[test]
    fn overflowing_weights_are_rescaled_not_fatal() {
        let red = Rgb::new(255, 0, 0);
        let blue = Rgb::new(0, 0, 255);
        let spec = shell(vec![StarColor::new(red, 3e38), StarColor::new(blue, 3e38)]);
        let clean = spec.sanitized(0).unwrap();
        assert!(clean.colors.iter().map(|c| c.weight).sum::<f32>().is_finite());

        let field = Starfield::new(&[spec], 3);
        assert_eq!(field.total_points(), 50);
        // both colours still drawn
        let pts = &field.layers()[0].points;
        assert!(pts.iter().any(|p| p.color == red) && pts.iter().any(|p| p.color == blue));
    }

    #[test]
    fn extreme_sizes_are_clamped() {
        let mut spec = shell(vec![StarColor::new(Rgb::WHITE, 1.0)]);
        spec.size_min = -3e38;
        spec.size_max = 3e38;
        let clean = spec.sanitized(0).unwrap();
        assert_eq!((clean.size_min, clean.size_max), (0.0, MAX_STAR_SIZE));
        let field = Starfield::new(&[spec], 3);
        assert!(field.layers()[0].points.iter().all(|p| (0.0..=MAX_STAR_SIZE).contains(&p.size)));
    }

    #[test]
    fn unusable_shells_are_dropped_and_counts_capped() {
        let mut bad_radius = shell(Vec::new());
        bad_radius.outer_radius = f32::INFINITY;
        let mut nan_size = shell(Vec::new());
        nan_size.size_max = f32::NAN;
        let mut huge = shell(vec![StarColor::new(Rgb::WHITE, f32::NAN)]);
        huge.count = usize::MAX;

        assert!(bad_radius.sanitized(0).is_none());
        assert!(nan_size.sanitized(1).is_none());
        let capped = huge.sanitized(2).unwrap();
        assert_eq!(capped.count, MAX_STARS_PER_SHELL);
        assert!(capped.colors.is_empty());

        let field = Starfield::new(&[bad_radius, nan_size, shell(Vec::new())], 1);
        assert_eq!(field.layers().len(), 1);
        assert_eq!(field.layers()[0].index, 2);
    }

    #[test]
    fn generate_tolerates_raw_bad_inputs() {
        let table = [StarColor::new(Rgb::WHITE, f32::INFINITY), StarColor::new(Rgb::new(1, 2, 3), 3e38)];
        let layer = generate(0, 20, 5.0, 6.0, &table, (-3e38, 3e38), &mut rng());
        assert_eq!(layer.points.len(), 20);
        assert!(layer.points.iter().all(|p| p.color == Rgb::new(1, 2, 3)));
    }

    #[test]
    fn advance_rotates_each_layer_at_its_own_rate() {
        let mut field = Starfield::new(&ShellSpec::default_layers(), 1);
        field.advance(10.0, 1.0);
        let r: Vec<f32> = field.layers().iter().map(|l| l.rotation).collect();
        assert!(r[0] < r[1] && r[1] < r[2]);
    }
}
