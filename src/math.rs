use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

// -------------------- Scalars --------------------

pub fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = clamp01((x - edge0) / (edge1 - edge0));
    t * t * (3.0 - 2.0 * t)
}

/// Cubic ease-in-out on [0, 1].
pub fn ease_in_out(t: f32) -> f32 {
    let t = clamp01(t);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

/// Wraps an angle into [0, 2π).
pub fn wrap_angle(a: f32) -> f32 {
    let w = a.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if w >= TAU {
        0.0
    } else {
        w
    }
}

// -------------------- Colour --------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as floats in [0, 1].
    pub fn to_unit(self) -> Vec3 {
        Vec3::new(self.r as f32, self.g as f32, self.b as f32) / 255.0
    }

    pub fn from_unit(c: Vec3) -> Self {
        let q = |v: f32| (clamp01(v) * 255.0).round() as u8;
        Self { r: q(c.x), g: q(c.y), b: q(c.z) }
    }

    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        Rgb::from_unit(self.to_unit().lerp(other.to_unit(), clamp01(t)))
    }

    pub fn scale(self, k: f32) -> Rgb {
        Rgb::from_unit(self.to_unit() * k.max(0.0))
    }

    /// Rec. 601 luma in [0, 1].
    pub fn luma(self) -> f32 {
        let c = self.to_unit();
        0.299 * c.x + 0.587 * c.y + 0.114 * c.z
    }
}

// -------------------- Hashing --------------------

fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7feb_352d);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846c_a68b);
    x ^= x >> 16;
    x
}

fn lattice(ix: i32, iy: i32, iz: i32, seed: u32) -> f32 {
    let mut h = seed ^ 0x9e37_79b9;
    h = hash_u32(h ^ (ix as u32).wrapping_mul(0x85eb_ca6b));
    h = hash_u32(h ^ (iy as u32).wrapping_mul(0xc2b2_ae35));
    h = hash_u32(h ^ (iz as u32).wrapping_mul(0x27d4_eb2f));
    h as f32 / u32::MAX as f32
}

/// FNV-1a over the lowercased name. Used to derive per-body RNG streams so a
/// body's look depends on its name and the session seed only.
pub fn name_seed(name: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in name.bytes().map(|b| b.to_ascii_lowercase()) {
        h ^= b as u64;
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}

// -------------------- Value noise --------------------

fn fade(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Trilinear value noise in [0, 1].
pub fn value_noise(p: Vec3, seed: u32) -> f32 {
    let base = p.floor();
    let f = p - base;
    let (ix, iy, iz) = (base.x as i32, base.y as i32, base.z as i32);
    let (sx, sy, sz) = (fade(f.x), fade(f.y), fade(f.z));

    let corner = |dx: i32, dy: i32, dz: i32| lattice(ix + dx, iy + dy, iz + dz, seed);

    let x00 = lerp(corner(0, 0, 0), corner(1, 0, 0), sx);
    let x10 = lerp(corner(0, 1, 0), corner(1, 1, 0), sx);
    let x01 = lerp(corner(0, 0, 1), corner(1, 0, 1), sx);
    let x11 = lerp(corner(0, 1, 1), corner(1, 1, 1), sx);

    lerp(lerp(x00, x10, sy), lerp(x01, x11, sy), sz)
}

/// Fractal sum of [`value_noise`] octaves, renormalised to [0, 1].
pub fn fbm(p: Vec3, seed: u32, octaves: usize) -> f32 {
    let mut amp = 0.55;
    let mut freq = 1.0;
    let mut sum = 0.0;
    let mut norm = 0.0;
    for o in 0..octaves {
        let s = seed.wrapping_add((o as u32).wrapping_mul(0x9e37_79b9));
        sum += (value_noise(p * freq, s) * 2.0 - 1.0) * amp;
        norm += amp;
        amp *= 0.52;
        freq *= 2.03;
    }
    clamp01(0.5 + 0.5 * sum / f32::max(norm, 1e-6))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f32::consts::PI;

    #[test]
    fn wrap_angle_stays_in_range() {
        assert_abs_diff_eq!(wrap_angle(0.0), 0.0);
        assert_abs_diff_eq!(wrap_angle(TAU + 0.5), 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(wrap_angle(-PI / 2.0), 1.5 * PI, epsilon = 1e-5);
        for a in [-100.0, -1e-9, 3.0, 20.0, 1e4] {
            let w = wrap_angle(a);
            assert!((0.0..TAU).contains(&w), "{a} -> {w}");
        }
    }

    #[test]
    fn ease_in_out_hits_endpoints_and_midpoint() {
        assert_abs_diff_eq!(ease_in_out(0.0), 0.0);
        assert_abs_diff_eq!(ease_in_out(0.5), 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(ease_in_out(1.0), 1.0);
        assert_abs_diff_eq!(ease_in_out(2.0), 1.0);
        let mut prev = 0.0;
        for i in 1..=100 {
            let v = ease_in_out(i as f32 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn fbm_is_bounded_and_deterministic() {
        for i in 0..64 {
            let p = Vec3::new(i as f32 * 0.37, i as f32 * -0.11, 2.5);
            let a = fbm(p, 42, 5);
            assert!((0.0..=1.0).contains(&a));
            assert_eq!(a, fbm(p, 42, 5));
        }
    }

    #[test]
    fn name_seed_ignores_case() {
        assert_eq!(name_seed("Mars"), name_seed("mars"));
        assert_ne!(name_seed("mars"), name_seed("venus"));
    }

    #[test]
    fn rgb_mix_endpoints() {
        let a = Rgb::new(10, 20, 30);
        let b = Rgb::new(200, 100, 0);
        assert_eq!(a.mix(b, 0.0), a);
        assert_eq!(a.mix(b, 1.0), b);
        assert_eq!(Rgb::BLACK.scale(3.0), Rgb::BLACK);
    }
}
