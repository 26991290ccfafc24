//! Hierarchical orbital motion: system spin → orbital revolution → self spin.

use crate::catalog::{BodyId, Catalog};
use crate::config::OrbitConfig;
use crate::math::{lerp, wrap_angle};
use glam::{Quat, Vec3};

/// Angular-velocity scale factors applied on top of each body's base speeds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedMultipliers {
    pub system: f32,
    pub self_spin: f32,
    pub orbit: f32,
}

impl SpeedMultipliers {
    pub const AMBIENT: SpeedMultipliers = SpeedMultipliers { system: 1.0, self_spin: 1.0, orbit: 1.0 };
}

impl Default for SpeedMultipliers {
    fn default() -> Self {
        Self::AMBIENT
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitalState {
    pub self_angle: f32,
    pub orbit_angle: f32,
    pub hovered: bool,
    /// Render scale relative to the nominal radius.
    pub scale: f32,
}

#[derive(Clone, Copy, Debug)]
struct OrbitParams {
    radius: f32,
    orbit_radius: f32,
    orbit_speed: f32,
    self_speed: f32,
}

#[derive(Clone, Debug)]
pub struct OrbitalModel {
    params: Vec<OrbitParams>,
    states: Vec<OrbitalState>,
    system_angle: f32,
    system_base_speed: f32,
    sun_angle: f32,
    sun_speed: f32,
    hover_scale: f32,
    hover_smoothing: f32,
}

impl OrbitalModel {
    pub fn new(catalog: &Catalog, config: &OrbitConfig) -> Self {
        let params = catalog
            .bodies
            .iter()
            .map(|b| OrbitParams {
                radius: b.radius,
                orbit_radius: b.orbit_radius,
                orbit_speed: b.orbit_speed,
                self_speed: b.rotation_speed,
            })
            .collect();
        let states = catalog
            .bodies
            .iter()
            .map(|b| OrbitalState {
                self_angle: 0.0,
                orbit_angle: wrap_angle(b.orbit_phase),
                hovered: false,
                scale: 1.0,
            })
            .collect();
        Self {
            params,
            states,
            system_angle: 0.0,
            system_base_speed: config.system_base_speed,
            sun_angle: 0.0,
            sun_speed: catalog.sun.rotation_speed,
            hover_scale: config.hover_scale,
            hover_smoothing: config.hover_smoothing,
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Advances every angle by `dt` seconds. `dt` is used as given; frame
    /// clamping happens at the engine boundary.
    pub fn advance(&mut self, dt: f32, m: &SpeedMultipliers) {
        self.system_angle = wrap_angle(self.system_angle + self.system_base_speed * m.system * dt);
        self.sun_angle = wrap_angle(self.sun_angle + self.sun_speed * m.self_spin * dt);

        for (p, s) in self.params.iter().zip(self.states.iter_mut()) {
            s.self_angle = wrap_angle(s.self_angle + p.self_speed * m.self_spin * dt);
            s.orbit_angle = wrap_angle(s.orbit_angle + p.orbit_speed * m.orbit * dt);

            let target = if s.hovered { self.hover_scale } else { 1.0 };
            s.scale = lerp(s.scale, target, self.hover_smoothing);
        }
    }

    /// Marks one body (or none) as hovered; the scale eases toward the
    /// target over the following frames.
    pub fn set_hovered(&mut self, id: Option<BodyId>) {
        for (i, s) in self.states.iter_mut().enumerate() {
            s.hovered = Some(BodyId(i)) == id;
        }
    }

    pub fn state(&self, id: BodyId) -> Option<&OrbitalState> {
        self.states.get(id.0)
    }

    pub fn system_angle(&self) -> f32 {
        self.system_angle
    }

    pub fn sun_angle(&self) -> f32 {
        self.sun_angle
    }

    pub fn system_rotation(&self) -> Quat {
        Quat::from_rotation_y(self.system_angle)
    }

    /// Position in the orbital plane before the system spin is applied.
    pub fn local_position(&self, id: BodyId) -> Option<Vec3> {
        let p = self.params.get(id.0)?;
        let s = self.states.get(id.0)?;
        let (sin, cos) = s.orbit_angle.sin_cos();
        Some(Vec3::new(p.orbit_radius * cos, 0.0, p.orbit_radius * sin))
    }

    pub fn world_position(&self, id: BodyId) -> Option<Vec3> {
        self.local_position(id).map(|p| self.system_rotation() * p)
    }

    /// Nominal radius times the current hover scale.
    pub fn display_radius(&self, id: BodyId) -> Option<f32> {
        let p = self.params.get(id.0)?;
        let s = self.states.get(id.0)?;
        Some(p.radius * s.scale)
    }

    /// Rotation taking body-local directions to world, including self spin.
    pub fn body_rotation(&self, id: BodyId) -> Option<Quat> {
        let s = self.states.get(id.0)?;
        Some(self.system_rotation() * Quat::from_rotation_y(s.self_angle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CelestialBodyDescriptor, SunDescriptor};
    use approx::assert_abs_diff_eq;

    fn catalog(speeds: &[(f32, f32, f32)]) -> Catalog {
        let bodies = speeds
            .iter()
            .enumerate()
            .map(|(i, &(orbit_radius, orbit_speed, rotation_speed))| {
                let mut d = CelestialBodyDescriptor::new(format!("b{i}"), orbit_radius, orbit_speed);
                d.rotation_speed = rotation_speed;
                d
            })
            .collect();
        Catalog::new(SunDescriptor::default(), bodies)
    }

    /// Angle difference folded into [-π, π].
    fn ang_diff(a: f32, b: f32) -> f32 {
        let d = wrap_angle(a - b);
        if d > std::f32::consts::PI {
            d - std::f32::consts::TAU
        } else {
            d
        }
    }

    #[test]
    fn self_angle_tracks_speed_times_time() {
        let cat = catalog(&[(10.0, 0.3, 0.7), (20.0, 0.1, 2.5), (30.0, 0.05, -1.3)]);
        let mut model = OrbitalModel::new(&cat, &OrbitConfig::default());
        let dt = 1.0 / 60.0;
        let steps = 600;
        for _ in 0..steps {
            model.advance(dt, &SpeedMultipliers::AMBIENT);
        }
        let t = dt * steps as f32;
        for (i, b) in cat.bodies.iter().enumerate() {
            let s = model.state(BodyId(i)).unwrap();
            assert_abs_diff_eq!(ang_diff(s.self_angle, b.rotation_speed * t), 0.0, epsilon = 1e-3);
            assert_abs_diff_eq!(ang_diff(s.orbit_angle, b.orbit_speed * t), 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn multipliers_scale_each_axis_independently() {
        let cat = catalog(&[(10.0, 1.0, 1.0)]);
        let cfg = OrbitConfig { system_base_speed: 1.0, ..OrbitConfig::default() };
        let mut model = OrbitalModel::new(&cat, &cfg);
        let m = SpeedMultipliers { system: 0.5, self_spin: 2.0, orbit: 1.5 };
        model.advance(0.1, &m);
        let s = model.state(BodyId(0)).unwrap();
        assert_abs_diff_eq!(model.system_angle(), 0.05, epsilon = 1e-6);
        assert_abs_diff_eq!(s.self_angle, 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(s.orbit_angle, 0.15, epsilon = 1e-6);
    }

    #[test]
    fn world_position_applies_system_spin() {
        let cat = catalog(&[(50.0, 0.0, 0.0)]);
        let cfg = OrbitConfig { system_base_speed: 1.0, ..OrbitConfig::default() };
        let mut model = OrbitalModel::new(&cat, &cfg);
        assert_abs_diff_eq!(model.world_position(BodyId(0)).unwrap().x, 50.0, epsilon = 1e-4);

        model.advance(std::f32::consts::FRAC_PI_2, &SpeedMultipliers::AMBIENT);
        let p = model.world_position(BodyId(0)).unwrap();
        // +Y rotation by 90° takes +X to -Z
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p.z, -50.0, epsilon = 1e-3);
        assert_eq!(model.local_position(BodyId(0)).unwrap().x, 50.0);
    }

    #[test]
    fn hover_scale_eases_in_and_back_out() {
        let cat = catalog(&[(10.0, 0.0, 0.0), (20.0, 0.0, 0.0)]);
        let mut model = OrbitalModel::new(&cat, &OrbitConfig::default());
        model.set_hovered(Some(BodyId(1)));

        model.advance(0.016, &SpeedMultipliers::AMBIENT);
        let first = model.state(BodyId(1)).unwrap().scale;
        assert!(first > 1.0 && first < 1.2, "no popping: {first}");
        assert_eq!(model.state(BodyId(0)).unwrap().scale, 1.0);

        for _ in 0..200 {
            model.advance(0.016, &SpeedMultipliers::AMBIENT);
        }
        assert_abs_diff_eq!(model.state(BodyId(1)).unwrap().scale, 1.2, epsilon = 1e-4);
        assert_abs_diff_eq!(model.display_radius(BodyId(1)).unwrap(), 2.4, epsilon = 1e-3);

        model.set_hovered(None);
        model.advance(0.016, &SpeedMultipliers::AMBIENT);
        let back = model.state(BodyId(1)).unwrap().scale;
        assert!(back < 1.2 && back > 1.0);
        for _ in 0..200 {
            model.advance(0.016, &SpeedMultipliers::AMBIENT);
        }
        assert_abs_diff_eq!(model.state(BodyId(1)).unwrap().scale, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn unknown_ids_are_none() {
        let model = OrbitalModel::new(&Catalog::default(), &OrbitConfig::default());
        assert!(model.is_empty());
        assert!(model.world_position(BodyId(3)).is_none());
        assert!(model.display_radius(BodyId(0)).is_none());
    }
}
