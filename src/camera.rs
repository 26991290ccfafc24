use crate::config::CameraConfig;
use glam::{Mat4, Vec3, Vec4};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir: dir.normalize_or_zero() }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Entry and exit distances along the ray, or `None` if the sphere is
    /// missed or entirely behind the origin. Entry is negative when the
    /// origin is inside.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<(f32, f32)> {
        let oc = self.origin - center;
        let b = oc.dot(self.dir);
        let c = oc.dot(oc) - radius * radius;
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let s = disc.sqrt();
        let (near, far) = (-b - s, -b + s);
        if far < 0.0 {
            return None;
        }
        Some((near, far))
    }

    /// Distance to the first positive hit on the sphere's surface.
    pub fn hit_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        self.intersect_sphere(center, radius).map(|(near, far)| if near > 0.0 { near } else { far })
    }

    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<f32> {
        let denom = normal.dot(self.dir);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        (t >= 0.0).then_some(t)
    }

    /// Perpendicular distance from `p` to the ray's line.
    pub fn distance_to_point(&self, p: Vec3) -> f32 {
        let v = p - self.origin;
        (v - self.dir * v.dot(self.dir)).length()
    }
}

/// Perspective look-at camera. Screen coordinates have the origin at the
/// top-left with y growing downward.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, fov_y: f32, aspect: f32) -> Self {
        Self { position, target, up: Vec3::Y, fov_y, aspect, near: 0.1, far: 2000.0 }
    }

    pub fn from_config(cfg: &CameraConfig, aspect: f32) -> Self {
        Self::new(
            Vec3::from_array(cfg.position),
            Vec3::from_array(cfg.target),
            cfg.fov_deg.clamp(5.0, 170.0).to_radians(),
            aspect,
        )
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Right and true-up vectors of the view basis.
    pub fn basis(&self) -> (Vec3, Vec3) {
        let f = self.forward();
        let right = f.cross(self.up).normalize_or_zero();
        (right, right.cross(f))
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// Primary ray through pixel `(x, y)` of a `width`×`height` viewport.
    pub fn screen_ray(&self, x: f32, y: f32, width: f32, height: f32) -> Ray {
        let ndc_x = 2.0 * x / width.max(1.0) - 1.0;
        let ndc_y = 1.0 - 2.0 * y / height.max(1.0);
        let tan_half = (self.fov_y * 0.5).tan();
        let (right, up) = self.basis();
        let dir = self.forward() + right * (ndc_x * self.aspect * tan_half) + up * (ndc_y * tan_half);
        Ray::new(self.position, dir)
    }

    /// Screen position and view depth of a world point, or `None` when it is
    /// behind the near plane.
    pub fn project(&self, world: Vec3, width: f32, height: f32) -> Option<Vec3> {
        let clip = self.view_projection() * Vec4::new(world.x, world.y, world.z, 1.0);
        if clip.w <= self.near {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let sx = (ndc.x + 1.0) * 0.5 * width;
        let sy = (1.0 - ndc.y) * 0.5 * height;
        Some(Vec3::new(sx, sy, clip.w))
    }

    /// Projected pixel radius of a sphere at view depth `depth`.
    pub fn projected_radius(&self, radius: f32, depth: f32, height: f32) -> f32 {
        if depth <= 0.0 {
            return 0.0;
        }
        radius / (depth * (self.fov_y * 0.5).tan()) * height * 0.5
    }
}
