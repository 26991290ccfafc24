//! Static body descriptors. Authored once at startup and never mutated.

use crate::math::Rgb;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Display-only category shown in the info panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementTag {
    Wood,
    Fire,
    Earth,
    Metal,
    Water,
}

impl ElementTag {
    pub fn label(self) -> &'static str {
        match self {
            ElementTag::Wood => "Wood",
            ElementTag::Fire => "Fire",
            ElementTag::Earth => "Earth",
            ElementTag::Metal => "Metal",
            ElementTag::Water => "Water",
        }
    }
}

/// Which special rendering a body gets. The compositor switches on this,
/// never on the body's name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyKind {
    #[default]
    Generic,
    /// Flat annulus around the body.
    Ringed,
    /// Thick two-shell atmosphere with a stronger rim.
    Atmospheric,
}

/// Index of a body in catalog order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub usize);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelestialBodyDescriptor {
    pub name: String,
    pub element: ElementTag,
    pub color: Rgb,
    pub radius: f32,
    pub orbit_radius: f32,
    /// rad/s at ambient speed.
    pub orbit_speed: f32,
    /// rad/s at ambient speed.
    pub rotation_speed: f32,
    #[serde(default)]
    pub orbit_phase: f32,
    #[serde(default)]
    pub has_atmosphere: bool,
    #[serde(default)]
    pub has_rings: bool,
    #[serde(default)]
    pub kind: BodyKind,
    #[serde(default)]
    pub description: Option<String>,
}

impl CelestialBodyDescriptor {
    pub fn new(name: impl Into<String>, orbit_radius: f32, orbit_speed: f32) -> Self {
        Self {
            name: name.into(),
            element: ElementTag::Earth,
            color: Rgb::new(160, 150, 140),
            radius: 2.0,
            orbit_radius,
            orbit_speed,
            rotation_speed: 0.5,
            orbit_phase: 0.0,
            has_atmosphere: false,
            has_rings: false,
            kind: BodyKind::Generic,
            description: None,
        }
    }

    /// The kind actually rendered: a ring flag on a generic body promotes it
    /// to [`BodyKind::Ringed`].
    pub fn effective_kind(&self) -> BodyKind {
        match self.kind {
            BodyKind::Generic if self.has_rings => BodyKind::Ringed,
            k => k,
        }
    }

    /// Rings are drawn when either the flag or the kind asks for them, so an
    /// atmospheric body can still carry a ring.
    pub fn has_ring(&self) -> bool {
        self.has_rings || self.kind == BodyKind::Ringed
    }

    fn problem(&self) -> Option<&'static str> {
        if self.name.trim().is_empty() {
            return Some("empty name");
        }
        let nums = [
            self.radius,
            self.orbit_radius,
            self.orbit_speed,
            self.rotation_speed,
            self.orbit_phase,
        ];
        if nums.iter().any(|v| !v.is_finite()) {
            return Some("non-finite parameter");
        }
        if self.radius <= 0.0 {
            return Some("non-positive radius");
        }
        if self.orbit_radius < 0.0 {
            return Some("negative orbit radius");
        }
        None
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SunDescriptor {
    pub name: String,
    pub color: Rgb,
    pub radius: f32,
    pub rotation_speed: f32,
}

impl Default for SunDescriptor {
    fn default() -> Self {
        Self {
            name: "Sun".to_string(),
            color: Rgb::new(255, 196, 92),
            radius: 8.0,
            rotation_speed: 0.12,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub sun: SunDescriptor,
    #[serde(default)]
    pub bodies: Vec<CelestialBodyDescriptor>,
}

impl Catalog {
    pub fn new(sun: SunDescriptor, bodies: Vec<CelestialBodyDescriptor>) -> Self {
        Self { sun, bodies }
    }

    /// Copy with malformed entries removed. An entirely broken catalog yields a
    /// sun-only scene rather than an error.
    pub fn sanitized(&self) -> Catalog {
        let mut sun = self.sun.clone();
        if !(sun.radius.is_finite() && sun.radius > 0.0) || !sun.rotation_speed.is_finite() {
            warn!(radius = sun.radius, "sun descriptor malformed, using defaults");
            sun = SunDescriptor::default();
        }
        let bodies = self
            .bodies
            .iter()
            .filter(|b| match b.problem() {
                Some(why) => {
                    warn!(body = %b.name, why, "dropping catalog entry");
                    false
                }
                None => true,
            })
            .cloned()
            .collect();
        Catalog { sun, bodies }
    }

    pub fn get(&self, id: BodyId) -> Option<&CelestialBodyDescriptor> {
        self.bodies.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Sun plus nine bodies with illustrative (not ephemeris) parameters.
    pub fn builtin() -> Catalog {
        let body = |name: &str,
                    element: ElementTag,
                    color: Rgb,
                    radius: f32,
                    orbit_radius: f32,
                    orbit_speed: f32,
                    rotation_speed: f32,
                    orbit_phase: f32,
                    has_atmosphere: bool,
                    kind: BodyKind,
                    description: &str| CelestialBodyDescriptor {
            name: name.to_string(),
            element,
            color,
            radius,
            orbit_radius,
            orbit_speed,
            rotation_speed,
            orbit_phase,
            has_atmosphere,
            has_rings: kind == BodyKind::Ringed,
            kind,
            description: Some(description.to_string()),
        };

        let bodies = vec![
            body(
                "Mercury",
                ElementTag::Metal,
                Rgb::new(170, 170, 176),
                1.1,
                15.0,
                0.42,
                0.30,
                0.4,
                false,
                BodyKind::Generic,
                "Day longer than its year; extreme temperature swings.",
            ),
            body(
                "Venus",
                ElementTag::Fire,
                Rgb::new(235, 190, 110),
                1.8,
                21.0,
                0.31,
                -0.12,
                2.1,
                true,
                BodyKind::Generic,
                "Hottest planet under a sulfuric cloud deck; spins backwards.",
            ),
            body(
                "Earth",
                ElementTag::Water,
                Rgb::new(70, 140, 210),
                2.0,
                28.0,
                0.25,
                0.90,
                4.0,
                true,
                BodyKind::Atmospheric,
                "Only world with confirmed surface liquid water.",
            ),
            body(
                "Mars",
                ElementTag::Fire,
                Rgb::new(205, 90, 50),
                1.4,
                35.0,
                0.20,
                0.85,
                5.5,
                true,
                BodyKind::Generic,
                "Home to Olympus Mons, the largest volcano known.",
            ),
            body(
                "Jupiter",
                ElementTag::Wood,
                Rgb::new(215, 175, 130),
                4.6,
                46.0,
                0.12,
                1.60,
                1.2,
                true,
                BodyKind::Generic,
                "The Great Red Spot is a storm older than telescopes.",
            ),
            body(
                "Saturn",
                ElementTag::Earth,
                Rgb::new(225, 200, 150),
                3.9,
                57.0,
                0.09,
                1.45,
                3.3,
                true,
                BodyKind::Ringed,
                "Spectacular rings; would float in a big enough bathtub.",
            ),
            body(
                "Uranus",
                ElementTag::Water,
                Rgb::new(160, 220, 225),
                2.8,
                66.0,
                0.065,
                -0.70,
                0.9,
                true,
                BodyKind::Ringed,
                "Rolls around the sun on its side.",
            ),
            body(
                "Neptune",
                ElementTag::Water,
                Rgb::new(80, 120, 220),
                2.7,
                74.0,
                0.05,
                0.75,
                4.8,
                true,
                BodyKind::Generic,
                "Fastest winds in the solar system.",
            ),
            body(
                "Pluto",
                ElementTag::Metal,
                Rgb::new(150, 135, 120),
                0.8,
                82.0,
                0.035,
                0.20,
                2.6,
                false,
                BodyKind::Generic,
                "Dwarf world with a heart-shaped nitrogen glacier.",
            ),
        ];

        Catalog { sun: SunDescriptor::default(), bodies }
    }
}
