//! Procedural solar-system renderer with a one-shot launch sequence.
//!
//! The engine is frame driven: the host calls [`engine::Engine::tick`] once per
//! render-loop iteration, renders into a [`raster::Framebuffer`], and reacts to
//! the completion callbacks. Nothing here touches the filesystem except
//! [`config`].

pub mod camera;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod glow;
pub mod launch;
pub mod math;
pub mod orbit;
pub mod raster;
pub mod scene;
pub mod starfield;
pub mod texture;

pub use catalog::{BodyId, BodyKind, Catalog, CelestialBodyDescriptor, ElementTag, SunDescriptor};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use launch::{LaunchEvent, LaunchPhase, LaunchSequencer};
pub use orbit::SpeedMultipliers;
pub use scene::InfoPanel;
