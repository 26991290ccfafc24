use crate::catalog::Catalog;
use crate::error::{EngineError, Result};
use crate::launch::RampCurve;
use crate::starfield::ShellSpec;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureConfig {
    pub width: u32,
    pub height: u32,
    pub normal_maps: bool,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self { width: 256, height: 128, normal_maps: true }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    /// rad/s of the whole-system spin at ambient speed.
    pub system_base_speed: f32,
    pub hover_scale: f32,
    /// Per-frame lerp factor toward the hover target scale.
    pub hover_smoothing: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self { system_base_speed: 0.02, hover_scale: 1.2, hover_smoothing: 0.1 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub duration: f32,
    pub ramp_base: f32,
    pub ramp_slope: f32,
    pub ramp_cap: f32,
    pub curve: RampCurve,
    pub system_weight: f32,
    pub self_weight: f32,
    pub orbit_weight: f32,
    pub flash_duration: f32,
    /// Fraction of the flash over which opacity ramps 0 → 1.
    pub flash_fade_fraction: f32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            duration: 3.0,
            ramp_base: 0.1,
            ramp_slope: 3.0,
            ramp_cap: 15.0,
            curve: RampCurve::Linear,
            system_weight: 0.5,
            self_weight: 2.0,
            orbit_weight: 1.5,
            flash_duration: 0.8,
            flash_fade_fraction: 0.3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub fov_deg: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { position: [0.0, 62.0, 118.0], target: [0.0, -6.0, 0.0], fov_deg: 55.0 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub fps_cap: u32,
    pub enable_color: bool,
    pub show_labels: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { fps_cap: 30, enable_color: true, show_labels: true }
    }
}

/// Every tunable of the engine in one place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// `None` picks a fresh seed per session.
    pub seed: Option<u64>,
    /// Upper bound for a single frame's delta, in seconds.
    pub max_frame_delta: f32,
    pub texture: TextureConfig,
    pub orbit: OrbitConfig,
    pub launch: LaunchConfig,
    pub camera: CameraConfig,
    pub display: DisplayConfig,
    pub starfield: Vec<ShellSpec>,
    pub catalog: Catalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_frame_delta: 1.0 / 30.0,
            texture: TextureConfig::default(),
            orbit: OrbitConfig::default(),
            launch: LaunchConfig::default(),
            camera: CameraConfig::default(),
            display: DisplayConfig::default(),
            starfield: ShellSpec::default_layers(),
            catalog: Catalog::builtin(),
        }
    }
}

impl EngineConfig {
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }
}

pub struct Paths {
    pub config_path: PathBuf,
    pub log_path: PathBuf,
}

pub fn project_paths() -> Result<Paths> {
    let proj =
        ProjectDirs::from("com", "orrery-launch", "OrreryLaunch").ok_or(EngineError::NoProjectDirs)?;
    let config_dir = proj.config_dir().to_path_buf();
    let data_dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&config_dir).ok();
    fs::create_dir_all(&data_dir).ok();
    Ok(Paths {
        config_path: config_dir.join("config.json"),
        log_path: data_dir.join("orrery-launch.log"),
    })
}

/// Missing or malformed files fall back to defaults.
pub fn load_config(path: &Path) -> EngineConfig {
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str::<EngineConfig>(&s) {
            Ok(cfg) => {
                info!(path = %path.display(), "config loaded");
                cfg
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                EngineConfig::default()
            }
        },
        Err(_) => EngineConfig::default(),
    }
}

pub fn save_config_atomic(path: &Path, cfg: &EngineConfig) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(cfg)?;
    fs::write(&tmp, data)?;
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
