mod app;
mod hud;
mod input;
mod term;

use anyhow::{bail, Context, Result};
use clap::Parser;
use orrery_launch::config::{load_config, project_paths, save_config_atomic};
use orrery_launch::{Engine, EngineConfig};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "orrery-launch")]
#[command(about = "Procedural solar system in the terminal, with a launch sequence")]
struct Args {
    /// Config file (JSON). Defaults to the per-user config path.
    #[arg(long)]
    config: Option<PathBuf>,

    /// RNG seed for textures and stars (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Frame rate cap
    #[arg(long)]
    fps: Option<u32>,

    /// Launch spin-up duration in seconds
    #[arg(long)]
    duration: Option<f32>,

    /// Force monochrome output
    #[arg(long, default_value_t = false)]
    no_color: bool,

    /// Start the launch sequence immediately
    #[arg(long, default_value_t = false)]
    auto_launch: bool,

    /// Render one frame to this PNG instead of running interactively
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Snapshot size as WIDTHxHEIGHT
    #[arg(long, default_value = "640x400", value_parser = parse_size)]
    snapshot_size: (u32, u32),

    /// Seconds of simulation before the snapshot is taken
    #[arg(long, default_value_t = 0.0)]
    snapshot_time: f32,

    /// Log file (defaults to the per-user data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the default config to the config path and exit
    #[arg(long, default_value_t = false)]
    write_default_config: bool,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{s}`"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".into());
    }
    Ok((w, h))
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok();
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn apply_overrides(cfg: &mut EngineConfig, args: &Args) {
    if let Some(seed) = args.seed {
        cfg.seed = Some(seed);
    }
    if let Some(fps) = args.fps {
        cfg.display.fps_cap = fps;
    }
    if let Some(d) = args.duration {
        cfg.launch.duration = d.max(0.0);
    }
    if args.no_color {
        cfg.display.enable_color = false;
    }
}

/// Simulates `seconds` at a fixed 60 Hz and writes one frame as PNG.
fn snapshot(cfg: EngineConfig, out: &Path, (w, h): (u32, u32), seconds: f32, launch: bool) -> Result<()> {
    let mut engine = Engine::new(cfg, w, h);
    if launch {
        engine.trigger();
    }
    let step = 1.0 / 60.0;
    let mut t = 0.0;
    while t < seconds {
        engine.tick(step);
        t += step;
    }
    let fb = engine.render();
    let img = image::RgbImage::from_raw(fb.width(), fb.height(), fb.to_rgb8())
        .context("framebuffer size mismatch")?;
    img.save(out).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), width = w, height = h, "snapshot written");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let paths = project_paths().ok();

    let log_path = match (&args.log_file, &paths) {
        (Some(p), _) => p.clone(),
        (None, Some(p)) => p.log_path.clone(),
        (None, None) => std::env::temp_dir().join("orrery-launch.log"),
    };
    init_logging(&log_path)?;

    let config_path = args.config.clone().or_else(|| paths.as_ref().map(|p| p.config_path.clone()));

    if args.write_default_config {
        let Some(path) = config_path else {
            bail!("no config path available; pass --config");
        };
        save_config_atomic(&path, &EngineConfig::default())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let mut cfg = config_path.as_deref().map(load_config).unwrap_or_default();
    apply_overrides(&mut cfg, &args);

    if let Some(out) = &args.snapshot {
        return snapshot(cfg, out, args.snapshot_size, args.snapshot_time, args.auto_launch);
    }

    match app::run(cfg, args.auto_launch)? {
        app::Outcome::HandedOff => println!("launch complete, handing off to the next scene"),
        app::Outcome::Quit => {}
    }
    Ok(())
}
