//! Launch sequence: idle → spin-up → completion → white flash → done.
//!
//! Time only moves through [`LaunchSequencer::tick`], so tests drive it with
//! synthetic deltas instead of a wall clock.

use crate::config::LaunchConfig;
use crate::math::{clamp01, ease_in_out};
use crate::orbit::SpeedMultipliers;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Completion tolerance so that deltas summing to the duration in binary
/// floating point still land on it.
const ELAPSED_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LaunchPhase {
    Idle,
    Accelerating,
    Complete,
    FlashTransition,
    Done,
}

impl LaunchPhase {
    pub fn label(self) -> &'static str {
        match self {
            LaunchPhase::Idle => "idle",
            LaunchPhase::Accelerating => "accelerating",
            LaunchPhase::Complete => "complete",
            LaunchPhase::FlashTransition => "flash",
            LaunchPhase::Done => "done",
        }
    }
}

/// Edge-triggered notifications returned from [`LaunchSequencer::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaunchEvent {
    /// Spin-up reached its target duration. Emitted once per sequence.
    Completed,
    /// The flash covers the viewport; the host may hand off now.
    FlashFinished,
}

/// Shape of the base multiplier over elapsed time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RampCurve {
    /// `base + slope * t`
    Linear,
    /// `base * e^(rate * t)`
    Exponential { rate: f32 },
}

/// Full-viewport overlay: a white disc growing from the centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlashOverlay {
    /// Disc radius as a fraction of the viewport's half-diagonal.
    pub scale: f32,
    pub opacity: f32,
}

impl FlashOverlay {
    pub fn is_opaque(&self) -> bool {
        self.scale >= 1.0 && self.opacity >= 1.0
    }
}

#[derive(Clone, Debug)]
pub struct LaunchSequencer {
    config: LaunchConfig,
    phase: LaunchPhase,
    elapsed: f64,
    flash_elapsed: f64,
}

impl LaunchSequencer {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config, phase: LaunchPhase::Idle, elapsed: 0.0, flash_elapsed: 0.0 }
    }

    pub fn phase(&self) -> LaunchPhase {
        self.phase
    }

    /// Seconds since the trigger, capped at the target duration.
    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    pub fn duration(&self) -> f32 {
        self.config.duration
    }

    pub fn progress(&self) -> f32 {
        if self.config.duration <= 0.0 {
            return if self.phase == LaunchPhase::Idle { 0.0 } else { 1.0 };
        }
        clamp01(self.elapsed() / self.config.duration)
    }

    pub fn is_active(&self) -> bool {
        self.phase == LaunchPhase::Accelerating
    }

    pub fn flash_active(&self) -> bool {
        self.phase >= LaunchPhase::Complete
    }

    pub fn is_done(&self) -> bool {
        self.phase == LaunchPhase::Done
    }

    /// Starts the sequence. Only honoured from `Idle`; returns whether it
    /// took effect.
    pub fn trigger(&mut self) -> bool {
        if self.phase != LaunchPhase::Idle {
            debug!(phase = self.phase.label(), "launch re-trigger ignored");
            return false;
        }
        self.phase = LaunchPhase::Accelerating;
        self.elapsed = 0.0;
        self.flash_elapsed = 0.0;
        info!(duration = self.config.duration, "launch triggered");
        true
    }

    pub fn tick(&mut self, dt: f32) -> Option<LaunchEvent> {
        let dt = if dt.is_finite() { dt.max(0.0) as f64 } else { 0.0 };
        match self.phase {
            LaunchPhase::Idle | LaunchPhase::Done => None,
            LaunchPhase::Accelerating => {
                let target = self.config.duration.max(0.0) as f64;
                self.elapsed += dt;
                if self.elapsed >= target - ELAPSED_EPS {
                    // time past the target already belongs to the flash
                    self.flash_elapsed = (self.elapsed - target).max(0.0);
                    self.elapsed = target;
                    self.phase = LaunchPhase::Complete;
                    info!(elapsed = self.elapsed, "launch complete");
                    Some(LaunchEvent::Completed)
                } else {
                    None
                }
            }
            LaunchPhase::Complete | LaunchPhase::FlashTransition => {
                self.phase = LaunchPhase::FlashTransition;
                self.flash_elapsed += dt;
                let target = self.config.flash_duration.max(0.0) as f64;
                if self.flash_elapsed >= target - ELAPSED_EPS {
                    self.flash_elapsed = target;
                    self.phase = LaunchPhase::Done;
                    info!("flash finished");
                    Some(LaunchEvent::FlashFinished)
                } else {
                    None
                }
            }
        }
    }

    /// Base multiplier for a given time since trigger.
    pub fn ramp(&self, t: f32) -> f32 {
        let c = &self.config;
        let raw = match c.curve {
            RampCurve::Linear => c.ramp_base + t * c.ramp_slope,
            RampCurve::Exponential { rate } => c.ramp_base * (rate * t).exp(),
        };
        raw.min(c.ramp_cap).max(0.0)
    }

    pub fn multiplier(&self) -> f32 {
        match self.phase {
            LaunchPhase::Idle => 1.0,
            _ => self.ramp(self.elapsed()),
        }
    }

    /// Per-axis multipliers for this frame. Ambient while idle; frozen at the
    /// final spin-up values once the sequence has completed.
    pub fn multipliers(&self) -> SpeedMultipliers {
        if self.phase == LaunchPhase::Idle {
            return SpeedMultipliers::AMBIENT;
        }
        let m = self.multiplier();
        SpeedMultipliers {
            system: m * self.config.system_weight,
            self_spin: m * self.config.self_weight,
            orbit: m * self.config.orbit_weight,
        }
    }

    pub fn flash(&self) -> Option<FlashOverlay> {
        if !self.flash_active() {
            return None;
        }
        let dur = self.config.flash_duration as f64;
        let progress = if dur <= 0.0 { 1.0 } else { clamp01((self.flash_elapsed / dur) as f32) };
        let fade = self.config.flash_fade_fraction;
        let opacity = if fade <= 0.0 { 1.0 } else { (progress / fade).min(1.0) };
        Some(FlashOverlay { scale: ease_in_out(progress), opacity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn seq() -> LaunchSequencer {
        LaunchSequencer::new(LaunchConfig::default())
    }

    #[test]
    fn idle_is_ambient_and_ticks_do_nothing() {
        let mut s = seq();
        assert_eq!(s.tick(5.0), None);
        assert_eq!(s.phase(), LaunchPhase::Idle);
        assert_eq!(s.multipliers(), SpeedMultipliers::AMBIENT);
        assert!(s.flash().is_none());
    }

    #[test]
    fn axis_weights_follow_the_base_multiplier() {
        let mut s = seq();
        assert!(s.trigger());
        s.tick(0.5);
        let m = s.multipliers();
        assert_abs_diff_eq!(s.multiplier(), 1.6, epsilon = 1e-5);
        assert_abs_diff_eq!(m.system, 0.8, epsilon = 1e-5);
        assert_abs_diff_eq!(m.self_spin, 3.2, epsilon = 1e-5);
        assert_abs_diff_eq!(m.orbit, 2.4, epsilon = 1e-5);
    }

    #[test]
    fn linear_ramp_caps() {
        let s = seq();
        assert_abs_diff_eq!(s.ramp(0.0), 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(s.ramp(3.0), 9.1, epsilon = 1e-5);
        assert_eq!(s.ramp(100.0), 15.0);
    }

    #[test]
    fn exponential_ramp_is_monotone_and_capped() {
        let cfg = LaunchConfig { curve: RampCurve::Exponential { rate: 1.7 }, ..LaunchConfig::default() };
        let s = LaunchSequencer::new(cfg);
        assert_abs_diff_eq!(s.ramp(0.0), 0.1, epsilon = 1e-6);
        let mut prev = 0.0;
        for i in 0..=300 {
            let v = s.ramp(i as f32 * 0.01);
            assert!(v >= prev && v <= 15.0);
            prev = v;
        }
        assert_eq!(s.ramp(10.0), 15.0);
    }

    #[test]
    fn completes_once_then_flashes_to_done() {
        let mut s = seq();
        s.trigger();
        let mut events = Vec::new();
        for _ in 0..12 {
            events.extend(s.tick(0.25));
        }
        assert_eq!(events, vec![LaunchEvent::Completed]);
        assert_eq!(s.phase(), LaunchPhase::Complete);
        assert_eq!(s.elapsed(), 3.0);

        let flash = s.flash().unwrap();
        assert_eq!(flash.opacity, 0.0);

        assert_eq!(s.tick(0.4), None);
        assert_eq!(s.phase(), LaunchPhase::FlashTransition);
        assert_eq!(s.tick(0.4), Some(LaunchEvent::FlashFinished));
        assert!(s.is_done());
        assert!(s.flash().unwrap().is_opaque());
        assert_eq!(s.tick(1.0), None);
    }

    #[test]
    fn flash_opacity_saturates_early_and_scale_eases() {
        let mut s = seq();
        s.trigger();
        s.tick(3.0);
        s.tick(0.12);
        let f = s.flash().unwrap();
        assert_abs_diff_eq!(f.opacity, 0.5, epsilon = 1e-4);
        assert!(f.scale < 0.15);

        s.tick(0.28);
        let f = s.flash().unwrap();
        assert_eq!(f.opacity, 1.0);
        assert_abs_diff_eq!(f.scale, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn overshoot_on_the_completing_tick_feeds_the_flash() {
        let mut s = seq();
        s.trigger();
        s.tick(2.75);
        assert_eq!(s.tick(0.5), Some(LaunchEvent::Completed));
        assert_eq!(s.elapsed(), 3.0);
        // 0.25 s of the completing frame already counts toward the 0.8 s flash
        assert_abs_diff_eq!(s.flash().unwrap().opacity, 1.0, epsilon = 1e-6);
        assert_eq!(s.tick(0.5), None);
        assert_eq!(s.tick(0.05), Some(LaunchEvent::FlashFinished));
        assert!(s.is_done());
    }

    #[test]
    fn multipliers_freeze_after_completion() {
        let mut s = seq();
        s.trigger();
        s.tick(3.0);
        let at_complete = s.multipliers();
        s.tick(0.5);
        assert_eq!(s.multipliers(), at_complete);
    }

    #[test]
    fn retrigger_is_ignored_in_every_later_phase() {
        let mut s = seq();
        s.trigger();
        s.tick(1.0);
        assert!(!s.trigger());
        assert_eq!(s.elapsed(), 1.0);
        s.tick(2.0);
        assert!(!s.trigger());
        s.tick(1.0);
        assert!(!s.trigger());
        assert!(s.is_done());
    }

    #[test]
    fn bad_deltas_are_ignored() {
        let mut s = seq();
        s.trigger();
        s.tick(f32::NAN);
        s.tick(-4.0);
        s.tick(f32::INFINITY);
        assert_eq!(s.elapsed(), 0.0);
        assert_eq!(s.phase(), LaunchPhase::Accelerating);
    }

    #[test]
    fn ramp_curve_serde_shape() {
        let json = serde_json::to_string(&RampCurve::Exponential { rate: 1.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"exponential","rate":1.5}"#);
        let back: RampCurve = serde_json::from_str(r#"{"kind":"linear"}"#).unwrap();
        assert_eq!(back, RampCurve::Linear);
    }
}
