//! Pace curve
//!
//! Maps the fraction of a competitor's target time already elapsed onto the
//! fraction of the race completed. Three phases:
//!
//! ```text
//! accel:  quadratic ease-in, speed ramps from 0 to cruise speed
//! cruise: near-linear, with a small wobble for tiring runners
//! kick:   speed ramps up again, boost capped by stamina
//! ```
//!
//! The cruise speed is solved so the curve always lands on exactly 1.0.

use serde::{Deserialize, Serialize};

/// Extra speed available in the kick for a runner with full stamina
pub const KICK_BOOST: f64 = 0.4;
/// Amplitude of the cruise-phase wobble at zero stamina
pub const CRUISE_WOBBLE: f64 = 0.003;
/// Largest fatigue penalty on progress
pub const FATIGUE_MAX: f64 = 0.3;
/// Progress from which fatigue starts to bite
pub const FATIGUE_ONSET: f64 = 0.6;

const MIN_PHASE: f64 = 0.05;
const MAX_ACCEL_PLUS_KICK: f64 = 0.85;

/// Per-competitor pacing parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaceProfile {
    pub accel_fraction: f64,
    pub kick_fraction: f64,
    pub stamina: f64,
}

impl PaceProfile {
    /// Clamp phase lengths into a shape the curve can integrate
    pub fn new(accel_fraction: f64, kick_fraction: f64, stamina: f64) -> Self {
        let mut accel = accel_fraction.clamp(MIN_PHASE, 0.5);
        let mut kick = kick_fraction.clamp(MIN_PHASE, 0.5);
        let combined = accel + kick;
        if combined > MAX_ACCEL_PLUS_KICK {
            let scale = MAX_ACCEL_PLUS_KICK / combined;
            accel *= scale;
            kick *= scale;
        }

        Self {
            accel_fraction: accel,
            kick_fraction: kick,
            stamina: stamina.clamp(0.0, 1.0),
        }
    }

    fn cruise_fraction(&self) -> f64 {
        1.0 - self.accel_fraction - self.kick_fraction
    }

    fn kick_boost(&self) -> f64 {
        KICK_BOOST * self.stamina.min(1.0)
    }

    fn cruise_speed(&self) -> f64 {
        let a = self.accel_fraction;
        let k = self.kick_fraction;
        1.0 / (a / 2.0 + self.cruise_fraction() + k * (1.0 + self.kick_boost() / 2.0))
    }
}

/// Race completion for a given elapsed fraction of the target time
pub fn pace_curve(t: f64, profile: &PaceProfile) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let a = profile.accel_fraction;
    let m = profile.cruise_fraction();
    let k = profile.kick_fraction;
    let v = profile.cruise_speed();

    let progress = if t < a {
        let u = t / a;
        v * a / 2.0 * u * u
    } else if t < a + m {
        let u = (t - a) / m;
        let wobble = CRUISE_WOBBLE
            * (1.0 - profile.stamina)
            * (2.0 * std::f64::consts::TAU * u).sin();
        v * a / 2.0 + v * m * u + wobble
    } else {
        let u = (t - a - m) / k;
        v * (a / 2.0 + m) + v * k * (u + profile.kick_boost() * u * u / 2.0)
    };

    progress.clamp(0.0, 1.0)
}

/// Progress multiplier modelling late-race fatigue
///
/// Zero effect before [`FATIGUE_ONSET`] and at the line; peaks in between.
/// Lower stamina (or a draining environment) deepens the dip.
pub fn fatigue_multiplier(raw_progress: f64, stamina: f64, env_stamina: f64) -> f64 {
    if raw_progress <= FATIGUE_ONSET || raw_progress >= 1.0 {
        return 1.0;
    }

    let x = (raw_progress - FATIGUE_ONSET) / (1.0 - FATIGUE_ONSET);
    let window = 4.0 * x * (1.0 - x);
    let deficit = ((1.0 - stamina) / env_stamina.max(0.5)).clamp(0.0, 1.0);

    1.0 - FATIGUE_MAX * deficit * window
}
