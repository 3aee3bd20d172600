//! Weather and track effects on pace

use crate::models::{TrackCondition, TrackKind, Weather, WeatherKind};
use serde::{Deserialize, Serialize};

const SPEED_BAND: (f64, f64) = (0.8, 1.1);
const STAMINA_BAND: (f64, f64) = (0.6, 1.1);

/// Combined environmental multipliers; 1.0 is neutral
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentFactors {
    pub speed: f64,
    pub stamina: f64,
}

impl Default for EnvironmentFactors {
    fn default() -> Self {
        Self {
            speed: 1.0,
            stamina: 1.0,
        }
    }
}

/// (speed penalty, stamina penalty) at full intensity
fn weather_penalty(kind: WeatherKind) -> (f64, f64) {
    match kind {
        WeatherKind::Clear => (0.0, 0.0),
        WeatherKind::Cloudy => (0.005, 0.0),
        WeatherKind::Windy => (0.03, 0.04),
        WeatherKind::Rain => (0.04, 0.06),
        WeatherKind::Storm => (0.08, 0.12),
    }
}

/// (speed delta, stamina delta) for a well-prepared surface
fn track_effect(kind: TrackKind) -> (f64, f64) {
    match kind {
        TrackKind::Firm => (0.015, 0.0),
        TrackKind::Good => (0.0, 0.0),
        TrackKind::Soft => (-0.03, -0.05),
        TrackKind::Heavy => (-0.07, -0.12),
        TrackKind::Synthetic => (0.005, 0.0),
    }
}

/// Resolve weather and track into speed and stamina factors
pub fn resolve(weather: Option<&Weather>, track: Option<&TrackCondition>) -> EnvironmentFactors {
    let mut factors = EnvironmentFactors::default();

    if let Some(w) = weather {
        let intensity = w.intensity.clamp(0.0, 1.0);
        let (speed, stamina) = weather_penalty(w.kind);
        factors.speed *= 1.0 - speed * intensity;
        factors.stamina *= 1.0 - stamina * intensity;
    }

    if let Some(t) = track {
        let wear = 1.0 - t.quality.clamp(0.0, 1.0);
        let (speed, stamina) = track_effect(t.kind);
        factors.speed *= (1.0 + speed) * (1.0 - 0.04 * wear);
        factors.stamina *= (1.0 + stamina) * (1.0 - 0.05 * wear);
    }

    EnvironmentFactors {
        speed: factors.speed.clamp(SPEED_BAND.0, SPEED_BAND.1),
        stamina: factors.stamina.clamp(STAMINA_BAND.0, STAMINA_BAND.1),
    }
}
