//! Race Simulator
//!
//! Everything that decides the result is computed once at construction: a
//! planned duration, and for each competitor a target finish time and pace
//! profile. Ticks only animate progress towards those targets, so the final
//! order is fixed by `(spec, seed)` no matter when the scheduler fires.

use super::duration::{plan_duration, DurationTable};
use super::environment::{self, EnvironmentFactors};
use crate::config::EngineConfig;
use crate::core::pace::{fatigue_multiplier, pace_curve, PaceProfile};
use crate::core::probability::{normalize_probabilities, strengths};
use crate::core::rng::SeededRng;
use crate::error::{validate_field, SimulationError};
use crate::models::{
    CompetitorId, FinishTime, Odds, RaceResult, RaceSpec, RaceStatus, RunnerProgress, Tick,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Progress at which a competitor counts as home
pub const FINISH_THRESHOLD: f64 = 0.999;
/// Grace period after the slowest target before the race is forced to finish
pub const SAFETY_BUFFER_MS: u64 = 1_000;

/// Target multiplier for the weakest (+6%) and strongest (-12%) runner
const SLOW_BIAS: f64 = 0.06;
const FAST_BIAS: f64 = -0.12;
const MULTIPLIER_BAND: (f64, f64) = (0.82, 1.14);

type TickListener = Box<dyn FnMut(&Tick) + Send>;
type FinishListener = Box<dyn FnMut(&RaceResult) + Send>;

/// Precomputed plan for one competitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerPlan {
    pub competitor_id: CompetitorId,
    pub number: u32,
    pub probability: f64,
    pub strength: f64,
    pub target_finish_ms: f64,
    pub pace: PaceProfile,
    /// Magnitude of the per-tick progress jitter
    pub jitter: f64,
}

/// Controller for one simulated race
///
/// Owns its RNG stream and state; nothing is shared between instances.
pub struct RaceSimulator {
    spec: RaceSpec,
    seed: u64,
    tick_interval_ms: u64,
    rng: SeededRng,
    environment: EnvironmentFactors,
    planned_duration_ms: u64,
    runners: Vec<RunnerPlan>,
    status: RaceStatus,
    started_at_ms: Option<i64>,
    last_progress: Vec<f64>,
    result: Option<RaceResult>,
    tick_listeners: Vec<TickListener>,
    finish_listeners: Vec<FinishListener>,
}

impl RaceSimulator {
    /// Build a simulator with the default duration table
    pub fn create(spec: RaceSpec, seed: u64, tick_interval_ms: u64) -> Result<Self, SimulationError> {
        Self::create_with_durations(spec, seed, tick_interval_ms, &DurationTable::default())
    }

    /// Build a simulator using the config's duration table and tick interval
    pub fn from_config(spec: RaceSpec, seed: u64, config: &EngineConfig) -> Result<Self, SimulationError> {
        Self::create_with_durations(spec, seed, config.tick_interval_ms, &config.durations)
    }

    pub fn create_with_durations(
        spec: RaceSpec,
        seed: u64,
        tick_interval_ms: u64,
        durations: &DurationTable,
    ) -> Result<Self, SimulationError> {
        validate_field(&spec.race_id, spec.competitors.len())?;
        if tick_interval_ms == 0 {
            return Err(SimulationError::InvalidTickInterval(tick_interval_ms));
        }

        let mut rng = SeededRng::new(seed);

        let odds: Vec<Odds> = spec.competitors.iter().map(|c| c.odds).collect();
        let probabilities = normalize_probabilities(&odds);

        let bounds = durations.for_category(&spec.category);
        if !bounds.is_valid() {
            return Err(SimulationError::InvalidDurationBounds {
                category: spec.category.as_str().to_string(),
                min_ms: bounds.min_ms,
                max_ms: bounds.max_ms,
            });
        }
        let planned_duration_ms = plan_duration(bounds, &mut rng);

        let environment = environment::resolve(spec.weather.as_ref(), spec.track.as_ref());

        let strength = strengths(&probabilities);
        let runners: Vec<RunnerPlan> = spec
            .competitors
            .iter()
            .zip(probabilities.iter().zip(strength.iter()))
            .map(|(competitor, (&probability, &strength))| {
                let target_finish_ms =
                    target_finish_time(planned_duration_ms, strength, &environment, &mut rng);
                let (pace, jitter) = pace_parameters(strength, &environment, &mut rng);
                RunnerPlan {
                    competitor_id: competitor.id.clone(),
                    number: competitor.number,
                    probability,
                    strength,
                    target_finish_ms,
                    pace,
                    jitter,
                }
            })
            .collect();

        debug!(
            "Race {} planned at {}ms (speed {:.3}, stamina {:.3})",
            spec.race_id, planned_duration_ms, environment.speed, environment.stamina
        );

        let field = runners.len();
        Ok(Self {
            spec,
            seed,
            tick_interval_ms,
            rng,
            environment,
            planned_duration_ms,
            runners,
            status: RaceStatus::Pending,
            started_at_ms: None,
            last_progress: vec![0.0; field],
            result: None,
            tick_listeners: Vec::new(),
            finish_listeners: Vec::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn planned_duration_ms(&self) -> u64 {
        self.planned_duration_ms
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    pub fn race_id(&self) -> &str {
        &self.spec.race_id
    }

    pub fn spec(&self) -> &RaceSpec {
        &self.spec
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == RaceStatus::Running
    }

    pub fn environment(&self) -> EnvironmentFactors {
        self.environment
    }

    pub fn runners(&self) -> &[RunnerPlan] {
        &self.runners
    }

    pub fn result(&self) -> Option<&RaceResult> {
        self.result.as_ref()
    }

    /// Subscribe to tick snapshots
    pub fn on_tick<F>(&mut self, listener: F)
    where
        F: FnMut(&Tick) + Send + 'static,
    {
        self.tick_listeners.push(Box::new(listener));
    }

    /// Subscribe to the final result
    pub fn on_finish<F>(&mut self, listener: F)
    where
        F: FnMut(&RaceResult) + Send + 'static,
    {
        self.finish_listeners.push(Box::new(listener));
    }

    /// Start the race and emit the opening tick
    pub fn start(&mut self, now_ms: i64) -> Option<Tick> {
        if self.status != RaceStatus::Pending {
            warn!("Race {} cannot start from {}", self.spec.race_id, self.status);
            return None;
        }

        self.status = RaceStatus::Running;
        self.started_at_ms = Some(now_ms);
        info!(
            "Race {} started: {} runners, planned {}ms, seed {}",
            self.spec.race_id,
            self.runners.len(),
            self.planned_duration_ms,
            self.seed
        );

        self.advance(now_ms)
    }

    /// Scheduler callback: compute and emit the tick for `now_ms`
    ///
    /// Finalizes the race once every runner is home or the safety buffer
    /// has passed. Returns `None` when the race is not running.
    pub fn advance(&mut self, now_ms: i64) -> Option<Tick> {
        if self.status != RaceStatus::Running {
            return None;
        }
        let started = self.started_at_ms?;
        let elapsed_ms = (now_ms - started).max(0) as u64;

        let progress = self.compute_progress(elapsed_ms);
        self.last_progress.clone_from(&progress);

        let max_target = self.max_target_ms();
        let all_home = progress.iter().all(|&p| p >= FINISH_THRESHOLD);
        let overdue = elapsed_ms as f64 > max_target + SAFETY_BUFFER_MS as f64;
        let finishing = all_home || overdue;
        if finishing {
            self.status = RaceStatus::Finished;
        }

        let tick = self.build_tick(elapsed_ms, &progress, max_target);
        debug!(
            "Race {} tick at {}ms, leader {:?}",
            self.spec.race_id,
            elapsed_ms,
            tick.order.first()
        );
        for listener in self.tick_listeners.iter_mut() {
            listener(&tick);
        }

        if finishing {
            if overdue && !all_home {
                warn!(
                    "Race {} overran by {}ms, forcing finish",
                    self.spec.race_id,
                    elapsed_ms as f64 - max_target
                );
            }
            self.finalize(started);
        }

        Some(tick)
    }

    /// Abort before finalization; no finish event is emitted
    pub fn stop(&mut self) -> bool {
        match self.status {
            RaceStatus::Pending | RaceStatus::Running => {
                self.status = RaceStatus::Aborted;
                info!("Race {} aborted", self.spec.race_id);
                true
            }
            RaceStatus::Finished | RaceStatus::Aborted => false,
        }
    }

    /// Drive the race on a virtual clock until it finishes
    ///
    /// Returns the result and the number of ticks emitted.
    pub fn run_to_completion(&mut self, start_ms: i64) -> Option<(RaceResult, usize)> {
        let mut ticks = 0usize;
        if self.start(start_ms).is_some() {
            ticks += 1;
        }

        let step = self.tick_interval_ms as i64;
        let deadline = start_ms + (self.max_target_ms() as i64) + 2 * SAFETY_BUFFER_MS as i64 + step;
        let mut now = start_ms;
        while self.is_running() && now <= deadline {
            now += step;
            if self.advance(now).is_some() {
                ticks += 1;
            }
        }

        self.result.clone().map(|r| (r, ticks))
    }

    /// Authoritative finishing order: target time, then start number
    pub fn projected_order(&self) -> Vec<&RunnerPlan> {
        let mut order: Vec<&RunnerPlan> = self.runners.iter().collect();
        order.sort_by(|a, b| {
            a.target_finish_ms
                .total_cmp(&b.target_finish_ms)
                .then(a.number.cmp(&b.number))
        });
        order
    }

    fn max_target_ms(&self) -> f64 {
        self.runners
            .iter()
            .map(|r| r.target_finish_ms)
            .fold(0.0, f64::max)
    }

    fn compute_progress(&mut self, elapsed_ms: u64) -> Vec<f64> {
        let env_stamina = self.environment.stamina;
        let mut progress = Vec::with_capacity(self.runners.len());

        for (idx, runner) in self.runners.iter().enumerate() {
            let t = elapsed_ms as f64 / runner.target_finish_ms;
            let value = if t >= 1.0 {
                1.0
            } else {
                let raw = pace_curve(t, &runner.pace);
                let jitter = self.rng.symmetric(runner.jitter) * (1.0 - raw);
                let fatigue = fatigue_multiplier(raw, runner.pace.stamina, env_stamina);
                ((raw + jitter) * fatigue).clamp(0.0, 1.0)
            };
            // Never move backwards
            progress.push(value.max(self.last_progress[idx]));
        }

        progress
    }

    fn build_tick(&self, elapsed_ms: u64, progress: &[f64], max_target: f64) -> Tick {
        let mut ranked: Vec<usize> = (0..self.runners.len()).collect();
        ranked.sort_by(|&a, &b| {
            progress[b]
                .total_cmp(&progress[a])
                .then(
                    self.runners[a]
                        .target_finish_ms
                        .total_cmp(&self.runners[b].target_finish_ms),
                )
                .then(self.runners[a].number.cmp(&self.runners[b].number))
        });

        let leader = ranked.first().map(|&i| progress[i]).unwrap_or(0.0);
        let runners = self
            .runners
            .iter()
            .zip(progress.iter())
            .map(|(plan, &p)| RunnerProgress {
                competitor_id: plan.competitor_id.clone(),
                progress: p,
                gap: (leader - p).max(0.0),
            })
            .collect();

        Tick {
            race_id: self.spec.race_id.clone(),
            elapsed_ms,
            total_ms: self.planned_duration_ms,
            runners,
            order: ranked
                .iter()
                .map(|&i| self.runners[i].competitor_id.clone())
                .collect(),
            remaining_ms: (max_target - elapsed_ms as f64).max(0.0).round() as u64,
            status: self.status,
        }
    }

    fn finalize(&mut self, started_at_ms: i64) {
        let order = self.projected_order();
        let result = RaceResult {
            race_id: self.spec.race_id.clone(),
            placings: order.iter().map(|r| r.competitor_id.clone()).collect(),
            finish_times_ms: order
                .iter()
                .map(|r| FinishTime {
                    competitor_id: r.competitor_id.clone(),
                    time_ms: r.target_finish_ms.round() as u64,
                })
                .collect(),
            status: RaceStatus::Finished,
            seed: self.seed,
            started_at_ms,
        };

        self.status = RaceStatus::Finished;
        info!(
            "Race {} finished, winner {}",
            result.race_id,
            result.winner().unwrap_or("-")
        );

        for listener in self.finish_listeners.iter_mut() {
            listener(&result);
        }
        self.result = Some(result);
    }
}

impl std::fmt::Debug for RaceSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceSimulator")
            .field("race_id", &self.spec.race_id)
            .field("seed", &self.seed)
            .field("status", &self.status)
            .field("planned_duration_ms", &self.planned_duration_ms)
            .finish()
    }
}

/// Target finish time: strength bias plus Gaussian noise, wider for weak runners
fn target_finish_time(
    planned_duration_ms: u64,
    strength: f64,
    environment: &EnvironmentFactors,
    rng: &mut SeededRng,
) -> f64 {
    let bias = SLOW_BIAS + (FAST_BIAS - SLOW_BIAS) * strength;
    let sigma = 0.02 + 0.04 * (1.0 - strength);
    let multiplier = (1.0 + bias + rng.gaussian() * sigma).clamp(MULTIPLIER_BAND.0, MULTIPLIER_BAND.1);

    planned_duration_ms as f64 * multiplier / environment.speed
}

/// Pace profile and jitter magnitude for a runner
fn pace_parameters(
    strength: f64,
    environment: &EnvironmentFactors,
    rng: &mut SeededRng,
) -> (PaceProfile, f64) {
    let accel = 0.10 + 0.08 * strength + rng.symmetric(0.02);
    let kick = 0.12 + 0.10 * strength + rng.symmetric(0.02);
    let jitter = 0.004 + 0.012 * (1.0 - strength);
    let stamina = ((0.55 + 0.35 * strength + rng.gaussian() * 0.06).clamp(0.3, 1.0)
        * environment.stamina)
        .clamp(0.2, 1.0);

    (PaceProfile::new(accel, kick, stamina), jitter)
}
