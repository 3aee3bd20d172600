//! Fixed-period scheduler for a running race
//!
//! The simulator itself never sleeps; this driver owns the repeating timer
//! and forwards every tick and the final result over a channel.

use super::engine::RaceSimulator;
use crate::models::{RaceResult, Tick};
use chrono::Utc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Event emitted by a driven race
#[derive(Debug, Clone)]
pub enum RaceEvent {
    Tick(Tick),
    Finished(RaceResult),
}

/// Handle to a race running on the tokio runtime
pub struct RaceHandle {
    race_id: String,
    stop_tx: Option<oneshot::Sender<()>>,
    events: mpsc::UnboundedReceiver<RaceEvent>,
    join: JoinHandle<Option<RaceResult>>,
}

impl RaceHandle {
    pub fn race_id(&self) -> &str {
        &self.race_id
    }

    /// Request an abort; ignored once the race has finished
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Next tick or finish event; `None` once the race task has ended
    pub async fn next_event(&mut self) -> Option<RaceEvent> {
        self.events.recv().await
    }

    /// Wait for the race task and return its result (absent if aborted)
    pub async fn wait(self) -> Option<RaceResult> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Race {} task failed: {}", self.race_id, e);
                None
            }
        }
    }
}

/// Spawn a simulator on a tokio interval at its configured tick period
pub fn spawn_race(mut sim: RaceSimulator) -> RaceHandle {
    let race_id = sim.race_id().to_string();
    let (event_tx, events) = mpsc::unbounded_channel();
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let tick_tx = event_tx.clone();
    sim.on_tick(move |tick| {
        let _ = tick_tx.send(RaceEvent::Tick(tick.clone()));
    });
    sim.on_finish(move |result| {
        let _ = event_tx.send(RaceEvent::Finished(result.clone()));
    });

    let join = tokio::spawn(async move {
        let period = Duration::from_millis(sim.tick_interval_ms());
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Wall-clock anchor, advanced by the runtime's monotonic clock
        let epoch_ms = Utc::now().timestamp_millis();
        let origin = Instant::now();
        let now_ms = move || epoch_ms + origin.elapsed().as_millis() as i64;

        interval.tick().await;
        sim.start(now_ms());

        let mut stop_open = true;
        while sim.is_running() {
            tokio::select! {
                signal = &mut stop_rx, if stop_open => {
                    match signal {
                        Ok(()) => {
                            sim.stop();
                        }
                        Err(_) => stop_open = false,
                    }
                }
                _ = interval.tick() => {
                    sim.advance(now_ms());
                }
            }
        }

        debug!("Race {} schedule cancelled ({})", sim.race_id(), sim.status());
        // Dropping the simulator closes the event channel
        sim.result().cloned()
    });

    RaceHandle {
        race_id,
        stop_tx: Some(stop_tx),
        events,
        join,
    }
}
