//! Simulated progress feedback while the analysis request is pending.
//!
//! The simulation is purely time driven. It knows nothing about the real request;
//! the workflow stops it once the request settles, whatever step it reached.

use crate::model::{ProgressStep, StageMarker, STAGE_COUNT};
use crate::presenter::Presenter;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Stage marker bookkeeping. Markers only move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrack {
    markers: [StageMarker; STAGE_COUNT],
    current: u8,
}

impl Default for StageTrack {
    fn default() -> Self {
        Self {
            markers: [StageMarker::Pending; STAGE_COUNT],
            current: 0,
        }
    }
}

impl StageTrack {
    pub fn markers(&self) -> [StageMarker; STAGE_COUNT] {
        self.markers
    }

    /// Enter `stage` (1-based). Returns true when the markers changed.
    pub fn enter(&mut self, stage: u8) -> bool {
        let stage = stage.clamp(1, STAGE_COUNT as u8);
        if stage <= self.current {
            return false;
        }
        for marker in self.markers.iter_mut().take(stage as usize - 1) {
            *marker = StageMarker::Completed;
        }
        self.markers[stage as usize - 1] = StageMarker::Active;
        self.current = stage;
        true
    }
}

/// Cancellation handle returned by [`ProgressSimulator::start`].
pub struct ProgressHandle {
    token: CancellationToken,
    // Held while painting so that `stop` cannot interleave with a tick.
    gate: Arc<Mutex<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl ProgressHandle {
    #[cfg(test)]
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }
}

pub struct ProgressSimulator {
    steps: Arc<[ProgressStep]>,
    interval: Duration,
    presenter: Arc<dyn Presenter>,
}

impl ProgressSimulator {
    pub fn new(steps: Vec<ProgressStep>, interval: Duration, presenter: Arc<dyn Presenter>) -> Self {
        Self {
            steps: steps.into(),
            interval,
            presenter,
        }
    }

    /// Begin ticking through the step sequence. Must be called inside a tokio runtime.
    pub fn start(&self) -> ProgressHandle {
        let token = CancellationToken::new();
        let gate = Arc::new(Mutex::new(()));
        let steps = self.steps.clone();
        let interval = self.interval;
        let presenter = self.presenter.clone();

        tracing::debug!(steps = steps.len(), ?interval, "progress simulation started");

        // First tick one full interval after start, like a browser interval timer.
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        let task_token = token.clone();
        let task_gate = gate.clone();
        let task = tokio::spawn(async move {
            let mut stages = StageTrack::default();
            for step in steps.iter() {
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = ticker.tick() => {}
                }
                let _guard = task_gate.lock().unwrap_or_else(|e| e.into_inner());
                if task_token.is_cancelled() {
                    return;
                }
                presenter.paint_progress(&step.message, step.percent_complete);
                if stages.enter(step.stage) {
                    presenter.paint_stages(stages.markers());
                }
            }
            // Sequence exhausted: idle until stopped.
            task_token.cancelled().await;
        });

        ProgressHandle { token, gate, task }
    }

    /// Halt ticking. Once this returns no further step is painted.
    pub fn stop(&self, handle: ProgressHandle) {
        {
            let _guard = handle.gate.lock().unwrap_or_else(|e| e.into_inner());
            handle.token.cancel();
        }
        handle.task.abort();
        tracing::debug!("progress simulation stopped");
    }

    /// Return progress visuals to their zero state: empty message, 0%, all stages pending.
    pub fn reset_visuals(&self) {
        self.presenter.reset_progress();
    }
}
