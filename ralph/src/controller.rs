//! Loop controller: start, cancel, and the idle-triggered continue/stop decision.
//!
//! All state transitions happen here. Each operation reads the whole record,
//! changes it, and writes it back; within [`LoopController::on_idle`] the
//! record is persisted before the next agent is launched, so a crash between
//! the two leaves the counter advanced and the launch not retried.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::core::evaluator::{Verdict, evaluate};
use crate::core::output::OutputTracker;
use crate::core::state::{LoopState, normalize_max_iterations};
use crate::io::config::RalphConfig;
use crate::io::launcher::{LaunchRequest, Launcher};
use crate::io::replies::{CANCELLED, NOTHING_TO_CANCEL, render_started};
use crate::io::state_store::StateStore;

/// Parameters of a start request, as received from the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartRequest {
    pub instruction: String,
    pub completion_signal: Option<String>,
    /// Requested budget; absent or non-positive means the configured default.
    pub max_iterations: Option<i64>,
}

/// What an idle event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleReport {
    pub verdict: Verdict,
    /// Iteration counter after the event.
    pub iterations: u32,
    pub max_iterations: u32,
    /// Whether the next agent process was spawned.
    pub launched: bool,
}

/// Drives one project's loop. Owns the session's output tracker.
pub struct LoopController<S, L> {
    project_dir: PathBuf,
    store: S,
    launcher: L,
    config: RalphConfig,
    tracker: OutputTracker,
}

impl<S: StateStore, L: Launcher> LoopController<S, L> {
    pub fn new(
        project_dir: impl Into<PathBuf>,
        store: S,
        launcher: L,
        config: RalphConfig,
    ) -> Self {
        Self {
            project_dir: project_dir.into(),
            store,
            launcher,
            config,
            tracker: OutputTracker::new(),
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Current persisted state.
    pub fn state(&self) -> LoopState {
        self.store.load()
    }

    pub fn tracked_output(&self) -> &str {
        self.tracker.last_output()
    }

    /// Arm a new loop, replacing any previous record (including one mid-run).
    #[instrument(skip_all)]
    pub fn start(&mut self, request: StartRequest) -> Result<String> {
        let max_iterations =
            normalize_max_iterations(request.max_iterations, self.config.default_max_iterations);
        let state = LoopState::started(
            request.instruction,
            request.completion_signal,
            max_iterations,
            unix_millis(),
        );
        self.store.save(&state).context("persist started loop")?;
        info!(
            max_iterations,
            has_signal = state.signal().is_some(),
            "loop started"
        );
        render_started(&state.instruction, state.signal(), state.max_iterations)
    }

    /// Disarm the loop. A loop that is not active is left untouched.
    ///
    /// An agent that was already launched keeps running; only future launches stop.
    #[instrument(skip_all)]
    pub fn cancel(&mut self) -> Result<String> {
        let mut state = self.store.load();
        if !state.active {
            debug!("cancel requested with no active loop");
            return Ok(NOTHING_TO_CANCEL.to_string());
        }
        state.active = false;
        self.store.save(&state).context("persist cancelled loop")?;
        info!(iterations = state.iteration_count, "loop cancelled");
        Ok(CANCELLED.to_string())
    }

    /// Feed a host message into the output tracker.
    pub fn observe_message(&mut self, role: &str, content: &Value) {
        if self.tracker.observe(role, content) {
            debug!(chars = self.tracker.last_output().len(), "tracked assistant output");
        }
    }

    /// Handle the end of an agent turn. Never fails; problems are logged.
    #[instrument(skip_all)]
    pub fn on_idle(&mut self) -> IdleReport {
        let mut state = self.store.load();
        let verdict = evaluate(&state, self.tracker.last_output());
        let mut report = IdleReport {
            verdict,
            iterations: state.iteration_count,
            max_iterations: state.max_iterations,
            launched: false,
        };

        match verdict {
            Verdict::Idle => {
                debug!("no active loop");
                return report;
            }
            Verdict::Complete => {
                info!(
                    iterations = state.iteration_count,
                    "completion promise found, stopping loop"
                );
                state.active = false;
            }
            Verdict::BudgetExhausted => {
                info!(
                    max_iterations = state.max_iterations,
                    "max iterations reached, stopping loop"
                );
                state.active = false;
            }
            Verdict::Continue => {
                state.iteration_count += 1;
                report.iterations = state.iteration_count;
            }
        }

        if let Err(err) = self.store.save(&state) {
            error!(err = %format!("{err:#}"), ?verdict, "failed to persist loop state");
            return report;
        }
        if verdict.stops_loop() {
            return report;
        }

        info!(
            iteration = state.iteration_count,
            max_iterations = state.max_iterations,
            "restarting agent"
        );
        let request =
            LaunchRequest::from_config(&self.project_dir, &self.config.agent, &state.instruction);
        match self.launcher.launch(&request) {
            Ok(()) => report.launched = true,
            Err(err) => error!(err = %format!("{err:#}"), "failed to restart agent"),
        }
        report
    }
}

fn unix_millis() -> Option<u64> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(elapsed.as_millis()).ok()
}
