//! Persisted loop record and start-parameter normalization.

use serde::{Deserialize, Serialize};

/// Budget used when a start request omits `max_iterations` or passes a non-positive value.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Loop status for one project (`.opencode/ralph-state.json`).
///
/// A start always replaces the whole record. Idle events mutate it once each
/// (either `iterations += 1` or `active = false`), and cancel only clears
/// `active`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct LoopState {
    /// Whether the next idle event may relaunch the agent.
    pub active: bool,
    /// Instruction re-sent on every iteration.
    #[serde(rename = "prompt")]
    pub instruction: String,
    /// Exact substring that ends the loop when it shows up in agent output.
    #[serde(
        rename = "completionPromise",
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_signal: Option<String>,
    /// Iterations launched so far.
    #[serde(rename = "iterations")]
    pub iteration_count: u32,
    pub max_iterations: u32,
    /// Milliseconds since the Unix epoch at which the loop was started.
    #[serde(rename = "lastRun", skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<u64>,
}

impl LoopState {
    /// Fresh, armed record written by a start request.
    pub fn started(
        instruction: impl Into<String>,
        completion_signal: Option<String>,
        max_iterations: u32,
        started_at: Option<u64>,
    ) -> Self {
        Self {
            active: true,
            instruction: instruction.into(),
            completion_signal: normalize_completion_signal(completion_signal),
            iteration_count: 0,
            max_iterations,
            last_started_at: started_at,
        }
    }

    /// Completion signal, if one is set and non-empty.
    pub fn signal(&self) -> Option<&str> {
        self.completion_signal.as_deref().filter(|s| !s.is_empty())
    }

    pub fn budget_exhausted(&self) -> bool {
        self.iteration_count >= self.max_iterations
    }
}

/// Treat an empty completion signal as "no signal".
pub fn normalize_completion_signal(signal: Option<String>) -> Option<String> {
    signal.filter(|s| !s.is_empty())
}

/// Coerce a requested budget to `>= 1`, falling back to `default` for absent or non-positive input.
pub fn normalize_max_iterations(requested: Option<i64>, default: u32) -> u32 {
    match requested {
        Some(n) if n > 0 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => default.max(1),
    }
}
