//! Continue/stop decision for an idle event.

use crate::core::state::LoopState;

/// Outcome of evaluating a loop after the agent's turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Loop is not armed; nothing to do.
    Idle,
    /// Completion signal found in the tracked output.
    Complete,
    /// `iterations >= max_iterations`.
    BudgetExhausted,
    /// Advance the counter and relaunch the agent.
    Continue,
}

impl Verdict {
    /// True when the caller must clear `active` and persist.
    pub fn stops_loop(self) -> bool {
        matches!(self, Verdict::Complete | Verdict::BudgetExhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Idle => "idle",
            Verdict::Complete => "complete",
            Verdict::BudgetExhausted => "budget-exhausted",
            Verdict::Continue => "continue",
        }
    }
}

/// Decide what an idle event does to `state`, given the latest assistant text.
///
/// The signal check runs before the budget check, so a signal that appears on
/// the last budgeted turn still reports `Complete`. Matching is an exact,
/// case-sensitive substring search.
pub fn evaluate(state: &LoopState, tracked_output: &str) -> Verdict {
    if !state.active {
        return Verdict::Idle;
    }
    if let Some(signal) = state.signal()
        && tracked_output.contains(signal)
    {
        return Verdict::Complete;
    }
    if state.budget_exhausted() {
        return Verdict::BudgetExhausted;
    }
    Verdict::Continue
}
