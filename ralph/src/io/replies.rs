//! Reply texts returned to the host for tool calls.

use anyhow::Result;
use minijinja::{Environment, context};

const STARTED_TEMPLATE: &str = include_str!("replies/started.md");

/// Reply to `ralph_cancel` when no loop is armed.
pub const NOTHING_TO_CANCEL: &str = "No active Ralph Loop to cancel.";
/// Reply to `ralph_cancel` after disarming the loop.
pub const CANCELLED: &str = "Ralph Loop CANCELLED.";

/// Render the acknowledgement for `ralph_start`, echoing the effective parameters.
pub fn render_started(
    instruction: &str,
    completion_signal: Option<&str>,
    max_iterations: u32,
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("started", STARTED_TEMPLATE)?;
    let rendered = env.get_template("started")?.render(context! {
        prompt => instruction,
        completion_promise => completion_signal,
        max_iterations => max_iterations,
    })?;
    Ok(rendered.trim_end().to_string())
}
