//! Host-invocable tools: `ralph_start` and `ralph_cancel`.
//!
//! Each tool publishes a description and a JSON Schema for its arguments.
//! Incoming arguments are checked against that schema before they reach the
//! controller, and [`invoke`] turns every failure into reply text so a tool
//! call can never fault the host.

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::controller::{LoopController, StartRequest};
use crate::core::state::DEFAULT_MAX_ITERATIONS;
use crate::io::launcher::Launcher;
use crate::io::state_store::StateStore;

pub const START_TOOL: &str = "ralph_start";
pub const CANCEL_TOOL: &str = "ralph_cancel";

const START_DESCRIPTION: &str = "\
Start a Ralph Loop to iteratively improve code until a completion promise is met.

This tool will:
1. Save your prompt and completion criteria.
2. If you exit without outputting the completion promise, the system will automatically restart you with the SAME prompt.
3. This allows you to check your work (tests, linters), fail, and try again in the next iteration.";

const CANCEL_DESCRIPTION: &str = "Stop the active Ralph Loop immediately.";

/// Tool metadata advertised to the host.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema for the tool's arguments object.
    pub parameters: Value,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: START_TOOL,
            description: START_DESCRIPTION,
            parameters: start_schema(),
        },
        ToolDefinition {
            name: CANCEL_TOOL,
            description: CANCEL_DESCRIPTION,
            parameters: cancel_schema(),
        },
    ]
}

fn start_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "prompt": {
                "type": "string",
                "description": "The instruction to repeat (e.g., 'Run tests and fix all bugs')"
            },
            "completion_promise": {
                "type": ["string", "null"],
                "description": "The exact text string you will output ONLY when the task is fully complete (e.g., 'RALPH_DONE')"
            },
            "max_iterations": {
                "type": ["number", "null"],
                "description": "Maximum number of iterations (default: 10)",
                "default": DEFAULT_MAX_ITERATIONS
            }
        },
        "required": ["prompt"]
    })
}

fn cancel_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

/// Arguments of `ralph_start` as sent by the host.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StartArgs {
    pub prompt: String,
    #[serde(default)]
    pub completion_promise: Option<String>,
    #[serde(default)]
    pub max_iterations: Option<f64>,
}

impl From<StartArgs> for StartRequest {
    fn from(args: StartArgs) -> Self {
        StartRequest {
            instruction: args.prompt,
            completion_signal: args.completion_promise,
            // Saturating cast: NaN becomes 0 and falls back to the default budget.
            max_iterations: args.max_iterations.map(|n| n.trunc() as i64),
        }
    }
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Start(StartArgs),
    Cancel,
}

/// Validate `arguments` against the tool's schema and decode them.
pub fn parse_tool_call(name: &str, arguments: &Value) -> Result<ToolCall> {
    // Hosts may omit the arguments object entirely for argument-less tools.
    let empty = json!({});
    let arguments = if arguments.is_null() { &empty } else { arguments };
    match name {
        START_TOOL => {
            validate_arguments(arguments, &start_schema())?;
            let args: StartArgs = serde_json::from_value(arguments.clone())
                .with_context(|| format!("decode {START_TOOL} arguments"))?;
            Ok(ToolCall::Start(args))
        }
        CANCEL_TOOL => {
            validate_arguments(arguments, &cancel_schema())?;
            Ok(ToolCall::Cancel)
        }
        other => bail!("unknown tool '{other}'"),
    }
}

/// Validate JSON arguments against a JSON Schema (Draft 2020-12).
fn validate_arguments(instance: &Value, schema: &Value) -> Result<()> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .context("compile tool schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("invalid arguments:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

/// Run a tool call against `controller`. Never fails: errors become reply text.
pub fn invoke<S: StateStore, L: Launcher>(
    controller: &mut LoopController<S, L>,
    name: &str,
    arguments: &Value,
) -> String {
    debug!(tool = name, "tool call");
    let result = parse_tool_call(name, arguments).and_then(|call| match call {
        ToolCall::Start(args) => controller.start(args.into()),
        ToolCall::Cancel => controller.cancel(),
    });
    match result {
        Ok(reply) => reply,
        Err(err) => {
            warn!(tool = name, err = %format!("{err:#}"), "tool call failed");
            format!("Error: {err:#}")
        }
    }
}
