//! JSON-lines adapter between a host runtime and the loop controller.
//!
//! The host writes one event per line:
//!
//! ```text
//! {"type":"chat.message","role":"assistant","content":"..."}
//! {"type":"tool.call","id":"call-1","name":"ralph_start","arguments":{"prompt":"..."}}
//! {"type":"session.idle"}
//! ```
//!
//! Tool calls are answered with one line `{"id":..,"name":..,"output":..}`,
//! where `id` is echoed back unchanged. A `tool.call` whose envelope does not
//! decode still gets an `Error: ...` reply. Other malformed lines and unknown
//! event types are logged and skipped so that a bad event never ends the
//! session.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::controller::{IdleReport, LoopController};
use crate::io::launcher::Launcher;
use crate::io::state_store::StateStore;
use crate::tools;

/// Events consumed from the host.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum HostEvent {
    #[serde(rename = "chat.message")]
    ChatMessage {
        #[serde(default)]
        role: String,
        #[serde(default)]
        content: Value,
    },
    #[serde(rename = "tool.call")]
    ToolCall {
        #[serde(default)]
        id: Option<Value>,
        name: String,
        #[serde(default)]
        arguments: Value,
    },
    #[serde(rename = "session.idle")]
    SessionIdle,
}

/// Answer to a tool call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub name: String,
    pub output: String,
}

/// One live host session for a project.
pub struct Session<S, L> {
    controller: LoopController<S, L>,
}

impl<S: StateStore, L: Launcher> Session<S, L> {
    pub fn new(controller: LoopController<S, L>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &LoopController<S, L> {
        &self.controller
    }

    /// Dispatch one event. Returns a reply only for tool calls.
    pub fn handle_event(&mut self, event: HostEvent) -> Option<ToolReply> {
        match event {
            HostEvent::ChatMessage { role, content } => {
                self.controller.observe_message(&role, &content);
                None
            }
            HostEvent::ToolCall {
                id,
                name,
                arguments,
            } => {
                let output = tools::invoke(&mut self.controller, &name, &arguments);
                Some(ToolReply { id, name, output })
            }
            HostEvent::SessionIdle => {
                let report = self.controller.on_idle();
                log_idle(&report);
                None
            }
        }
    }

    /// Decode and dispatch one raw line.
    ///
    /// Blank and undecodable lines yield no reply, except a `tool.call` with a
    /// broken envelope, which is answered with an error so the caller is not
    /// left waiting.
    pub fn handle_line(&mut self, line: &str) -> Option<ToolReply> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<HostEvent>(line) {
            Ok(event) => self.handle_event(event),
            Err(err) => {
                let reply = rejected_tool_call(line, &err);
                if reply.is_none() {
                    warn!(err = %err, "skipping unrecognized host event");
                }
                reply
            }
        }
    }

    /// Process events from `input` until EOF, writing tool replies to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> Result<()> {
        info!(project = %self.controller.project_dir().display(), "session started");
        for line in input.lines() {
            let line = line.context("read host event")?;
            if let Some(reply) = self.handle_line(&line) {
                let mut buf = serde_json::to_string(&reply).context("serialize tool reply")?;
                buf.push('\n');
                output
                    .write_all(buf.as_bytes())
                    .context("write tool reply")?;
                output.flush().context("flush tool reply")?;
            }
        }
        info!("session ended");
        Ok(())
    }
}

/// Error reply for a line tagged `tool.call` that failed to decode as one.
fn rejected_tool_call(line: &str, err: &serde_json::Error) -> Option<ToolReply> {
    let raw: Value = serde_json::from_str(line).ok()?;
    if raw.get("type").and_then(Value::as_str) != Some("tool.call") {
        return None;
    }
    let id = raw.get("id").filter(|id| !id.is_null()).cloned();
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    warn!(err = %err, tool = %name, "rejecting malformed tool call");
    Some(ToolReply {
        id,
        name,
        output: format!("Error: malformed tool call: {err}"),
    })
}

fn log_idle(report: &IdleReport) {
    debug!(
        verdict = ?report.verdict,
        iterations = report.iterations,
        max_iterations = report.max_iterations,
        launched = report.launched,
        "idle handled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::config::RalphConfig;
    use crate::test_support::{MemoryStateStore, RecordingLauncher};
    use serde_json::json;

    fn session() -> Session<MemoryStateStore, RecordingLauncher> {
        Session::new(LoopController::new(
            "/work",
            MemoryStateStore::new(None),
            RecordingLauncher::new(),
            RalphConfig::default(),
        ))
    }

    #[test]
    fn decodes_each_event_type() {
        let msg: HostEvent =
            serde_json::from_str(r#"{"type":"chat.message","role":"assistant","content":"hi"}"#)
                .expect("message");
        assert_eq!(
            msg,
            HostEvent::ChatMessage {
                role: "assistant".to_string(),
                content: json!("hi")
            }
        );
        let idle: HostEvent = serde_json::from_str(r#"{"type":"session.idle"}"#).expect("idle");
        assert_eq!(idle, HostEvent::SessionIdle);
        let call: HostEvent =
            serde_json::from_str(r#"{"type":"tool.call","name":"ralph_cancel"}"#).expect("call");
        assert_eq!(
            call,
            HostEvent::ToolCall {
                id: None,
                name: "ralph_cancel".to_string(),
                arguments: Value::Null
            }
        );
    }

    #[test]
    fn idle_event_tolerates_extra_fields() {
        let idle: HostEvent =
            serde_json::from_str(r#"{"type":"session.idle","sessionID":"s-1"}"#).expect("idle");
        assert_eq!(idle, HostEvent::SessionIdle);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let mut session = session();
        assert_eq!(session.handle_line("not json"), None);
        assert_eq!(session.handle_line(r#"{"type":"session.updated"}"#), None);
        assert_eq!(session.handle_line("   "), None);
    }

    #[test]
    fn numeric_call_id_is_echoed_back() {
        let mut session = session();
        let reply = session
            .handle_line(
                r#"{"type":"tool.call","id":7,"name":"ralph_start","arguments":{"prompt":"fix"}}"#,
            )
            .expect("reply");
        assert_eq!(reply.id, Some(json!(7)));
        assert!(reply.output.contains("Ralph Loop STARTED."));
        assert!(session.controller().state().active);

        let line = serde_json::to_string(&reply).expect("serialize");
        assert!(line.starts_with(r#"{"id":7,"#));
    }

    #[test]
    fn broken_tool_call_envelope_gets_error_reply() {
        let mut session = session();
        let reply = session
            .handle_line(r#"{"type":"tool.call","id":"c1","arguments":{}}"#)
            .expect("reply");
        assert_eq!(reply.id, Some(json!("c1")));
        assert_eq!(reply.name, "");
        assert!(reply.output.starts_with("Error: "), "{}", reply.output);

        let reply = session
            .handle_line(r#"{"type":"tool.call","name":7}"#)
            .expect("reply");
        assert_eq!(reply.id, None);
        assert!(reply.output.starts_with("Error: "));
        assert!(!session.controller().state().active);
        assert_eq!(session.controller().store().save_count(), 0);
    }

    #[test]
    fn message_with_odd_content_is_tracked_as_empty() {
        let mut session = session();
        session.handle_line(r#"{"type":"chat.message","role":"assistant","content":"RALPH_DONE"}"#);
        session.handle_line(r#"{"type":"chat.message","role":"assistant","content":42}"#);
        assert_eq!(session.controller().tracked_output(), "");
    }

    #[test]
    fn run_answers_tool_calls_and_drives_loop() {
        let mut session = session();
        let input = [
            r#"{"type":"tool.call","id":"c1","name":"ralph_start","arguments":{"prompt":"fix","completion_promise":"DONE","max_iterations":3}}"#,
            r#"{"type":"chat.message","role":"assistant","content":[{"type":"text","text":"working"}]}"#,
            r#"{"type":"session.idle"}"#,
            r#"{"type":"chat.message","role":"assistant","content":"DONE"}"#,
            r#"{"type":"session.idle"}"#,
            r#"{"type":"tool.call","id":"c2","name":"ralph_cancel","arguments":{}}"#,
        ]
        .join("\n");

        let mut out = Vec::new();
        session.run(input.as_bytes(), &mut out).expect("run");

        let replies: Vec<ToolReply> = String::from_utf8(out)
            .expect("utf8")
            .lines()
            .map(|line| serde_json::from_str(line).expect("reply"))
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].id, Some(json!("c1")));
        assert!(replies[0].output.contains("Ralph Loop STARTED."));
        assert_eq!(replies[1].output, "No active Ralph Loop to cancel.");

        let state = session.controller().state();
        assert!(!state.active);
        assert_eq!(state.iteration_count, 1);
        assert_eq!(session.controller().launcher().requests().len(), 1);
    }

    #[test]
    fn idle_without_loop_does_nothing() {
        let mut session = session();
        assert_eq!(session.handle_event(HostEvent::SessionIdle), None);
        assert_eq!(session.controller().state(), Default::default());
        assert_eq!(session.controller().store().save_count(), 0);
        assert!(session.controller().launcher().requests().is_empty());
    }
}
