//! Launch-and-forget process spawning for the next agent iteration.
//!
//! The [`Launcher`] trait decouples the loop controller from how the agent is
//! started. [`DetachedLauncher`] spawns the agent as an independent process and
//! returns immediately; tests use a recording launcher instead.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, info, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::config::AgentConfig;

/// Parameters for launching one agent iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Working directory for the agent process (the project root).
    pub workdir: PathBuf,
    /// Program and leading arguments.
    pub command: Vec<String>,
    /// Instruction appended as the final argument.
    pub instruction: String,
}

impl LaunchRequest {
    pub fn from_config(workdir: &Path, agent: &AgentConfig, instruction: &str) -> Self {
        Self {
            workdir: workdir.to_path_buf(),
            command: agent.command.clone(),
            instruction: instruction.to_string(),
        }
    }

    /// Full argument vector, program first.
    pub fn argv(&self) -> Vec<&str> {
        self.command
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.instruction.as_str()))
            .collect()
    }
}

/// Starts the next agent iteration without waiting for it.
pub trait Launcher {
    /// Launch the agent. Returning `Ok` means the process was spawned, nothing more.
    fn launch(&self, request: &LaunchRequest) -> Result<()>;
}

/// Spawns the agent detached from the caller: null stdio, own process group,
/// no handle retained.
#[derive(Debug, Clone)]
pub struct DetachedLauncher {
    hang_warning: Duration,
}

impl DetachedLauncher {
    pub fn new(hang_warning: Duration) -> Self {
        Self { hang_warning }
    }

    pub fn from_config(agent: &AgentConfig) -> Self {
        Self::new(Duration::from_secs(agent.hang_warning_secs))
    }
}

impl Launcher for DetachedLauncher {
    #[instrument(skip_all, fields(workdir = %request.workdir.display()))]
    fn launch(&self, request: &LaunchRequest) -> Result<()> {
        let (program, args) = request
            .command
            .split_first()
            .ok_or_else(|| anyhow!("agent command is empty"))?;
        info!(command = %request.argv().join(" "), "spawning agent");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(&request.instruction)
            .current_dir(&request.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut cmd);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!(err = %e, program = %program, "failed to spawn agent");
                return Err(e).with_context(|| format!("spawn {program}"));
            }
        };

        debug!(pid = child.id(), "agent spawned");
        reap_in_background(child, self.hang_warning);
        Ok(())
    }
}

/// Put the child in its own process group so terminal signals aimed at the
/// caller do not reach it.
#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn detach(_cmd: &mut Command) {}

/// Reap the child on a background thread so it never lingers as a zombie.
///
/// The thread only observes: it logs the exit status, and logs once if the
/// agent outlives `hang_warning`. It never kills the child.
fn reap_in_background(mut child: Child, hang_warning: Duration) {
    let pid = child.id();
    let spawned = thread::Builder::new()
        .name(format!("ralph-reap-{pid}"))
        .spawn(move || {
            match child.wait_timeout(hang_warning) {
                Ok(Some(status)) => {
                    debug!(pid, exit_code = ?status.code(), "agent exited");
                    return;
                }
                Ok(None) => warn!(
                    pid,
                    hang_warning_secs = hang_warning.as_secs(),
                    "agent still running"
                ),
                Err(e) => {
                    warn!(pid, err = %e, "wait for agent failed");
                    return;
                }
            }
            match child.wait() {
                Ok(status) => debug!(pid, exit_code = ?status.code(), "agent exited"),
                Err(e) => warn!(pid, err = %e, "wait for agent failed"),
            }
        });
    if let Err(e) = spawned {
        warn!(pid, err = %e, "failed to start reaper thread");
    }
}
