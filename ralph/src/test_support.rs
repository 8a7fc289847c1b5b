//! Test-only doubles for the state store and the launcher.

use std::cell::{Cell, RefCell};
use std::path::Path;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::controller::LoopController;
use crate::core::state::LoopState;
use crate::io::config::{AgentConfig, RalphConfig, write_config};
use crate::io::launcher::{LaunchRequest, Launcher};
use crate::io::paths::ProjectPaths;
use crate::io::state_store::{FileStateStore, StateStore};

/// Armed state with an explicit counter (useful for evaluator and controller tests).
pub fn armed_state(
    instruction: &str,
    signal: Option<&str>,
    iterations: u32,
    max_iterations: u32,
) -> LoopState {
    LoopState {
        iteration_count: iterations,
        ..LoopState::started(instruction, signal.map(str::to_string), max_iterations, None)
    }
}

/// In-memory store that counts writes and can be told to fail them.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RefCell<Option<LoopState>>,
    saves: Cell<usize>,
    fail: Cell<bool>,
}

impl MemoryStateStore {
    pub fn new(state: Option<LoopState>) -> Self {
        Self {
            state: RefCell::new(state),
            ..Self::default()
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.set(fail);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> LoopState {
        self.state.borrow().clone().unwrap_or_default()
    }

    fn save(&self, state: &LoopState) -> Result<()> {
        if self.fail.get() {
            return Err(anyhow!("scripted save failure"));
        }
        *self.state.borrow_mut() = Some(state.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

/// Launcher that records requests instead of spawning processes.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    requests: RefCell<Vec<LaunchRequest>>,
    fail: Cell<bool>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_launches(&self, fail: bool) {
        self.fail.set(fail);
    }

    /// Successful launches, in order.
    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests.borrow().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<()> {
        if self.fail.get() {
            return Err(anyhow!("scripted launch failure"));
        }
        self.requests.borrow_mut().push(request.clone());
        Ok(())
    }
}

/// Temporary project directory with a file-backed store.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> ProjectPaths {
        ProjectPaths::new(self.root())
    }

    pub fn store(&self) -> FileStateStore {
        FileStateStore::for_project(self.root())
    }

    /// Write `.opencode/ralph.toml` pointing the agent at `command`.
    pub fn write_agent_command(&self, command: &[&str]) -> Result<()> {
        let cfg = RalphConfig {
            agent: AgentConfig {
                command: command.iter().map(|s| s.to_string()).collect(),
                ..AgentConfig::default()
            },
            ..RalphConfig::default()
        };
        write_config(&self.paths().config_path, &cfg)
    }

    /// Controller over this project's state file with a recording launcher.
    pub fn controller(&self) -> LoopController<FileStateStore, RecordingLauncher> {
        LoopController::new(
            self.root(),
            self.store(),
            RecordingLauncher::new(),
            RalphConfig::default(),
        )
    }
}
