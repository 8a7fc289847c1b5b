//! Durable loop state, one record per project.
//!
//! Reads never fail: a missing or unreadable record degrades to
//! [`LoopState::default`]. Writes replace the whole record atomically
//! (temp file + rename), so a concurrent reader sees either the old record or
//! the new one.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::core::state::LoopState;
use crate::io::atomic::write_atomic;
use crate::io::paths::ProjectPaths;

/// Whole-record storage for a single project's loop.
pub trait StateStore {
    /// Last persisted state, or the default when none can be read.
    fn load(&self) -> LoopState;

    /// Persist `state`, replacing any previous record.
    fn save(&self, state: &LoopState) -> Result<()>;
}

/// JSON file store at `.opencode/ralph-state.json`.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_project(root: &Path) -> Self {
        Self::new(ProjectPaths::new(root).state_path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> LoopState {
        load_loop_state(&self.path)
    }

    fn save(&self, state: &LoopState) -> Result<()> {
        write_loop_state(&self.path, state)
    }
}

/// Read the state file. Returns `Ok(None)` when it does not exist.
pub fn try_load_loop_state(path: &Path) -> Result<Option<LoopState>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("read loop state {}", path.display()));
        }
    };
    let state: LoopState = serde_json::from_str(&contents)
        .with_context(|| format!("parse loop state {}", path.display()))?;
    Ok(Some(state))
}

/// Read the state file, substituting the default for a missing or corrupt record.
pub fn load_loop_state(path: &Path) -> LoopState {
    debug!(path = %path.display(), "loading loop state");
    match try_load_loop_state(path) {
        Ok(Some(state)) => {
            debug!(
                active = state.active,
                iterations = state.iteration_count,
                max_iterations = state.max_iterations,
                "loop state loaded"
            );
            state
        }
        Ok(None) => LoopState::default(),
        Err(err) => {
            warn!(err = %format!("{err:#}"), "unreadable loop state, using default");
            LoopState::default()
        }
    }
}

/// Atomically write loop state to disk, creating `.opencode/` on first use.
pub fn write_loop_state(path: &Path, state: &LoopState) -> Result<()> {
    debug!(
        path = %path.display(),
        active = state.active,
        iterations = state.iteration_count,
        "writing loop state"
    );
    let mut buf = serde_json::to_string_pretty(state).context("serialize loop state")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
