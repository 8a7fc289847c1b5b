//! Canonical locations under a project's `.opencode/` directory.

use std::path::PathBuf;

/// All paths owned by the loop for a project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub state_path: PathBuf,
    pub config_path: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let config_dir = root.join(".opencode");
        Self {
            root: root.clone(),
            config_dir: config_dir.clone(),
            state_path: config_dir.join("ralph-state.json"),
            config_path: config_dir.join("ralph.toml"),
        }
    }
}
