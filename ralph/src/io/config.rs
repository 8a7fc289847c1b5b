//! Loop configuration stored under `.opencode/ralph.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::state::DEFAULT_MAX_ITERATIONS;
use crate::io::atomic::write_atomic;

/// Loop configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to defaults, and
/// a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RalphConfig {
    /// Budget used when a start request omits `max_iterations` or passes a non-positive value.
    pub default_max_iterations: u32,

    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Program and leading arguments; the instruction is appended as the last argument.
    pub command: Vec<String>,

    /// Log a warning when a launched agent is still running after this many seconds.
    pub hang_warning_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "opencode".to_string(),
                "run".to_string(),
                "--prompt".to_string(),
            ],
            hang_warning_secs: 60 * 60,
        }
    }
}

impl Default for RalphConfig {
    fn default() -> Self {
        Self {
            default_max_iterations: DEFAULT_MAX_ITERATIONS,
            agent: AgentConfig::default(),
        }
    }
}

impl RalphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_max_iterations == 0 {
            return Err(anyhow!("default_max_iterations must be > 0"));
        }
        if self.agent.command.is_empty() || self.agent.command[0].trim().is_empty() {
            return Err(anyhow!("agent.command must be a non-empty array"));
        }
        if self.agent.hang_warning_secs == 0 {
            return Err(anyhow!("agent.hang_warning_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RalphConfig::default()`.
pub fn load_config(path: &Path) -> Result<RalphConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = RalphConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RalphConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RalphConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RalphConfig::default());
        assert_eq!(cfg.default_max_iterations, 10);
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".opencode").join("ralph.toml");
        let cfg = RalphConfig {
            default_max_iterations: 4,
            agent: AgentConfig {
                command: vec!["my-agent".to_string(), "--prompt".to_string()],
                hang_warning_secs: 30,
            },
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("ralph.toml");
        fs::write(&path, "[agent]\ncommand = [\"agent\"]\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.agent.command, vec!["agent".to_string()]);
        assert_eq!(cfg.agent.hang_warning_secs, 3600);
        assert_eq!(cfg.default_max_iterations, 10);
    }

    #[test]
    fn empty_command_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("ralph.toml");
        fs::write(&path, "[agent]\ncommand = []\n").expect("write");
        let err = load_config(&path).expect_err("should reject");
        assert!(format!("{err:#}").contains("agent.command"));
    }

    #[test]
    fn zero_default_budget_is_rejected() {
        let cfg = RalphConfig {
            default_max_iterations: 0,
            ..RalphConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
