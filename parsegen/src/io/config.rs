//! Agent configuration stored at `parsegen.toml` in the project root.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Synthesis configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable.
/// Missing fields default to sensible values; a missing file is equivalent to
/// an empty one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Model name sent to the completion endpoint.
    pub model: String,

    /// OpenAI-compatible API base, without the `/chat/completions` suffix.
    pub api_base: String,

    /// Maximum generate/validate cycles before giving up.
    pub max_attempts: u32,

    /// Regenerations allowed per candidate when the syntax gate rejects it.
    /// These do not consume attempts.
    pub max_syntax_rejects: u32,

    /// Wall-clock budget for one completion request, in seconds.
    pub completion_timeout_secs: u64,

    /// Wall-clock budget for one candidate execution, in seconds.
    pub exec_timeout_secs: u64,

    /// Truncate captured subprocess output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Interpreter command used to run candidates.
    pub python: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            max_attempts: 3,
            max_syntax_rejects: 2,
            completion_timeout_secs: 120,
            exec_timeout_secs: 60,
            output_limit_bytes: 100_000,
            python: "python3".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.api_base.trim().is_empty() {
            return Err(anyhow!("api_base must be non-empty"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be > 0"));
        }
        if self.completion_timeout_secs == 0 {
            return Err(anyhow!("completion_timeout_secs must be > 0"));
        }
        if self.exec_timeout_secs == 0 {
            return Err(anyhow!("exec_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.python.trim().is_empty() {
            return Err(anyhow!("python must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, &buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("parsegen.toml");
        let cfg = AgentConfig {
            max_attempts: 5,
            ..AgentConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn validate_rejects_zero_budgets() {
        let cfg = AgentConfig {
            max_attempts: 0,
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = AgentConfig {
            exec_timeout_secs: 0,
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("parsegen.toml");
        fs::write(&path, "model = \"gpt-4o\"\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.model, "gpt-4o");
        assert_eq!(cfg.max_attempts, AgentConfig::default().max_attempts);
    }
}
