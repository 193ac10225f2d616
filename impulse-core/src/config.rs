//! Evaluator configuration, loadable from TOML.
//!
//! Example:
//! ```toml
//! policy = "branching"
//! enabled = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]
//!
//! [start]
//! timeout_bars = 5
//! trigger_lookback = 8
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::conditions::ConditionId;

/// How condition outcomes combine into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Conditions 1 to 7 mandatory, then {8, 9} or {10, 11}.
    #[default]
    Branching,
    /// Every enabled condition must pass.
    Strict,
}

/// Start detector tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartConfig {
    /// Candles after the fast/slow trigger within which the medium/slow
    /// confirmation must close.
    pub timeout_bars: usize,
    /// How far back an idle detector searches for a fast/slow trigger.
    pub trigger_lookback: usize,
}

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            timeout_bars: 5,
            trigger_lookback: 8,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub policy: Policy,
    pub enabled: BTreeSet<ConditionId>,
    pub start: StartConfig,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            policy: Policy::default(),
            enabled: ConditionId::ALL.into_iter().collect(),
            start: StartConfig::default(),
        }
    }
}

impl EvaluatorConfig {
    pub fn strict() -> Self {
        Self {
            policy: Policy::Strict,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, id: ConditionId) -> bool {
        self.enabled.contains(&id)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_enabled(ConditionId::Start) {
            return Err(ConfigError::Invalid(
                "condition 1 (start detection) cannot be disabled".into(),
            ));
        }
        if self.start.timeout_bars == 0 {
            return Err(ConfigError::Invalid("start.timeout_bars must be >= 1".into()));
        }
        if self.start.trigger_lookback < self.start.timeout_bars {
            return Err(ConfigError::Invalid(format!(
                "start.trigger_lookback ({}) must be >= start.timeout_bars ({})",
                self.start.trigger_lookback, self.start.timeout_bars
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
