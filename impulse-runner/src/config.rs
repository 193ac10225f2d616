//! Runner configuration, loaded from TOML.
//!
//! ```toml
//! data_dir = "data"
//! state_path = "state/impulse.json"
//! swing_lookback = 20
//! atr_multiplier = 1.0
//!
//! [evaluator]
//! policy = "branching"
//! enabled = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]
//!
//! [evaluator.start]
//! timeout_bars = 5
//! trigger_lookback = 8
//! ```

use anyhow::{bail, Context, Result};
use impulse_core::EvaluatorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory holding one `<timeframe>.csv` per timeframe.
    pub data_dir: PathBuf,

    /// JSON file with the detector state and the last emitted signal.
    pub state_path: PathBuf,

    pub evaluator: EvaluatorConfig,

    /// Base candles scanned for swing support/resistance.
    pub swing_lookback: usize,

    /// ATR14 multiple for the ATR price levels.
    pub atr_multiplier: f64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            state_path: PathBuf::from("state/impulse.json"),
            evaluator: EvaluatorConfig::default(),
            swing_lookback: 20,
            atr_multiplier: 1.0,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse runner config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; relative data and state paths resolve against the
    /// config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read runner config {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid runner config {}", path.display()))?;
        Ok(match path.parent() {
            Some(root) => config.relative_to(root),
            None => config,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.evaluator.validate()?;
        if self.swing_lookback == 0 {
            bail!("swing_lookback must be >= 1");
        }
        if !(self.atr_multiplier.is_finite() && self.atr_multiplier > 0.0) {
            bail!("atr_multiplier must be a positive number, got {}", self.atr_multiplier);
        }
        Ok(())
    }

    fn relative_to(mut self, root: &Path) -> Self {
        if self.data_dir.is_relative() {
            self.data_dir = root.join(&self.data_dir);
        }
        if self.state_path.is_relative() {
            self.state_path = root.join(&self.state_path);
        }
        self
    }
}
