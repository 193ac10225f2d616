//! Single-shot monitor: one cycle over the files on disk.
//!
//! Scheduling (cron, a timer loop) is left to the caller; each call to
//! [`Monitor::run_once`] reads the candle files, runs one evaluation cycle
//! against the state file and hands any new signal to the notifiers.

use anyhow::{Context, Result};
use impulse_core::{run_cycle, CycleError, CycleOutcome, Evaluator, JsonFileStore};
use tracing::{info, warn};

use crate::config::RunnerConfig;
use crate::data_loader::load_snapshot;
use crate::notify::{LogNotifier, Notification, Notifier};
use crate::report::{render_report, ReportOptions};

pub struct Monitor {
    config: RunnerConfig,
    evaluator: Evaluator,
    store: JsonFileStore,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl Monitor {
    /// Monitor logging signals through `tracing`.
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_notifiers(config, vec![Box::new(LogNotifier)])
    }

    pub fn with_notifiers(config: RunnerConfig, notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            evaluator: Evaluator::new(config.evaluator.clone()),
            store: JsonFileStore::new(&config.state_path),
            notifiers,
            config,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one cycle.
    ///
    /// A signal is delivered only after its state is saved; if saving fails
    /// the next cycle re-detects and re-emits it. A failing notifier is
    /// logged and does not stop the others.
    pub fn run_once(&mut self) -> Result<CycleOutcome> {
        let snapshot = load_snapshot(&self.config.data_dir).with_context(|| {
            format!("Failed to load candles from {}", self.config.data_dir.display())
        })?;

        let outcome = match run_cycle(&self.evaluator, &mut self.store, &snapshot) {
            Ok(outcome) => outcome,
            Err(CycleError::Persist { source, outcome }) => {
                warn!(
                    summary = %outcome.verdict.summary,
                    error = %source,
                    "verdict computed but state not saved"
                );
                return Err(source).with_context(|| {
                    format!("Failed to save state to {}", self.store.path().display())
                });
            }
        };

        let Some(identity) = outcome.emitted else {
            info!(summary = %outcome.verdict.summary, "no new signal");
            return Ok(outcome);
        };

        let options = ReportOptions {
            swing_lookback: self.config.swing_lookback,
            atr_multiplier: self.config.atr_multiplier,
        };
        let text = render_report(&outcome.verdict, &snapshot, &options);
        let notification = Notification::new(identity, outcome.verdict.clone(), text);
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(&notification) {
                warn!(notifier = notifier.name(), error = %format!("{e:#}"), "notification failed");
            }
        }
        Ok(outcome)
    }
}
