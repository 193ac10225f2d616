//! Delivery of emitted signals.
//!
//! The pipeline only decides *whether* to notify; where the message goes is
//! behind the [`Notifier`] trait.

use anyhow::{Context, Result};
use impulse_core::{SignalIdentity, Verdict};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// One emitted signal, ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub identity: SignalIdentity,
    pub fingerprint: String,
    pub verdict: Verdict,
    /// Human-readable report.
    pub text: String,
}

impl Notification {
    pub fn new(identity: SignalIdentity, verdict: Verdict, text: String) -> Self {
        Self {
            fingerprint: identity.fingerprint(),
            identity,
            verdict,
            text,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes each signal to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            identity = %notification.identity,
            fingerprint = %notification.fingerprint,
            impulse_timeframe = ?notification.verdict.impulse_timeframe,
            "impulse signal\n{}",
            notification.text
        );
        Ok(())
    }
}

/// Appends each signal as one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlNotifier {
    path: PathBuf,
}

impl JsonlNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Notifier for JsonlNotifier {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn notify(&self, notification: &Notification) -> Result<()> {
        let json = serde_json::to_string(notification).context("Failed to serialize signal")?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create signal log directory {}", parent.display())
            })?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open signal log {}", self.path.display()))?;
        writeln!(file, "{json}")
            .with_context(|| format!("Failed to append to signal log {}", self.path.display()))?;
        Ok(())
    }
}
