//! Impulse Runner: drives the evaluation cycle against files on disk.
//!
//! This crate builds on `impulse-core` to provide:
//! - TOML runner configuration
//! - CSV candle loading into a market snapshot
//! - A plain-text report with swing and ATR price levels
//! - The notifier seam with log and JSONL notifiers
//! - A single-shot monitor that runs one cycle per call

pub mod config;
pub mod data_loader;
pub mod monitor;
pub mod notify;
pub mod report;

pub use config::RunnerConfig;
pub use data_loader::{load_series, load_snapshot, LoadError};
pub use monitor::Monitor;
pub use notify::{JsonlNotifier, LogNotifier, Notification, Notifier};
pub use report::{render_report, PriceLevels, ReportOptions};
