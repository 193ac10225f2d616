//! Impulse Core: multi-timeframe impulse signal evaluation.
//!
//! This crate contains the signal pipeline:
//! - Domain types (candles, indicator columns, series, snapshots, directions)
//! - Cross detection with a touch band, and timeframe index alignment
//! - The stateful start detector (condition 1)
//! - The condition battery (conditions 2 to 11)
//! - The decision aggregator with strict and branching policies
//! - Signal identity, the emit-once ledger and the state store
//! - The evaluation cycle tying them together
//!
//! Market data retrieval, indicator computation and notification delivery
//! live outside this crate.

pub mod align;
pub mod conditions;
pub mod config;
pub mod cross;
pub mod cycle;
pub mod decision;
pub mod dedup;
pub mod domain;
pub mod start;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, EvaluatorConfig, Policy, StartConfig};
pub use cycle::{run_cycle, CycleError, CycleOutcome};
pub use decision::{Evaluator, ImpulseTimeframe, SummaryCode, Verdict};
pub use dedup::{SignalIdentity, SignalLedger};
pub use store::{JsonFileStore, MemoryStore, PersistedState, StateStore, StoreError};
