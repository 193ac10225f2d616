//! Condition battery: numbered predicates over the market snapshot.
//!
//! Condition 1 is the stateful start detector (see [`crate::start`]); it has
//! an id here so verdicts and configuration can refer to it, but no
//! [`Condition`] implementation. Conditions 2 to 11 are pure: they read the
//! snapshot at indices derived from the start candle and return a [`Check`],
//! or a [`ConditionError`] when the data they need is missing or unusable.
//! [`run`] folds both into a [`ConditionResult`] so a broken condition never
//! takes its siblings down with it.

pub mod impulse_cross;
pub mod impulse_sync;
pub mod macd_freshness;
pub mod mid_confirmation;
pub mod oscillator_spacing;
pub mod relaxed;
pub mod rsi_headroom;
pub mod short_term_trend;
pub mod transfer;

pub use impulse_cross::ImpulseCross;
pub use impulse_sync::ImpulseSync;
pub use macd_freshness::MacdFreshness;
pub use mid_confirmation::MidConfirmation;
pub use oscillator_spacing::OscillatorSpacing;
pub use relaxed::RelaxedConfirmation;
pub use rsi_headroom::RsiHeadroom;
pub use short_term_trend::ShortTermTrend;
pub use transfer::TimeframeTransfer;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

use crate::align;
use crate::domain::{Candle, CandleSeries, Column, Direction, MarketSnapshot, Timeframe};

/// Condition number, 1 through 11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ConditionId {
    Start,
    MacdFreshness,
    ShortTermTrend,
    OscillatorSpacing,
    RsiHeadroom,
    MidConfirmation,
    MidRsiHeadroom,
    ImpulseCross,
    ImpulseSync,
    TimeframeTransfer,
    RelaxedConfirmation,
}

impl ConditionId {
    pub const ALL: [ConditionId; 11] = [
        ConditionId::Start,
        ConditionId::MacdFreshness,
        ConditionId::ShortTermTrend,
        ConditionId::OscillatorSpacing,
        ConditionId::RsiHeadroom,
        ConditionId::MidConfirmation,
        ConditionId::MidRsiHeadroom,
        ConditionId::ImpulseCross,
        ConditionId::ImpulseSync,
        ConditionId::TimeframeTransfer,
        ConditionId::RelaxedConfirmation,
    ];

    /// Conditions 2 to 7, required by the branching policy.
    pub const MANDATORY: [ConditionId; 6] = [
        ConditionId::MacdFreshness,
        ConditionId::ShortTermTrend,
        ConditionId::OscillatorSpacing,
        ConditionId::RsiHeadroom,
        ConditionId::MidConfirmation,
        ConditionId::MidRsiHeadroom,
    ];

    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            ConditionId::Start => "start detection",
            ConditionId::MacdFreshness => "MACD freshness",
            ConditionId::ShortTermTrend => "short-term trend",
            ConditionId::OscillatorSpacing => "oscillator spacing",
            ConditionId::RsiHeadroom => "RSI headroom",
            ConditionId::MidConfirmation => "15m confirmation",
            ConditionId::MidRsiHeadroom => "15m RSI headroom",
            ConditionId::ImpulseCross => "30m impulse cross",
            ConditionId::ImpulseSync => "1h impulse sync",
            ConditionId::TimeframeTransfer => "timeframe transfer 1h/2h",
            ConditionId::RelaxedConfirmation => "30m relaxed confirmation",
        }
    }
}

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl From<ConditionId> for u8 {
    fn from(id: ConditionId) -> u8 {
        id.number()
    }
}

impl TryFrom<u8> for ConditionId {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::from_number(n).ok_or_else(|| format!("unknown condition number {n} (expected 1..=11)"))
    }
}

/// Structured explanation attached to every check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Why the check failed. Always set on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Named inputs and intermediate values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, f64>,
    /// Fields that violated their rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged: Vec<String>,
}

impl Diagnostic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, name: impl Into<String>, v: f64) -> Self {
        self.values.insert(name.into(), v);
        self
    }

    pub fn record(&mut self, name: impl Into<String>, v: f64) {
        self.values.insert(name.into(), v);
    }

    pub fn flag(&mut self, name: impl Into<String>) {
        self.flagged.push(name.into());
    }
}

/// Outcome of one predicate over valid data.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    pub passed: bool,
    pub diagnostic: Diagnostic,
}

impl Check {
    pub fn pass(diagnostic: Diagnostic) -> Self {
        Self {
            passed: true,
            diagnostic,
        }
    }

    pub fn fail(mut diagnostic: Diagnostic, reason: impl Into<String>) -> Self {
        diagnostic.reason = Some(reason.into());
        Self {
            passed: false,
            diagnostic,
        }
    }

    /// Pass when `failures` is empty; otherwise fail with them joined.
    pub fn from_failures(diagnostic: Diagnostic, failures: Vec<String>) -> Self {
        if failures.is_empty() {
            Self::pass(diagnostic)
        } else {
            Self::fail(diagnostic, failures.join("; "))
        }
    }
}

/// Data problems inside a single condition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("timeframe {0} missing from snapshot")]
    MissingTimeframe(Timeframe),

    #[error("{timeframe}: column {column} missing")]
    MissingColumn { timeframe: Timeframe, column: Column },

    #[error("{timeframe}: index {index} out of range (len {len})")]
    IndexOutOfRange {
        timeframe: Timeframe,
        index: usize,
        len: usize,
    },

    #[error("{timeframe}: {column} at {index} is not finite")]
    NonFinite {
        timeframe: Timeframe,
        column: Column,
        index: usize,
    },

    #[error("{timeframe}: index {index} has too little history (need {needed} prior candles)")]
    InsufficientHistory {
        timeframe: Timeframe,
        index: usize,
        needed: usize,
    },
}

impl ConditionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConditionError::MissingTimeframe(_) => "missing_timeframe",
            ConditionError::MissingColumn { .. } => "missing_column",
            ConditionError::IndexOutOfRange { .. } => "index_out_of_range",
            ConditionError::NonFinite { .. } => "non_finite",
            ConditionError::InsufficientHistory { .. } => "insufficient_history",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed { diagnostic: Diagnostic },
    Failed { diagnostic: Diagnostic },
    Errored { kind: String, detail: String },
    Skipped { note: String },
    Disabled,
}

/// Per-condition entry of a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionResult {
    pub id: ConditionId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ConditionResult {
    pub fn from_check(id: ConditionId, check: Check) -> Self {
        let outcome = if check.passed {
            Outcome::Passed {
                diagnostic: check.diagnostic,
            }
        } else {
            Outcome::Failed {
                diagnostic: check.diagnostic,
            }
        };
        Self { id, outcome }
    }

    pub fn errored(id: ConditionId, error: &ConditionError) -> Self {
        Self {
            id,
            outcome: Outcome::Errored {
                kind: error.kind().to_string(),
                detail: error.to_string(),
            },
        }
    }

    pub fn skipped(id: ConditionId, note: impl Into<String>) -> Self {
        Self {
            id,
            outcome: Outcome::Skipped { note: note.into() },
        }
    }

    pub fn disabled(id: ConditionId) -> Self {
        Self {
            id,
            outcome: Outcome::Disabled,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed { .. })
    }

    /// Passed, or switched off by configuration.
    pub fn satisfied(&self) -> bool {
        matches!(self.outcome, Outcome::Passed { .. } | Outcome::Disabled)
    }

    pub fn reason(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Passed { .. } => None,
            Outcome::Failed { diagnostic } => diagnostic.reason.clone(),
            Outcome::Errored { kind, detail } => Some(format!("error ({kind}): {detail}")),
            Outcome::Skipped { note } => Some(note.clone()),
            Outcome::Disabled => Some("disabled by configuration".to_string()),
        }
    }
}

/// Checked read access to one timeframe series.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    series: &'a CandleSeries,
}

impl<'a> Frame<'a> {
    pub fn new(series: &'a CandleSeries) -> Self {
        Self { series }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.series.timeframe()
    }

    pub fn series(&self) -> &'a CandleSeries {
        self.series
    }

    fn column(&self, column: Column) -> Result<&'a [f64], ConditionError> {
        self.series
            .column(column)
            .ok_or(ConditionError::MissingColumn {
                timeframe: self.timeframe(),
                column,
            })
    }

    fn check_index(&self, index: usize) -> Result<(), ConditionError> {
        if index < self.series.len() {
            Ok(())
        } else {
            Err(ConditionError::IndexOutOfRange {
                timeframe: self.timeframe(),
                index,
                len: self.series.len(),
            })
        }
    }

    /// Finite value of `column` at `index`.
    pub fn value(&self, column: Column, index: usize) -> Result<f64, ConditionError> {
        self.check_index(index)?;
        let v = self.column(column)?[index];
        if v.is_finite() {
            Ok(v)
        } else {
            Err(ConditionError::NonFinite {
                timeframe: self.timeframe(),
                column,
                index,
            })
        }
    }

    /// `column` from the oldest candle through `index` inclusive.
    pub fn upto(&self, column: Column, index: usize) -> Result<&'a [f64], ConditionError> {
        self.check_index(index)?;
        Ok(&self.column(column)?[..=index])
    }

    pub fn candle(&self, index: usize) -> Result<&'a Candle, ConditionError> {
        self.check_index(index)?;
        Ok(&self.series.candles()[index])
    }

    /// Require `needed` candles before `index`.
    pub fn require_history(&self, index: usize, needed: usize) -> Result<(), ConditionError> {
        self.check_index(index)?;
        if index < needed {
            return Err(ConditionError::InsufficientHistory {
                timeframe: self.timeframe(),
                index,
                needed,
            });
        }
        Ok(())
    }
}

/// Inputs shared by every condition in one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub snapshot: &'a MarketSnapshot,
    pub direction: Direction,
    /// Start candle, absolute index into the base series.
    pub start_index: usize,
    /// Newest closed base candle.
    pub current_index: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        snapshot: &'a MarketSnapshot,
        direction: Direction,
        start_index: usize,
        current_index: usize,
    ) -> Self {
        Self {
            snapshot,
            direction,
            start_index,
            current_index,
        }
    }

    pub fn frame(&self, timeframe: Timeframe) -> Result<Frame<'a>, ConditionError> {
        self.snapshot
            .get(timeframe)
            .map(Frame::new)
            .ok_or(ConditionError::MissingTimeframe(timeframe))
    }

    pub fn base(&self) -> Result<Frame<'a>, ConditionError> {
        self.frame(Timeframe::BASE)
    }

    /// `timeframe` frame and the index of the candle aligned to base candle
    /// `base_index`.
    pub fn project(
        &self,
        timeframe: Timeframe,
        base_index: usize,
    ) -> Result<(Frame<'a>, usize), ConditionError> {
        let base = self.base()?;
        let target = self.frame(timeframe)?;
        let index = align::project(base.series(), base_index, target.series()).ok_or(
            ConditionError::IndexOutOfRange {
                timeframe,
                index: base_index,
                len: target.series().len(),
            },
        )?;
        Ok((target, index))
    }
}

/// One numbered predicate.
pub trait Condition: Send + Sync {
    fn id(&self) -> ConditionId;

    /// `(timeframe, column)` pairs read by `evaluate`.
    fn required_columns(&self) -> Vec<(Timeframe, Column)>;

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError>;
}

/// Evaluate `condition`, turning a data error into an errored result.
pub fn run(condition: &dyn Condition, ctx: &EvalContext<'_>) -> ConditionResult {
    match condition.evaluate(ctx) {
        Ok(check) => ConditionResult::from_check(condition.id(), check),
        Err(e) => ConditionResult::errored(condition.id(), &e),
    }
}

/// Long: `now - before >= -tolerance`. Short: `now - before <= tolerance`.
pub(crate) fn holds_trend(direction: Direction, now: f64, before: f64, tolerance: f64) -> bool {
    direction.lead(now, before) >= -tolerance
}

pub(crate) fn columns(timeframe: Timeframe, cols: &[Column]) -> Vec<(Timeframe, Column)> {
    cols.iter().map(|&c| (timeframe, c)).collect()
}

/// Conditions 2 to 11, one per id.
pub struct Battery {
    conditions: BTreeMap<ConditionId, Box<dyn Condition>>,
}

impl Battery {
    pub fn standard() -> Self {
        let mut battery = Self {
            conditions: BTreeMap::new(),
        };
        battery.insert(Box::new(MacdFreshness));
        battery.insert(Box::new(ShortTermTrend));
        battery.insert(Box::new(OscillatorSpacing));
        battery.insert(Box::new(RsiHeadroom::at_start()));
        battery.insert(Box::new(MidConfirmation));
        battery.insert(Box::new(RsiHeadroom::mid_current()));
        battery.insert(Box::new(ImpulseCross::default()));
        battery.insert(Box::new(ImpulseSync::default()));
        battery.insert(Box::new(TimeframeTransfer::default()));
        battery.insert(Box::new(RelaxedConfirmation));
        battery
    }

    /// Replace the condition with the same id.
    pub fn with(mut self, condition: Box<dyn Condition>) -> Self {
        self.insert(condition);
        self
    }

    fn insert(&mut self, condition: Box<dyn Condition>) {
        self.conditions.insert(condition.id(), condition);
    }

    pub fn get(&self, id: ConditionId) -> Option<&dyn Condition> {
        self.conditions.get(&id).map(|c| c.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = ConditionId> + '_ {
        self.conditions.keys().copied()
    }

    pub fn evaluate(&self, id: ConditionId, ctx: &EvalContext<'_>) -> ConditionResult {
        match self.get(id) {
            Some(condition) => run(condition, ctx),
            None => ConditionResult::skipped(id, "no predicate registered"),
        }
    }

    /// Union of every condition's column requirements.
    pub fn required_columns(&self) -> BTreeSet<(Timeframe, Column)> {
        self.conditions
            .values()
            .flat_map(|c| c.required_columns())
            .collect()
    }
}

impl Default for Battery {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Battery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Battery")
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .finish()
    }
}
