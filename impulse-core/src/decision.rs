//! Decision aggregator: start detection, condition battery and policy into
//! one [`Verdict`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info};

use crate::conditions::{
    Battery, Check, ConditionId, ConditionResult, Diagnostic, EvalContext, Outcome,
};
use crate::config::{EvaluatorConfig, Policy};
use crate::domain::{Column, Direction, MarketSnapshot, Timeframe};
use crate::start::{
    resolve_direction, DetectorState, StartDetector, StartOutcome, FAST_EMA, MEDIUM_EMA, SLOW_EMA,
};

/// Timeframe tier the accepted impulse was confirmed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpulseTimeframe {
    #[serde(rename = "30m")]
    Thirty,
    #[serde(rename = "1h/2h")]
    Transfer,
}

impl ImpulseTimeframe {
    pub fn label(self) -> &'static str {
        match self {
            ImpulseTimeframe::Thirty => "30m",
            ImpulseTimeframe::Transfer => "1h/2h",
        }
    }
}

impl fmt::Display for ImpulseTimeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which stage decided the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryCode {
    WaitForData,
    NoStart,
    FailedMandatory,
    Ok30mBranch,
    Ok1h2hBranch,
    Failed11After10,
    FailedHigherTfChecks,
    StrictOk,
    StrictFailed,
}

impl SummaryCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryCode::WaitForData => "wait_for_data",
            SummaryCode::NoStart => "no_start",
            SummaryCode::FailedMandatory => "failed_mandatory",
            SummaryCode::Ok30mBranch => "ok_30m_branch",
            SummaryCode::Ok1h2hBranch => "ok_1h2h_branch",
            SummaryCode::Failed11After10 => "failed_11_after_10",
            SummaryCode::FailedHigherTfChecks => "failed_higher_tf_checks",
            SummaryCode::StrictOk => "strict_ok",
            SummaryCode::StrictFailed => "strict_failed",
        }
    }
}

impl fmt::Display for SummaryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub ok: bool,
    pub direction: Option<Direction>,
    pub start_index: Option<usize>,
    pub start_time: Option<DateTime<Utc>>,
    pub impulse_timeframe: Option<ImpulseTimeframe>,
    pub summary: SummaryCode,
    pub by_condition: BTreeMap<ConditionId, ConditionResult>,
}

impl Verdict {
    fn rejected(summary: SummaryCode, by_condition: BTreeMap<ConditionId, ConditionResult>) -> Self {
        Self {
            ok: false,
            direction: None,
            start_index: None,
            start_time: None,
            impulse_timeframe: None,
            summary,
            by_condition,
        }
    }

    pub fn condition(&self, id: ConditionId) -> Option<&ConditionResult> {
        self.by_condition.get(&id)
    }

    /// `(id, reason)` for every condition that is not satisfied.
    pub fn failures(&self) -> Vec<(ConditionId, String)> {
        self.by_condition
            .values()
            .filter(|r| !r.satisfied() && !matches!(r.outcome, Outcome::Skipped { .. }))
            .map(|r| (r.id, r.reason().unwrap_or_default()))
            .collect()
    }
}

/// Runs start detection, the condition battery and the configured policy.
#[derive(Debug)]
pub struct Evaluator {
    config: EvaluatorConfig,
    detector: StartDetector,
    battery: Battery,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self {
            detector: StartDetector::new(config.start.clone()),
            battery: Battery::standard(),
            config,
        }
    }

    /// Replace the battery, e.g. to re-parameterize a condition.
    pub fn with_battery(mut self, battery: Battery) -> Self {
        self.battery = battery;
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    /// Columns the enabled conditions read, plus the start detector's EMAs.
    pub fn required_columns(&self) -> BTreeSet<(Timeframe, Column)> {
        let mut cols: BTreeSet<_> = [FAST_EMA, MEDIUM_EMA, SLOW_EMA]
            .into_iter()
            .map(|c| (Timeframe::BASE, c))
            .collect();
        for id in self.battery.ids().filter(|id| self.config.is_enabled(*id)) {
            if let Some(condition) = self.battery.get(id) {
                cols.extend(condition.required_columns());
            }
        }
        cols
    }

    /// Evaluate one snapshot. `state` is advanced only when start detection
    /// could run; data problems leave it untouched.
    pub fn evaluate(&self, snapshot: &MarketSnapshot, state: &mut DetectorState) -> Verdict {
        let verdict = self.decide(snapshot, state);
        info!(
            ok = verdict.ok,
            summary = %verdict.summary,
            direction = ?verdict.direction,
            start_index = ?verdict.start_index,
            impulse_timeframe = ?verdict.impulse_timeframe,
            "verdict"
        );
        verdict
    }

    fn decide(&self, snapshot: &MarketSnapshot, state: &mut DetectorState) -> Verdict {
        if let Err(e) = snapshot.validate(&self.required_columns()) {
            return wait_for_data(e.to_string());
        }
        let Some(base) = snapshot.get(Timeframe::BASE) else {
            return wait_for_data(format!("timeframe {} missing", Timeframe::BASE));
        };

        let mut next = *state;
        let long = self.detector.detect(base, Direction::Long, &mut next);
        let short = self.detector.detect(base, Direction::Short, &mut next);
        let (long, short) = match (long, short) {
            (Ok(l), Ok(s)) => (l, s),
            (Err(e), _) | (_, Err(e)) => return wait_for_data(e.to_string()),
        };
        *state = next;

        let mut by_condition = BTreeMap::new();
        let Some((direction, start_index)) = resolve_direction(&long, &short) else {
            let reason = format!("long: {}; short: {}", long.describe(), short.describe());
            by_condition.insert(
                ConditionId::Start,
                ConditionResult::from_check(
                    ConditionId::Start,
                    Check::fail(Diagnostic::new(), reason),
                ),
            );
            return Verdict::rejected(SummaryCode::NoStart, by_condition);
        };
        let winner = match direction {
            Direction::Long => &long,
            Direction::Short => &short,
        };
        by_condition.insert(ConditionId::Start, start_result(winner, start_index));

        let current_index = base.latest_closed().unwrap_or(start_index);
        let ctx = EvalContext::new(snapshot, direction, start_index, current_index);
        let (summary, impulse_timeframe) = match self.config.policy {
            Policy::Branching => self.branching(&ctx, &mut by_condition),
            Policy::Strict => self.strict(&ctx, &mut by_condition),
        };

        Verdict {
            ok: impulse_timeframe.is_some(),
            direction: Some(direction),
            start_index: Some(start_index),
            start_time: base.timestamp(start_index),
            impulse_timeframe,
            summary,
            by_condition,
        }
    }

    fn run(&self, id: ConditionId, ctx: &EvalContext<'_>) -> ConditionResult {
        if self.config.is_enabled(id) {
            self.battery.evaluate(id, ctx)
        } else {
            ConditionResult::disabled(id)
        }
    }

    fn record(
        &self,
        id: ConditionId,
        ctx: &EvalContext<'_>,
        by_condition: &mut BTreeMap<ConditionId, ConditionResult>,
    ) -> bool {
        let result = self.run(id, ctx);
        let satisfied = result.satisfied();
        by_condition.insert(id, result);
        satisfied
    }

    fn branching(
        &self,
        ctx: &EvalContext<'_>,
        by_condition: &mut BTreeMap<ConditionId, ConditionResult>,
    ) -> (SummaryCode, Option<ImpulseTimeframe>) {
        let mut mandatory_ok = true;
        for id in ConditionId::MANDATORY {
            mandatory_ok &= self.record(id, ctx, by_condition);
        }
        let later = [
            ConditionId::ImpulseCross,
            ConditionId::ImpulseSync,
            ConditionId::TimeframeTransfer,
            ConditionId::RelaxedConfirmation,
        ];
        if !mandatory_ok {
            for id in later {
                by_condition.insert(id, ConditionResult::skipped(id, "mandatory conditions failed"));
            }
            return (SummaryCode::FailedMandatory, None);
        }

        let c8 = self.record(ConditionId::ImpulseCross, ctx, by_condition);
        let c9 = self.record(ConditionId::ImpulseSync, ctx, by_condition);
        if c8 && c9 {
            for id in [ConditionId::TimeframeTransfer, ConditionId::RelaxedConfirmation] {
                by_condition.insert(id, ConditionResult::skipped(id, "30m branch accepted"));
            }
            return (SummaryCode::Ok30mBranch, Some(ImpulseTimeframe::Thirty));
        }

        if !self.record(ConditionId::TimeframeTransfer, ctx, by_condition) {
            let id = ConditionId::RelaxedConfirmation;
            by_condition.insert(id, ConditionResult::skipped(id, "timeframe transfer failed"));
            return (SummaryCode::FailedHigherTfChecks, None);
        }
        if self.record(ConditionId::RelaxedConfirmation, ctx, by_condition) {
            (SummaryCode::Ok1h2hBranch, Some(ImpulseTimeframe::Transfer))
        } else {
            (SummaryCode::Failed11After10, None)
        }
    }

    fn strict(
        &self,
        ctx: &EvalContext<'_>,
        by_condition: &mut BTreeMap<ConditionId, ConditionResult>,
    ) -> (SummaryCode, Option<ImpulseTimeframe>) {
        let mut all_ok = true;
        for id in ConditionId::ALL.into_iter().skip(1) {
            all_ok &= self.record(id, ctx, by_condition);
        }
        if !all_ok {
            return (SummaryCode::StrictFailed, None);
        }
        let transfer = by_condition
            .get(&ConditionId::TimeframeTransfer)
            .is_some_and(|r| r.passed());
        let tf = if transfer {
            ImpulseTimeframe::Transfer
        } else {
            ImpulseTimeframe::Thirty
        };
        (SummaryCode::StrictOk, Some(tf))
    }
}

fn wait_for_data(detail: String) -> Verdict {
    debug!(%detail, "waiting for data");
    let mut by_condition = BTreeMap::new();
    by_condition.insert(
        ConditionId::Start,
        ConditionResult {
            id: ConditionId::Start,
            outcome: Outcome::Errored {
                kind: "insufficient_data".to_string(),
                detail,
            },
        },
    );
    Verdict::rejected(SummaryCode::WaitForData, by_condition)
}

fn start_result(outcome: &StartOutcome, start_index: usize) -> ConditionResult {
    let mut diagnostic = Diagnostic::new().value("start_index", start_index as f64);
    if let StartOutcome::Confirmed { trigger_index, .. } = outcome {
        diagnostic.record("trigger_index", *trigger_index as f64);
    }
    ConditionResult {
        id: ConditionId::Start,
        outcome: Outcome::Passed { diagnostic },
    }
}
