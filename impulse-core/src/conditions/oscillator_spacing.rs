//! Condition 4: KDJ lines fanned out in the signal direction, RSI6 not fading.

use crate::domain::{Column, Timeframe};

use super::{
    columns, holds_trend, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext,
};

/// Minimum directional `j - d` distance.
pub const KDJ_MIN_SPREAD: f64 = 6.0;
pub const RSI_SPAN: usize = 3;
pub const RSI_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct OscillatorSpacing;

impl Condition for OscillatorSpacing {
    fn id(&self) -> ConditionId {
        ConditionId::OscillatorSpacing
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        columns(
            Timeframe::BASE,
            &[Column::KdjJ, Column::KdjK, Column::KdjD, Column::Rsi6],
        )
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        let base = ctx.base()?;
        let s = ctx.start_index;
        let dir = ctx.direction;
        base.require_history(s, RSI_SPAN)?;

        let j = base.value(Column::KdjJ, s)?;
        let k = base.value(Column::KdjK, s)?;
        let d = base.value(Column::KdjD, s)?;
        let r6 = base.value(Column::Rsi6, s)?;
        let r6_before = base.value(Column::Rsi6, s - RSI_SPAN)?;

        let diag = Diagnostic::new()
            .value("j", j)
            .value("k", k)
            .value("d", d)
            .value("rsi6", r6)
            .value("rsi6_before", r6_before);

        let mut failures = Vec::new();
        if !dir.ordered(j, k, d) {
            failures.push(format!("KDJ not ordered for {dir}"));
        } else if dir.lead(j, d) < KDJ_MIN_SPREAD {
            failures.push(format!(
                "KDJ j/d spread {:.2} below {KDJ_MIN_SPREAD}",
                dir.lead(j, d)
            ));
        }
        if !holds_trend(dir, r6, r6_before, RSI_TOLERANCE) {
            failures.push(format!(
                "RSI6 moved {:.2} against {dir} over {RSI_SPAN} candles",
                r6 - r6_before
            ));
        }
        Ok(Check::from_failures(diag, failures))
    }
}
