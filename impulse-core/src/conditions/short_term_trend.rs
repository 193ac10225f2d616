//! Condition 3: no base oscillator is moving against the signal.

use crate::domain::{Column, Timeframe};

use super::{
    columns, holds_trend, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext,
};

pub const TREND_FIELDS: [Column; 10] = [
    Column::MacdDif,
    Column::MacdDea,
    Column::Rsi6,
    Column::Rsi9,
    Column::Rsi21,
    Column::KdjJ,
    Column::KdjK,
    Column::KdjD,
    Column::SrsiK,
    Column::SrsiD,
];

/// Counter-move allowed over the two candles before the start.
pub const TREND_TOLERANCE: f64 = 5.0;
pub const TREND_SPAN: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
pub struct ShortTermTrend;

impl Condition for ShortTermTrend {
    fn id(&self) -> ConditionId {
        ConditionId::ShortTermTrend
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        columns(Timeframe::BASE, &TREND_FIELDS)
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        let base = ctx.base()?;
        let s = ctx.start_index;
        base.require_history(s, TREND_SPAN)?;

        let mut diag = Diagnostic::new();
        for field in TREND_FIELDS {
            let now = base.value(field, s)?;
            let before = base.value(field, s - TREND_SPAN)?;
            diag.record(format!("{field}_delta"), now - before);
            if !holds_trend(ctx.direction, now, before, TREND_TOLERANCE) {
                diag.flag(field.name());
            }
        }

        if diag.flagged.is_empty() {
            Ok(Check::pass(diag))
        } else {
            let reason = format!("counter-trend move on: {}", diag.flagged.join(", "));
            Ok(Check::fail(diag, reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, MarketSnapshot};
    use crate::testing::SeriesBuilder;

    fn flat(len: usize) -> SeriesBuilder {
        TREND_FIELDS
            .iter()
            .fold(SeriesBuilder::new(Timeframe::M5, len), |b, &c| b.fill(c, 50.0))
    }

    #[test]
    fn flat_fields_pass_both_directions() {
        let snap = MarketSnapshot::new().with(flat(5).build());
        for direction in Direction::BOTH {
            let ctx = EvalContext::new(&snap, direction, 4, 4);
            assert!(ShortTermTrend.evaluate(&ctx).unwrap().passed);
        }
    }

    #[test]
    fn drop_beyond_tolerance_flags_field() {
        let base = flat(5).set(Column::Rsi9, &[(4, 44.0)]).build();
        let snap = MarketSnapshot::new().with(base);

        let long = ShortTermTrend
            .evaluate(&EvalContext::new(&snap, Direction::Long, 4, 4))
            .unwrap();
        assert!(!long.passed);
        assert_eq!(long.diagnostic.flagged, vec!["rsi9".to_string()]);

        let short = ShortTermTrend
            .evaluate(&EvalContext::new(&snap, Direction::Short, 4, 4))
            .unwrap();
        assert!(short.passed);
    }

    #[test]
    fn drop_within_tolerance_passes() {
        let base = flat(5).set(Column::KdjJ, &[(4, 45.0)]).build();
        let snap = MarketSnapshot::new().with(base);
        let ctx = EvalContext::new(&snap, Direction::Long, 4, 4);
        assert!(ShortTermTrend.evaluate(&ctx).unwrap().passed);
    }

    #[test]
    fn start_too_early_is_an_error() {
        let snap = MarketSnapshot::new().with(flat(5).build());
        let ctx = EvalContext::new(&snap, Direction::Long, 1, 4);
        assert!(matches!(
            ShortTermTrend.evaluate(&ctx),
            Err(ConditionError::InsufficientHistory { .. })
        ));
    }
}
