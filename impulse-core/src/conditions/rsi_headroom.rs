//! Conditions 5 and 7: RSI is not already saturated in the signal direction.
//!
//! RSI6 may be past the saturation level only while it still leads RSI9 by a
//! clear margin; RSI21 must stay inside it. Condition 5 reads the base
//! timeframe at the start candle, condition 7 the mid timeframe at the
//! candle aligned to the current base candle.

use crate::domain::{Column, Direction, Sided, Timeframe};

use super::{columns, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext};

pub const RSI6_SATURATION: Sided<f64> = Sided::new(70.0, 30.0);
pub const RSI21_SATURATION: Sided<f64> = Sided::new(70.0, 30.0);
/// RSI6 lead over RSI9 that excuses a saturated RSI6.
pub const RSI6_LEAD: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Current,
}

#[derive(Debug, Clone, Copy)]
pub struct RsiHeadroom {
    id: ConditionId,
    timeframe: Timeframe,
    anchor: Anchor,
}

impl RsiHeadroom {
    pub fn at_start() -> Self {
        Self {
            id: ConditionId::RsiHeadroom,
            timeframe: Timeframe::BASE,
            anchor: Anchor::Start,
        }
    }

    pub fn mid_current() -> Self {
        Self {
            id: ConditionId::MidRsiHeadroom,
            timeframe: Timeframe::MID,
            anchor: Anchor::Current,
        }
    }
}

/// The headroom rule itself, shared by both conditions.
pub fn headroom(direction: Direction, r6: f64, r9: f64, r21: f64) -> Vec<String> {
    let mut failures = Vec::new();
    let r6_saturated = direction.lead(RSI6_SATURATION.get(direction), r6) <= 0.0;
    if r6_saturated && direction.lead(r6, r9) < RSI6_LEAD {
        failures.push(format!(
            "RSI6 {r6:.2} saturated without a {RSI6_LEAD} lead over RSI9 {r9:.2}"
        ));
    }
    if direction.lead(RSI21_SATURATION.get(direction), r21) <= 0.0 {
        failures.push(format!("RSI21 {r21:.2} saturated"));
    }
    failures
}

impl Condition for RsiHeadroom {
    fn id(&self) -> ConditionId {
        self.id
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        columns(self.timeframe, &[Column::Rsi6, Column::Rsi9, Column::Rsi21])
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        let base_index = match self.anchor {
            Anchor::Start => ctx.start_index,
            Anchor::Current => ctx.current_index,
        };
        let (frame, i) = ctx.project(self.timeframe, base_index)?;
        let r6 = frame.value(Column::Rsi6, i)?;
        let r9 = frame.value(Column::Rsi9, i)?;
        let r21 = frame.value(Column::Rsi21, i)?;

        let diag = Diagnostic::new()
            .value("index", i as f64)
            .value("rsi6", r6)
            .value("rsi9", r9)
            .value("rsi21", r21);
        Ok(Check::from_failures(diag, headroom(ctx.direction, r6, r9, r21)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketSnapshot;
    use crate::testing::SeriesBuilder;

    #[test]
    fn headroom_rule_long() {
        assert!(headroom(Direction::Long, 65.0, 60.0, 55.0).is_empty());
        // Saturated but leading.
        assert!(headroom(Direction::Long, 75.0, 70.0, 60.0).is_empty());
        assert_eq!(headroom(Direction::Long, 75.0, 72.0, 60.0).len(), 1);
        assert_eq!(headroom(Direction::Long, 65.0, 60.0, 70.0).len(), 1);
    }

    #[test]
    fn headroom_rule_short() {
        assert!(headroom(Direction::Short, 35.0, 40.0, 45.0).is_empty());
        assert!(headroom(Direction::Short, 25.0, 29.0, 45.0).is_empty());
        assert_eq!(headroom(Direction::Short, 25.0, 27.0, 45.0).len(), 1);
        assert_eq!(headroom(Direction::Short, 35.0, 40.0, 30.0).len(), 1);
    }

    #[test]
    fn mid_variant_reads_aligned_current_candle() {
        let base = SeriesBuilder::new(Timeframe::M5, 12).build();
        // 15m candle 3 opens at base candle 9; only it is saturated.
        let mid = SeriesBuilder::new(Timeframe::M15, 4)
            .fill(Column::Rsi6, 60.0)
            .fill(Column::Rsi9, 55.0)
            .with(Column::Rsi21, |i| if i == 3 { 75.0 } else { 50.0 })
            .build();
        let snap = MarketSnapshot::new().with(base).with(mid);

        let early = EvalContext::new(&snap, Direction::Long, 2, 8);
        assert!(RsiHeadroom::mid_current().evaluate(&early).unwrap().passed);

        let late = EvalContext::new(&snap, Direction::Long, 2, 11);
        let check = RsiHeadroom::mid_current().evaluate(&late).unwrap();
        assert!(!check.passed);
        assert_eq!(check.diagnostic.values["index"], 3.0);
    }
}
