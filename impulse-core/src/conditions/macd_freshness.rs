//! Condition 2: the base MACD cross is recent and not overextended.

use crate::cross::{cross_position, find_cross};
use crate::domain::{Column, Timeframe};

use super::{columns, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext};

/// How far back the DIF/DEA cross is searched.
pub const MACD_CROSS_LOOKBACK: usize = 50;
/// Oldest acceptable cross, in candles back from the current one.
pub const MACD_CROSS_MAX_AGE: usize = 11;
/// Largest `|dif - dea|` allowed on the crossing candle.
pub const MACD_GAP_CEILING: f64 = 70.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct MacdFreshness;

impl Condition for MacdFreshness {
    fn id(&self) -> ConditionId {
        ConditionId::MacdFreshness
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        columns(Timeframe::BASE, &[Column::MacdDif, Column::MacdDea])
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        let base = ctx.base()?;
        let dif = base.upto(Column::MacdDif, ctx.current_index)?;
        let dea = base.upto(Column::MacdDea, ctx.current_index)?;

        let Some(offset) = find_cross(dif, dea, ctx.direction.cross(), MACD_CROSS_LOOKBACK) else {
            return Ok(Check::fail(
                Diagnostic::new(),
                format!("no DIF/DEA {} cross within {MACD_CROSS_LOOKBACK} candles", ctx.direction),
            ));
        };
        let at = cross_position(dif.len(), offset);
        let gap = (dif[at] - dea[at]).abs();
        let diag = Diagnostic::new()
            .value("cross_age", offset as f64)
            .value("gap", gap);

        if offset > MACD_CROSS_MAX_AGE {
            return Ok(Check::fail(
                diag,
                format!("DIF/DEA cross is {offset} candles old (max {MACD_CROSS_MAX_AGE})"),
            ));
        }
        if gap > MACD_GAP_CEILING {
            return Ok(Check::fail(
                diag,
                format!("DIF/DEA gap {gap:.2} at cross exceeds {MACD_GAP_CEILING}"),
            ));
        }
        Ok(Check::pass(diag))
    }
}
