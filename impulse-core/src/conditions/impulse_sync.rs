//! Condition 9: KDJ, RSI and Stoch-RSI cross together on a higher timeframe.

use crate::cross::find_cross;
use crate::domain::{Column, Timeframe};

use super::mid_confirmation::srsi_within_bounds;
use super::{columns, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext};

pub const MIN_HISTORY: usize = 3;
pub const CROSS_WINDOW: usize = 3;
/// Largest gap between the oldest and newest of the three crosses.
pub const MAX_CROSS_SPREAD: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct ImpulseSync {
    pub timeframe: Timeframe,
}

impl Default for ImpulseSync {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::H1,
        }
    }
}

impl ImpulseSync {
    pub fn on(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    pub fn check_on(
        ctx: &EvalContext<'_>,
        timeframe: Timeframe,
    ) -> Result<Check, ConditionError> {
        let dir = ctx.direction;
        let (frame, i) = ctx.project(timeframe, ctx.start_index)?;
        frame.require_history(i, MIN_HISTORY)?;

        let cross = |a: Column, b: Column| -> Result<Option<usize>, ConditionError> {
            Ok(find_cross(
                frame.upto(a, i)?,
                frame.upto(b, i)?,
                dir.cross(),
                CROSS_WINDOW,
            ))
        };
        let mut diag = Diagnostic::new().value("index", i as f64);

        let kdj_cross = cross(Column::KdjJ, Column::KdjD)?;
        let j = frame.value(Column::KdjJ, i)?;
        let k = frame.value(Column::KdjK, i)?;
        let d = frame.value(Column::KdjD, i)?;
        let Some(kdj_cross) = kdj_cross.filter(|_| dir.ordered(j, k, d)) else {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} KDJ: no J/D cross within {CROSS_WINDOW} or not ordered"),
            ));
        };

        let rsi_cross = cross(Column::Rsi6, Column::Rsi21)?;
        let r6 = frame.value(Column::Rsi6, i)?;
        let r9 = frame.value(Column::Rsi9, i)?;
        let r21 = frame.value(Column::Rsi21, i)?;
        let Some(rsi_cross) = rsi_cross.filter(|_| dir.ordered(r6, r9, r21)) else {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} RSI: no RSI6/RSI21 cross within {CROSS_WINDOW} or not ordered"),
            ));
        };

        let srsi_cross = cross(Column::SrsiK, Column::SrsiD)?;
        let sk = frame.value(Column::SrsiK, i)?;
        let sd = frame.value(Column::SrsiD, i)?;
        let Some(srsi_cross) = srsi_cross else {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} Stoch-RSI: no K/D cross within {CROSS_WINDOW}"),
            ));
        };
        if let Some(reason) = srsi_within_bounds(dir, sk, sd) {
            return Ok(Check::fail(diag, format!("{timeframe} {reason}")));
        }

        diag.record("kdj_cross_age", kdj_cross as f64);
        diag.record("rsi_cross_age", rsi_cross as f64);
        diag.record("srsi_cross_age", srsi_cross as f64);
        let ages = [kdj_cross, rsi_cross, srsi_cross];
        let spread = ages.iter().max().unwrap_or(&0) - ages.iter().min().unwrap_or(&0);
        if spread > MAX_CROSS_SPREAD {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} crosses {spread} candles apart (max {MAX_CROSS_SPREAD})"),
            ));
        }
        Ok(Check::pass(diag))
    }

    pub(crate) fn columns_on(timeframe: Timeframe) -> Vec<(Timeframe, Column)> {
        columns(
            timeframe,
            &[
                Column::KdjJ,
                Column::KdjK,
                Column::KdjD,
                Column::Rsi6,
                Column::Rsi9,
                Column::Rsi21,
                Column::SrsiK,
                Column::SrsiD,
            ],
        )
    }
}

impl Condition for ImpulseSync {
    fn id(&self) -> ConditionId {
        ConditionId::ImpulseSync
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        Self::columns_on(self.timeframe)
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        Self::check_on(ctx, self.timeframe)
    }
}
