//! Condition 8: a fresh KDJ and RSI impulse on a coarser timeframe, preceded
//! by a MACD trend in the opposite direction.

use crate::cross::{cross_position, find_cross};
use crate::domain::{Column, Direction, Timeframe};

use super::{
    columns, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext, Frame,
};

pub const MIN_HISTORY: usize = 3;
pub const DELTA_SPAN: usize = 2;

/// KDJ J and RSI6 must have crossed within this many candles.
pub const CROSS_WINDOW: usize = 2;
pub const J_MIN_DELTA: f64 = 20.0;
pub const RSI6_MIN_DELTA: f64 = 10.0;
/// RSI9 may trail RSI21 by this much.
pub const RSI9_SLACK: f64 = 1.0;
pub const MAX_CROSS_SKEW: usize = 2;

/// How far back the DIF/DEA cross that ended the prior trend is searched.
pub const MACD_TREND_LOOKBACK: usize = 100;
/// Counter-direction histogram bars needed before that cross.
pub const MACD_TREND_MIN_BARS: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct ImpulseCross {
    pub timeframe: Timeframe,
}

impl Default for ImpulseCross {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::M30,
        }
    }
}

impl ImpulseCross {
    pub fn on(timeframe: Timeframe) -> Self {
        Self { timeframe }
    }

    /// Counter-direction histogram bars immediately before the most recent
    /// oriented DIF/DEA cross as of `i`, or `None` if there is no such cross.
    ///
    /// A low-volume bar whose candle already points in the signal direction
    /// is stepped over without counting; any other bar ends the run.
    pub fn prior_trend_bars(
        frame: &Frame<'_>,
        dir: Direction,
        i: usize,
    ) -> Result<Option<usize>, ConditionError> {
        let dif = frame.upto(Column::MacdDif, i)?;
        let dea = frame.upto(Column::MacdDea, i)?;
        let hist = frame.upto(Column::MacdHist, i)?;
        let vol_ma = frame.upto(Column::VolMa10, i)?;

        let Some(offset) = find_cross(dif, dea, dir.cross(), MACD_TREND_LOOKBACK) else {
            return Ok(None);
        };
        let cross_at = cross_position(dif.len(), offset);

        let mut count = 0;
        for b in (0..cross_at).rev() {
            if count >= MACD_TREND_MIN_BARS {
                break;
            }
            if dir.lead(0.0, hist[b]) > 0.0 {
                count += 1;
                continue;
            }
            let candle = frame.candle(b)?;
            let quiet = vol_ma[b].is_finite() && candle.volume < vol_ma[b];
            let leaning = match dir {
                Direction::Long => candle.is_green(),
                Direction::Short => !candle.is_green(),
            };
            if !(quiet && leaning) {
                break;
            }
        }
        Ok(Some(count))
    }

    pub fn check_on(
        ctx: &EvalContext<'_>,
        timeframe: Timeframe,
    ) -> Result<Check, ConditionError> {
        let dir = ctx.direction;
        let (frame, i) = ctx.project(timeframe, ctx.start_index)?;
        frame.require_history(i, MIN_HISTORY)?;

        let j = frame.value(Column::KdjJ, i)?;
        let k = frame.value(Column::KdjK, i)?;
        let d = frame.value(Column::KdjD, i)?;
        let j_before = frame.value(Column::KdjJ, i - DELTA_SPAN)?;
        let r6 = frame.value(Column::Rsi6, i)?;
        let r9 = frame.value(Column::Rsi9, i)?;
        let r21 = frame.value(Column::Rsi21, i)?;
        let r6_before = frame.value(Column::Rsi6, i - DELTA_SPAN)?;

        let mut diag = Diagnostic::new()
            .value("index", i as f64)
            .value("j_delta", j - j_before)
            .value("rsi6_delta", r6 - r6_before);

        if !dir.ordered(j, k, d) || dir.lead(j, j_before) <= J_MIN_DELTA {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} KDJ not ordered or J move <= {J_MIN_DELTA}"),
            ));
        }
        let kdj_cross = find_cross(
            frame.upto(Column::KdjJ, i)?,
            frame.upto(Column::KdjD, i)?,
            dir.cross(),
            CROSS_WINDOW,
        );
        let Some(kdj_cross) = kdj_cross else {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} no J/D cross within {CROSS_WINDOW} candles"),
            ));
        };

        if dir.lead(r6, r9) <= 0.0 || dir.lead(r9, r21) < -RSI9_SLACK {
            return Ok(Check::fail(diag, format!("{timeframe} RSI not ordered")));
        }
        if dir.lead(r6, r6_before) <= RSI6_MIN_DELTA {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} RSI6 move <= {RSI6_MIN_DELTA}"),
            ));
        }
        let rsi_cross = find_cross(
            frame.upto(Column::Rsi6, i)?,
            frame.upto(Column::Rsi21, i)?,
            dir.cross(),
            CROSS_WINDOW,
        );
        let Some(rsi_cross) = rsi_cross else {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} no RSI6/RSI21 cross within {CROSS_WINDOW} candles"),
            ));
        };
        diag.record("kdj_cross_age", kdj_cross as f64);
        diag.record("rsi_cross_age", rsi_cross as f64);

        if kdj_cross.abs_diff(rsi_cross) > MAX_CROSS_SKEW {
            return Ok(Check::fail(
                diag,
                format!("{timeframe} KDJ and RSI crosses more than {MAX_CROSS_SKEW} candles apart"),
            ));
        }

        let bars = Self::prior_trend_bars(&frame, dir, i)?;
        diag.record("prior_trend_bars", bars.unwrap_or(0) as f64);
        match bars {
            Some(n) if n >= MACD_TREND_MIN_BARS => Ok(Check::pass(diag)),
            Some(n) => Ok(Check::fail(
                diag,
                format!("{timeframe} prior MACD trend {n} bars (< {MACD_TREND_MIN_BARS})"),
            )),
            None => Ok(Check::fail(
                diag,
                format!("{timeframe} no DIF/DEA cross within {MACD_TREND_LOOKBACK} candles"),
            )),
        }
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
                Column::MacdDif,
                Column::MacdDea,
                Column::MacdHist,
                Column::VolMa10,
            ],
        )
    }
}

impl Condition for ImpulseCross {
    fn id(&self) -> ConditionId {
        ConditionId::ImpulseCross
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        Self::columns_on(self.timeframe)
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        Self::check_on(ctx, self.timeframe)
    }
}
