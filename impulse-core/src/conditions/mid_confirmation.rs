//! Condition 6: the 15m oscillators agree with the start candle.

use crate::domain::{Column, Direction, Sided, Timeframe};

use super::{
    columns, holds_trend, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext,
    Frame,
};

pub const TREND_SPAN: usize = 2;

/// Stoch-RSI K may trail D by this much.
pub const SRSI_SLACK: Sided<f64> = Sided::new(3.0, 2.0);
/// Stoch-RSI D must not be beyond this level.
pub const SRSI_D_LIMIT: Sided<f64> = Sided::new(82.0, 19.0);

pub const RSI6_TREND_TOLERANCE: f64 = 6.5;
pub const KDJ_TREND_TOLERANCE: f64 = 5.0;
/// D below (long) / above (short) this is calm enough on its own.
pub const KDJ_CALM_D: Sided<f64> = Sided::new(60.0, 40.0);
/// Otherwise J must lead D by at least this much.
pub const KDJ_WIDE_SPREAD: f64 = 20.0;
pub const KDJ_J_BOUND: Sided<f64> = Sided::new(100.0, 0.0);

pub const DEA_BOUND: Sided<f64> = Sided::new(150.0, -150.0);

/// Stoch-RSI position rule, shared with the 1h sync check.
pub fn srsi_within_bounds(direction: Direction, k: f64, d: f64) -> Option<String> {
    if direction.lead(k, d) < -SRSI_SLACK.get(direction) {
        return Some(format!("Stoch-RSI K {k:.2} trails D {d:.2}"));
    }
    if direction.lead(SRSI_D_LIMIT.get(direction), d) < 0.0 {
        return Some(format!(
            "Stoch-RSI D {d:.2} beyond {}",
            SRSI_D_LIMIT.get(direction)
        ));
    }
    None
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MidConfirmation;

impl MidConfirmation {
    fn rsi(
        frame: &Frame<'_>,
        dir: Direction,
        i: usize,
        diag: &mut Diagnostic,
    ) -> Result<Option<String>, ConditionError> {
        let r6 = frame.value(Column::Rsi6, i)?;
        let r6_before = frame.value(Column::Rsi6, i - TREND_SPAN)?;
        let r9 = frame.value(Column::Rsi9, i)?;
        let r21 = frame.value(Column::Rsi21, i)?;
        diag.record("rsi6", r6);
        diag.record("rsi9", r9);
        diag.record("rsi21", r21);

        if !holds_trend(dir, r6, r6_before, RSI6_TREND_TOLERANCE) {
            return Ok(Some(format!("RSI6 moved {:.2} against {dir}", r6 - r6_before)));
        }
        if !dir.ordered(r6, r9, r21) {
            return Ok(Some(format!("RSI6/9/21 not ordered for {dir}")));
        }
        Ok(None)
    }

    fn kdj(
        frame: &Frame<'_>,
        dir: Direction,
        i: usize,
        diag: &mut Diagnostic,
    ) -> Result<Option<String>, ConditionError> {
        let mut now = [0.0; 3];
        for (slot, col) in now.iter_mut().zip([Column::KdjJ, Column::KdjK, Column::KdjD]) {
            *slot = frame.value(col, i)?;
            let before = frame.value(col, i - TREND_SPAN)?;
            if !holds_trend(dir, *slot, before, KDJ_TREND_TOLERANCE) {
                diag.flag(col.name());
            }
        }
        let [j, k, d] = now;
        diag.record("kdj_j", j);
        diag.record("kdj_k", k);
        diag.record("kdj_d", d);

        if !diag.flagged.is_empty() {
            let lines = diag.flagged.join(", ");
            return Ok(Some(format!("KDJ moving against {dir}: {lines}")));
        }
        if !dir.ordered(j, k, d) {
            return Ok(Some(format!("KDJ not ordered for {dir}")));
        }
        let calm = dir.lead(KDJ_CALM_D.get(dir), d) > 0.0;
        if !calm && dir.lead(j, d) < KDJ_WIDE_SPREAD {
            return Ok(Some(format!(
                "KDJ D {d:.2} extended without a {KDJ_WIDE_SPREAD} J lead"
            )));
        }
        if dir.lead(KDJ_J_BOUND.get(dir), j) <= 0.0 {
            return Ok(Some(format!("KDJ J {j:.2} beyond {}", KDJ_J_BOUND.get(dir))));
        }
        Ok(None)
    }
}

impl Condition for MidConfirmation {
    fn id(&self) -> ConditionId {
        ConditionId::MidConfirmation
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        columns(
            Timeframe::MID,
            &[
                Column::SrsiK,
                Column::SrsiD,
                Column::Rsi6,
                Column::Rsi9,
                Column::Rsi21,
                Column::KdjJ,
                Column::KdjK,
                Column::KdjD,
                Column::MacdDea,
            ],
        )
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        let dir = ctx.direction;
        let (mid, i) = ctx.project(Timeframe::MID, ctx.start_index)?;
        mid.require_history(i, TREND_SPAN)?;

        let mut diag = Diagnostic::new().value("index", i as f64);
        let k = mid.value(Column::SrsiK, i)?;
        let d = mid.value(Column::SrsiD, i)?;
        diag.record("srsi_k", k);
        diag.record("srsi_d", d);
        if let Some(reason) = srsi_within_bounds(dir, k, d) {
            return Ok(Check::fail(diag, reason));
        }

        if let Some(reason) = Self::rsi(&mid, dir, i, &mut diag)? {
            return Ok(Check::fail(diag, reason));
        }
        if let Some(reason) = Self::kdj(&mid, dir, i, &mut diag)? {
            return Ok(Check::fail(diag, reason));
        }

        let dea = mid.value(Column::MacdDea, i)?;
        diag.record("macd_dea", dea);
        if dir.lead(DEA_BOUND.get(dir), dea) <= 0.0 {
            return Ok(Check::fail(
                diag,
                format!("MACD DEA {dea:.1} beyond {}", DEA_BOUND.get(dir)),
            ));
        }
        Ok(Check::pass(diag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MarketSnapshot;
    use crate::testing::SeriesBuilder;

    /// 15m series that passes for long at every index.
    fn long_mid() -> SeriesBuilder {
        SeriesBuilder::new(Timeframe::M15, 4)
            .fill(Column::SrsiK, 60.0)
            .fill(Column::SrsiD, 55.0)
            .fill(Column::Rsi6, 62.0)
            .fill(Column::Rsi9, 58.0)
            .fill(Column::Rsi21, 52.0)
            .fill(Column::KdjJ, 70.0)
            .fill(Column::KdjK, 60.0)
            .fill(Column::KdjD, 50.0)
            .fill(Column::MacdDea, 10.0)
    }

    fn eval(mid: SeriesBuilder, dir: Direction) -> Check {
        let base = SeriesBuilder::new(Timeframe::M5, 12).build();
        let snap = MarketSnapshot::new().with(base).with(mid.build());
        // Base candle 11 aligns to 15m candle 3.
        MidConfirmation
            .evaluate(&EvalContext::new(&snap, dir, 11, 11))
            .unwrap()
    }

    #[test]
    fn aligned_long_setup_passes() {
        assert!(eval(long_mid(), Direction::Long).passed);
    }

    #[test]
    fn stoch_rsi_d_limit() {
        let mid = long_mid().fill(Column::SrsiD, 83.0).fill(Column::SrsiK, 85.0);
        let check = eval(mid, Direction::Long);
        assert!(check.diagnostic.reason.unwrap().contains("Stoch-RSI D"));
    }

    #[test]
    fn extended_d_needs_wide_spread() {
        let mid = long_mid()
            .fill(Column::KdjJ, 75.0)
            .fill(Column::KdjK, 70.0)
            .fill(Column::KdjD, 65.0);
        assert!(!eval(mid, Direction::Long).passed);
        let mid = long_mid()
            .fill(Column::KdjJ, 90.0)
            .fill(Column::KdjK, 75.0)
            .fill(Column::KdjD, 65.0);
        assert!(eval(mid, Direction::Long).passed);
    }

    #[test]
    fn dea_bound() {
        let mid = long_mid().fill(Column::MacdDea, 150.0);
        assert!(!eval(mid, Direction::Long).passed);
    }

    #[test]
    fn short_mirror_passes() {
        let mid = SeriesBuilder::new(Timeframe::M15, 4)
            .fill(Column::SrsiK, 40.0)
            .fill(Column::SrsiD, 41.0)
            .fill(Column::Rsi6, 38.0)
            .fill(Column::Rsi9, 42.0)
            .fill(Column::Rsi21, 48.0)
            .fill(Column::KdjJ, 30.0)
            .fill(Column::KdjK, 40.0)
            .fill(Column::KdjD, 50.0)
            .fill(Column::MacdDea, -10.0);
        let check = eval(mid, Direction::Short);
        assert!(check.passed, "{:?}", check.diagnostic.reason);
    }

    #[test]
    fn kdj_line_falling_fails_long() {
        let mid = long_mid().set(Column::KdjK, &[(3, 54.0)]);
        let check = eval(mid, Direction::Long);
        assert!(!check.passed);
        assert_eq!(check.diagnostic.flagged, vec!["kdj_k".to_string()]);
    }
}
