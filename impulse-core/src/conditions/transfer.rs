//! Condition 10: the impulse checks moved one tier up.
//!
//! Condition 8's rule on the 1h series and condition 9's rule on the 2h
//! series. Passing selects the `1h/2h` impulse timeframe.

use crate::domain::{Column, Timeframe};

use super::{
    Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext, ImpulseCross,
    ImpulseSync,
};

pub const TRANSFER_LABEL: &str = "1h/2h";

#[derive(Debug, Clone, Copy)]
pub struct TimeframeTransfer {
    pub cross_timeframe: Timeframe,
    pub sync_timeframe: Timeframe,
}

impl Default for TimeframeTransfer {
    fn default() -> Self {
        Self {
            cross_timeframe: Timeframe::H1,
            sync_timeframe: Timeframe::H2,
        }
    }
}

impl Condition for TimeframeTransfer {
    fn id(&self) -> ConditionId {
        ConditionId::TimeframeTransfer
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        let mut cols = ImpulseCross::columns_on(self.cross_timeframe);
        cols.extend(ImpulseSync::columns_on(self.sync_timeframe));
        cols
    }

    /// A data error on one tier fails the check with the error as its
    /// reason; only when neither tier can be judged is the error returned.
    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        let halves = [
            ("cross", ImpulseCross::check_on(ctx, self.cross_timeframe)),
            ("sync", ImpulseSync::check_on(ctx, self.sync_timeframe)),
        ];
        if let [(_, Err(e)), (_, Err(_))] = &halves {
            return Err(e.clone());
        }

        let mut diag = Diagnostic::new();
        let mut failures = Vec::new();
        for (prefix, half) in halves {
            match half {
                Ok(check) => {
                    for (name, v) in &check.diagnostic.values {
                        diag.record(format!("{prefix}_{name}"), *v);
                    }
                    failures.extend(check.diagnostic.reason);
                }
                Err(e) => {
                    diag.flag(format!("{prefix}_error"));
                    failures.push(e.to_string());
                }
            }
        }
        Ok(Check::from_failures(diag, failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, MarketSnapshot};
    use crate::testing::SeriesBuilder;

    const BASE_LEN: usize = 144;
    /// Base candle 132 opens inside 1h candle 11 and 2h candle 5.
    const START: usize = 132;

    /// 1h long impulse: J and RSI6 cross up at candle 10 after a run of
    /// negative MACD histogram bars.
    fn hourly_impulse() -> SeriesBuilder {
        let cross = 10;
        SeriesBuilder::new(Timeframe::H1, 12)
            .with(Column::KdjJ, move |i| if i < cross { 30.0 } else { 80.0 })
            .fill(Column::KdjK, 50.0)
            .fill(Column::KdjD, 45.0)
            .with(Column::Rsi6, move |i| if i < cross { 40.0 } else { 62.0 })
            .fill(Column::Rsi9, 55.0)
            .fill(Column::Rsi21, 50.0)
            .with(Column::MacdDif, move |i| if i < cross { -2.0 } else { 1.0 })
            .fill(Column::MacdDea, 0.0)
            .with(Column::MacdHist, move |i| if i < cross { -4.0 } else { 2.0 })
            .fill(Column::VolMa10, 1000.0)
    }

    /// 2h long sync: KDJ, RSI and Stoch-RSI all cross up at candle 4.
    fn two_hour_sync() -> SeriesBuilder {
        let cross = 4;
        SeriesBuilder::new(Timeframe::H2, 6)
            .with(Column::KdjJ, move |i| if i < cross { 40.0 } else { 70.0 })
            .fill(Column::KdjK, 55.0)
            .fill(Column::KdjD, 50.0)
            .with(Column::Rsi6, move |i| if i < cross { 45.0 } else { 60.0 })
            .fill(Column::Rsi9, 55.0)
            .fill(Column::Rsi21, 50.0)
            .with(Column::SrsiK, move |i| if i < cross { 30.0 } else { 60.0 })
            .fill(Column::SrsiD, 50.0)
    }

    fn flat(timeframe: Timeframe, len: usize) -> SeriesBuilder {
        [
            Column::KdjJ,
            Column::KdjK,
            Column::KdjD,
            Column::Rsi6,
            Column::Rsi9,
            Column::Rsi21,
            Column::SrsiK,
            Column::SrsiD,
            Column::MacdDif,
            Column::MacdDea,
            Column::MacdHist,
            Column::VolMa10,
        ]
        .into_iter()
        .fold(SeriesBuilder::new(timeframe, len), |b, c| b.fill(c, 50.0))
    }

    fn eval(frames: Vec<SeriesBuilder>) -> Result<Check, ConditionError> {
        let base = SeriesBuilder::new(Timeframe::M5, BASE_LEN).build();
        let snap = frames
            .into_iter()
            .fold(MarketSnapshot::new().with(base), |s, f| s.with(f.build()));
        TimeframeTransfer::default().evaluate(&EvalContext::new(&snap, Direction::Long, START, START))
    }

    #[test]
    fn hourly_cross_with_two_hour_sync_passes() {
        let check = eval(vec![hourly_impulse(), two_hour_sync()]).unwrap();
        assert!(check.passed, "{:?}", check.diagnostic.reason);
        assert_eq!(check.diagnostic.values["cross_index"], 11.0);
        assert_eq!(check.diagnostic.values["sync_index"], 5.0);
        assert_eq!(check.diagnostic.values["cross_prior_trend_bars"], 4.0);
    }

    #[test]
    fn hourly_cross_alone_fails() {
        let check = eval(vec![hourly_impulse(), flat(Timeframe::H2, 6)]).unwrap();
        assert!(!check.passed);
        let reason = check.diagnostic.reason.unwrap();
        assert!(reason.starts_with("2H KDJ"), "{reason}");
    }

    #[test]
    fn two_hour_sync_alone_fails() {
        let check = eval(vec![flat(Timeframe::H1, 12), two_hour_sync()]).unwrap();
        assert!(!check.passed);
        let reason = check.diagnostic.reason.unwrap();
        assert!(reason.starts_with("1H KDJ"), "{reason}");
        assert!(check.diagnostic.values.contains_key("sync_srsi_cross_age"));
    }

    #[test]
    fn missing_hourly_series_fails_with_the_sync_half_recorded() {
        let check = eval(vec![two_hour_sync()]).unwrap();
        assert!(!check.passed);
        assert!(check.diagnostic.flagged.contains(&"cross_error".to_string()));
        assert!(check.diagnostic.reason.unwrap().contains("missing from snapshot"));
        assert_eq!(check.diagnostic.values["sync_kdj_cross_age"], 1.0);
    }

    #[test]
    fn missing_higher_timeframe_is_an_error() {
        let base = SeriesBuilder::new(Timeframe::M5, 40).build();
        let snap = MarketSnapshot::new().with(base);
        let err = TimeframeTransfer::default()
            .evaluate(&EvalContext::new(&snap, Direction::Long, 39, 39))
            .unwrap_err();
        assert_eq!(err, ConditionError::MissingTimeframe(Timeframe::H1));
    }

    #[test]
    fn requires_columns_on_both_tiers() {
        let cols = TimeframeTransfer::default().required_columns();
        assert!(cols.contains(&(Timeframe::H1, Column::MacdHist)));
        assert!(cols.contains(&(Timeframe::H2, Column::SrsiK)));
        assert!(!cols.iter().any(|(tf, _)| *tf == Timeframe::M30));
    }
}
