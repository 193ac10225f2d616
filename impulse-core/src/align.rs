//! Cross-timeframe index alignment.
//!
//! A condition defined on a coarser timeframe is evaluated "as of" a base
//! candle: the coarser candle used is the most recent one that had already
//! opened at the base candle's timestamp. Candles never look into the future.

use crate::domain::CandleSeries;

/// Project `base_index` of `base` onto `target`.
///
/// Returns the greatest target index whose timestamp is `<=` the base
/// candle's timestamp, clamped into `[0, target.len() - 1]`. `None` if the
/// base index is out of range or the target is empty.
pub fn project(base: &CandleSeries, base_index: usize, target: &CandleSeries) -> Option<usize> {
    let at = base.timestamp(base_index)?;
    if target.is_empty() {
        return None;
    }
    let after = target.candles().partition_point(|c| c.timestamp <= at);
    Some(after.saturating_sub(1).min(target.len() - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, IndicatorValues, Timeframe};
    use chrono::{TimeZone, Utc};

    fn series(timeframe: Timeframe, start_minute: i64, count: usize) -> CandleSeries {
        let step = timeframe.minutes();
        let candles = (0..count)
            .map(|i| Candle {
                timestamp: Utc
                    .timestamp_opt(1_700_000_400 + (start_minute + step * i as i64) * 60, 0)
                    .unwrap(),
                open: 1.0,
                high: 1.0,
                low: 1.0,
                close: 1.0,
                volume: 1.0,
                confirmed: true,
            })
            .collect();
        CandleSeries::new(timeframe, candles, IndicatorValues::new()).unwrap()
    }

    #[test]
    fn maps_to_containing_coarse_candle() {
        let base = series(Timeframe::M5, 0, 24);
        let coarse = series(Timeframe::M30, 0, 4);
        // 5m index 0..=5 fall in the first 30m candle, 6..=11 in the second.
        assert_eq!(project(&base, 0, &coarse), Some(0));
        assert_eq!(project(&base, 5, &coarse), Some(0));
        assert_eq!(project(&base, 6, &coarse), Some(1));
        assert_eq!(project(&base, 23, &coarse), Some(3));
    }

    #[test]
    fn never_selects_future_candle() {
        let base = series(Timeframe::M5, 0, 12);
        let coarse = series(Timeframe::H1, 0, 3);
        assert_eq!(project(&base, 11, &coarse), Some(0));
    }

    #[test]
    fn clamps_when_target_starts_later() {
        let base = series(Timeframe::M5, 0, 3);
        let coarse = series(Timeframe::M30, 600, 3);
        assert_eq!(project(&base, 2, &coarse), Some(0));
    }

    #[test]
    fn clamps_when_target_ends_earlier() {
        let base = series(Timeframe::M5, 600, 3);
        let coarse = series(Timeframe::M30, 0, 3);
        assert_eq!(project(&base, 0, &coarse), Some(2));
    }

    #[test]
    fn out_of_range_base_index_is_none() {
        let base = series(Timeframe::M5, 0, 3);
        let coarse = series(Timeframe::M30, 0, 3);
        assert_eq!(project(&base, 3, &coarse), None);
        let empty = CandleSeries::new(Timeframe::M30, vec![], IndicatorValues::new()).unwrap();
        assert_eq!(project(&base, 0, &empty), None);
    }
}
