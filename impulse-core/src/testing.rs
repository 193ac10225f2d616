//! Synthetic series builders for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{Candle, CandleSeries, Column, Direction, IndicatorValues, Timeframe};

/// 2024-01-01 00:00 UTC, aligned to every timeframe boundary.
pub const EPOCH_SECS: i64 = 1_704_067_200;

pub fn ts(timeframe: Timeframe, index: usize) -> DateTime<Utc> {
    Utc.timestamp_opt(EPOCH_SECS, 0).unwrap() + Duration::minutes(timeframe.minutes() * index as i64)
}

/// Flat candles (open = close = 100) with builder-style column setters.
pub struct SeriesBuilder {
    timeframe: Timeframe,
    candles: Vec<Candle>,
    indicators: IndicatorValues,
}

impl SeriesBuilder {
    pub fn new(timeframe: Timeframe, len: usize) -> Self {
        let candles = (0..len)
            .map(|i| Candle {
                timestamp: ts(timeframe, i),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 1000.0,
                confirmed: true,
            })
            .collect();
        Self {
            timeframe,
            candles,
            indicators: IndicatorValues::new(),
        }
    }

    pub fn from_series(series: &CandleSeries) -> Self {
        Self {
            timeframe: series.timeframe(),
            candles: series.candles().to_vec(),
            indicators: series.indicators().clone(),
        }
    }

    /// Re-stamp candles so the first one is candle `first` after the epoch.
    pub fn starting_at(mut self, first: usize) -> Self {
        for (i, c) in self.candles.iter_mut().enumerate() {
            c.timestamp = ts(self.timeframe, first + i);
        }
        self
    }

    pub fn fill(self, column: Column, value: f64) -> Self {
        self.with(column, |_| value)
    }

    pub fn with(mut self, column: Column, f: impl Fn(usize) -> f64) -> Self {
        let values = (0..self.candles.len()).map(f).collect();
        self.indicators.insert(column, values);
        self
    }

    /// Overwrite single values; the column must already exist.
    pub fn set(mut self, column: Column, points: &[(usize, f64)]) -> Self {
        let mut values = self
            .indicators
            .get_series(column)
            .expect("column must be filled before set")
            .to_vec();
        for &(i, v) in points {
            values[i] = v;
        }
        self.indicators.insert(column, values);
        self
    }

    pub fn candle(mut self, index: usize, f: impl FnOnce(&mut Candle)) -> Self {
        f(&mut self.candles[index]);
        self
    }

    pub fn unconfirmed_last(mut self) -> Self {
        if let Some(c) = self.candles.last_mut() {
            c.confirmed = false;
        }
        self
    }

    pub fn build(self) -> CandleSeries {
        CandleSeries::new(self.timeframe, self.candles, self.indicators).unwrap()
    }
}

/// Base series whose fast EMA crosses the slow one at `fast_cross` and whose
/// medium EMA crosses at `medium_cross` (or never).
pub fn ema_scenario(
    direction: Direction,
    len: usize,
    fast_cross: usize,
    medium_cross: Option<usize>,
) -> CandleSeries {
    let below = 100.0 - direction.sign();
    let above = 100.0 + direction.sign();
    SeriesBuilder::new(Timeframe::M5, len)
        .fill(Column::Ema21, 100.0)
        .with(Column::Ema5, |i| if i < fast_cross { below } else { above })
        .with(Column::Ema10, |i| match medium_cross {
            Some(m) if i >= m => above,
            _ => below,
        })
        .build()
}
