//! Shared synthetic market data for integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use impulse_core::domain::{
    Candle, CandleSeries, Column, Direction, IndicatorValues, MarketSnapshot, Timeframe,
};

/// 2024-01-01 00:00 UTC.
pub const EPOCH_SECS: i64 = 1_704_067_200;
/// Base candles start one day after the epoch; coarser series end before it.
pub const BASE_OFFSET_MINUTES: i64 = 24 * 60;

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(EPOCH_SECS, 0).unwrap() + Duration::minutes(minutes)
}

pub struct SeriesBuilder {
    timeframe: Timeframe,
    candles: Vec<Candle>,
    indicators: IndicatorValues,
}

impl SeriesBuilder {
    /// `len` flat candles, the first opening `start_minutes` after the epoch.
    pub fn new(timeframe: Timeframe, len: usize, start_minutes: i64) -> Self {
        let candles = (0..len)
            .map(|i| Candle {
                timestamp: at(start_minutes + timeframe.minutes() * i as i64),
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

    /// Series whose last candle opens just before the base series.
    pub fn coarse(timeframe: Timeframe, len: usize) -> Self {
        Self::new(
            timeframe,
            len,
            BASE_OFFSET_MINUTES - timeframe.minutes() * len as i64,
        )
    }

    pub fn base(len: usize) -> Self {
        Self::new(Timeframe::M5, len, BASE_OFFSET_MINUTES)
    }

    pub fn fill(self, column: Column, value: f64) -> Self {
        self.with(column, |_| value)
    }

    pub fn with(mut self, column: Column, f: impl Fn(usize) -> f64) -> Self {
        let values = (0..self.candles.len()).map(f).collect();
        self.indicators.insert(column, values);
        self
    }

    pub fn build(self) -> CandleSeries {
        CandleSeries::new(self.timeframe, self.candles, self.indicators).unwrap()
    }
}

/// Index at which the base fast EMA crosses the slow one.
pub const FAST_CROSS: usize = 10;
/// Index at which the base medium EMA confirms.
pub const MEDIUM_CROSS: usize = 12;

/// Base 5m series for a long start.
///
/// Fast EMA crosses at 10, medium at `medium_cross` (or never); MACD crossed
/// up at 8; oscillators sit in a healthy long configuration.
pub fn base(len: usize, medium_cross: Option<usize>) -> CandleSeries {
    SeriesBuilder::base(len)
        .fill(Column::Ema21, 100.0)
        .with(Column::Ema5, |i| if i < FAST_CROSS { 99.0 } else { 101.0 })
        .with(Column::Ema10, move |i| match medium_cross {
            Some(m) if i >= m => 101.0,
            _ => 99.0,
        })
        .with(Column::MacdDif, |i| if i < 8 { -1.0 } else { 2.0 })
        .fill(Column::MacdDea, 0.0)
        .fill(Column::MacdHist, 1.0)
        .fill(Column::Rsi6, 60.0)
        .fill(Column::Rsi9, 55.0)
        .fill(Column::Rsi21, 50.0)
        .fill(Column::KdjJ, 70.0)
        .fill(Column::KdjK, 60.0)
        .fill(Column::KdjD, 50.0)
        .fill(Column::SrsiK, 60.0)
        .fill(Column::SrsiD, 55.0)
        .fill(Column::VolMa5, 1000.0)
        .fill(Column::VolMa10, 1000.0)
        .fill(Column::Atr14, 2.0)
        .build()
}

/// 15m series agreeing with a long start.
pub fn mid() -> CandleSeries {
    SeriesBuilder::coarse(Timeframe::M15, 4)
        .fill(Column::SrsiK, 60.0)
        .fill(Column::SrsiD, 55.0)
        .fill(Column::Rsi6, 62.0)
        .fill(Column::Rsi9, 58.0)
        .fill(Column::Rsi21, 52.0)
        .fill(Column::KdjJ, 70.0)
        .fill(Column::KdjK, 60.0)
        .fill(Column::KdjD, 50.0)
        .fill(Column::MacdDea, 10.0)
        .build()
}

const IMPULSE_LEN: usize = 12;
const IMPULSE_AT: usize = 10;

fn step(before: f64, after: f64) -> impl Fn(usize) -> f64 {
    move |i| if i < IMPULSE_AT { before } else { after }
}

/// Coarse series with a long impulse on its last two candles.
///
/// KDJ, RSI and Stoch-RSI all cross up at candle 10 after a run of negative
/// MACD histogram bars; earlier candles carry the bunched/inverted setups
/// the relaxed check looks for.
pub fn impulse(timeframe: Timeframe) -> CandleSeries {
    SeriesBuilder::coarse(timeframe, IMPULSE_LEN)
        .with(Column::KdjJ, step(30.0, 80.0))
        .with(Column::KdjK, step(40.0, 50.0))
        .fill(Column::KdjD, 45.0)
        .with(Column::Rsi6, step(40.0, 62.0))
        .with(Column::Rsi9, step(50.0, 55.0))
        .fill(Column::Rsi21, 50.0)
        .with(Column::SrsiK, step(30.0, 60.0))
        .fill(Column::SrsiD, 50.0)
        .with(Column::MacdDif, step(-2.0, 1.0))
        .fill(Column::MacdDea, 0.0)
        .with(Column::MacdHist, step(-4.0, 2.0))
        .fill(Column::VolMa10, 1000.0)
        .build()
}

/// Coarse series on which every indicator sits at 50: no impulse at all.
pub fn flat(timeframe: Timeframe) -> CandleSeries {
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
    .iter()
    .fold(SeriesBuilder::coarse(timeframe, IMPULSE_LEN), |b, &c| {
        b.fill(c, 50.0)
    })
    .build()
}

/// Full long snapshot with the given 30m, 1h and 2h series.
pub fn snapshot(
    base: CandleSeries,
    m30: CandleSeries,
    h1: CandleSeries,
    h2: CandleSeries,
) -> MarketSnapshot {
    MarketSnapshot::new()
        .with(base)
        .with(mid())
        .with(m30)
        .with(h1)
        .with(h2)
}

pub fn confirmed_base() -> CandleSeries {
    base(MEDIUM_CROSS + 1, Some(MEDIUM_CROSS))
}

pub const LONG: Direction = Direction::Long;
