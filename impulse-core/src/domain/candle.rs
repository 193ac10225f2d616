//! Candles, indicator columns and the per-timeframe series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Timeframe;

/// OHLCV candle for one aggregation period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// False for the still-forming candle an exchange returns last.
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

impl Candle {
    /// Close at or above open.
    pub fn is_green(&self) -> bool {
        self.close >= self.open
    }
}

/// Precomputed indicator columns carried by every candle series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Ema5,
    Ema10,
    Ema21,
    MacdDif,
    MacdDea,
    MacdHist,
    Rsi6,
    Rsi9,
    Rsi21,
    KdjJ,
    KdjK,
    KdjD,
    SrsiK,
    SrsiD,
    VolMa5,
    VolMa10,
    Atr14,
}

impl Column {
    pub const ALL: [Column; 17] = [
        Column::Ema5,
        Column::Ema10,
        Column::Ema21,
        Column::MacdDif,
        Column::MacdDea,
        Column::MacdHist,
        Column::Rsi6,
        Column::Rsi9,
        Column::Rsi21,
        Column::KdjJ,
        Column::KdjK,
        Column::KdjD,
        Column::SrsiK,
        Column::SrsiD,
        Column::VolMa5,
        Column::VolMa10,
        Column::Atr14,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Ema5 => "ema5",
            Column::Ema10 => "ema10",
            Column::Ema21 => "ema21",
            Column::MacdDif => "macd_dif",
            Column::MacdDea => "macd_dea",
            Column::MacdHist => "macd_hist",
            Column::Rsi6 => "rsi6",
            Column::Rsi9 => "rsi9",
            Column::Rsi21 => "rsi21",
            Column::KdjJ => "kdj_j",
            Column::KdjK => "kdj_k",
            Column::KdjD => "kdj_d",
            Column::SrsiK => "srsi_k",
            Column::SrsiD => "srsi_d",
            Column::VolMa5 => "vol_ma5",
            Column::VolMa10 => "vol_ma10",
            Column::Atr14 => "atr14",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown indicator column '{s}'"))
    }
}

/// Container for precomputed indicator columns.
///
/// Built by the indicator collaborator, then queried by candle index.
#[derive(Debug, Clone, Default)]
pub struct IndicatorValues {
    series: HashMap<Column, Vec<f64>>,
}

impl IndicatorValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: Column, values: Vec<f64>) {
        self.series.insert(column, values);
    }

    /// Get the indicator value at a specific candle index.
    pub fn get(&self, column: Column, index: usize) -> Option<f64> {
        self.series
            .get(&column)
            .and_then(|v| v.get(index).copied())
    }

    /// Get the full column.
    pub fn get_series(&self, column: Column) -> Option<&[f64]> {
        self.series.get(&column).map(|v| v.as_slice())
    }

    pub fn contains(&self, column: Column) -> bool {
        self.series.contains_key(&column)
    }

    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.series.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Structural problems with a candle series.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("{timeframe}: timestamps not strictly increasing at index {index}")]
    Unordered { timeframe: Timeframe, index: usize },

    #[error("{timeframe}: column {column} has {actual} values, expected {expected}")]
    ColumnLength {
        timeframe: Timeframe,
        column: Column,
        expected: usize,
        actual: usize,
    },
}

/// Candles of one timeframe plus their indicator columns.
///
/// Invariants checked at construction: timestamps strictly increase and every
/// column has exactly one value per candle.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    timeframe: Timeframe,
    candles: Vec<Candle>,
    indicators: IndicatorValues,
}

impl CandleSeries {
    pub fn new(
        timeframe: Timeframe,
        candles: Vec<Candle>,
        indicators: IndicatorValues,
    ) -> Result<Self, SeriesError> {
        if let Some(index) = candles
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(SeriesError::Unordered {
                timeframe,
                index: index + 1,
            });
        }
        for column in indicators.columns() {
            let actual = indicators.get_series(column).map_or(0, |s| s.len());
            if actual != candles.len() {
                return Err(SeriesError::ColumnLength {
                    timeframe,
                    column,
                    expected: candles.len(),
                    actual,
                });
            }
        }
        Ok(Self {
            timeframe,
            candles,
            indicators,
        })
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn candle(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn timestamp(&self, index: usize) -> Option<DateTime<Utc>> {
        self.candles.get(index).map(|c| c.timestamp)
    }

    pub fn indicators(&self) -> &IndicatorValues {
        &self.indicators
    }

    pub fn column(&self, column: Column) -> Option<&[f64]> {
        self.indicators.get_series(column)
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.indicators.contains(column)
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Index of the newest confirmed candle.
    pub fn latest_closed(&self) -> Option<usize> {
        self.candles.iter().rposition(|c| c.confirmed)
    }

    /// Exact position of the candle opened at `timestamp`.
    pub fn position_of(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.candles
            .binary_search_by(|c| c.timestamp.cmp(&timestamp))
            .ok()
    }
}
