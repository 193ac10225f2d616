//! Timeframes and the per-cycle market snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::{CandleSeries, Column};

/// Candle aggregation period, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1H")]
    H1,
    #[serde(rename = "2H")]
    H2,
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
    ];

    /// The fastest timeframe; start detection and most base checks run here.
    pub const BASE: Timeframe = Timeframe::M5;

    /// The confirmation timeframe used by the mid checks.
    pub const MID: Timeframe = Timeframe::M15;

    pub fn label(self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1H",
            Timeframe::H2 => "2H",
        }
    }

    pub fn minutes(self) -> i64 {
        match self {
            Timeframe::M5 => 5,
            Timeframe::M15 => 15,
            Timeframe::M30 => 30,
            Timeframe::H1 => 60,
            Timeframe::H2 => 120,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::ALL
            .iter()
            .copied()
            .find(|tf| tf.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown timeframe '{s}'"))
    }
}

/// Data problems detected before any predicate runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("timeframe {0} missing from snapshot")]
    MissingTimeframe(Timeframe),

    #[error("timeframe {0} has no candles")]
    EmptySeries(Timeframe),

    #[error("{timeframe}: indicator column {column} missing")]
    MissingColumn { timeframe: Timeframe, column: Column },
}

/// All timeframe series for one evaluation cycle.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    series: BTreeMap<Timeframe, CandleSeries>,
}

impl MarketSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a series under its own timeframe, replacing any previous one.
    pub fn insert(&mut self, series: CandleSeries) {
        self.series.insert(series.timeframe(), series);
    }

    pub fn with(mut self, series: CandleSeries) -> Self {
        self.insert(series);
        self
    }

    pub fn get(&self, timeframe: Timeframe) -> Option<&CandleSeries> {
        self.series.get(&timeframe)
    }

    pub fn timeframes(&self) -> impl Iterator<Item = Timeframe> + '_ {
        self.series.keys().copied()
    }

    /// Check that every `(timeframe, column)` pair is present and non-empty.
    pub fn validate<'a, I>(&self, requirements: I) -> Result<(), SnapshotError>
    where
        I: IntoIterator<Item = &'a (Timeframe, Column)>,
    {
        for &(timeframe, column) in requirements {
            let series = self
                .get(timeframe)
                .ok_or(SnapshotError::MissingTimeframe(timeframe))?;
            if series.is_empty() {
                return Err(SnapshotError::EmptySeries(timeframe));
            }
            if !series.has_column(column) {
                return Err(SnapshotError::MissingColumn { timeframe, column });
            }
        }
        Ok(())
    }
}
