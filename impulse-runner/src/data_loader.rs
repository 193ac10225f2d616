//! CSV candle loading.
//!
//! One file per timeframe, named after the timeframe label (`5m.csv`,
//! `15m.csv`, `30m.csv`, `1H.csv`, `2H.csv`). Headers:
//!
//! - `timestamp`: candle open time, unix seconds
//! - `open`, `high`, `low`, `close`, `volume`
//! - `confirmed` (optional): `true`/`false`/`1`/`0`, defaults to true
//! - indicator columns by name (`ema5`, `macd_dif`, `rsi6`, ...)
//!
//! Unknown headers are ignored. An empty indicator cell is read as NaN so
//! warm-up rows can be left blank.

use chrono::{DateTime, TimeZone, Utc};
use impulse_core::domain::{
    Candle, CandleSeries, Column, IndicatorValues, MarketSnapshot, SeriesError, Timeframe,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from the CSV loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column '{column}'")]
    MissingHeader { path: PathBuf, column: &'static str },

    #[error("{path} row {row}: invalid {field} value '{value}'")]
    InvalidValue {
        path: PathBuf,
        row: usize,
        field: String,
        value: String,
    },

    #[error("{path}: {source}")]
    Series {
        path: PathBuf,
        #[source]
        source: SeriesError,
    },

    #[error("no candle files found in {0}")]
    NoData(PathBuf),
}

const REQUIRED: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// File name for `timeframe` inside a data directory.
pub fn file_name(timeframe: Timeframe) -> String {
    format!("{}.csv", timeframe.label())
}

/// Load every timeframe file present in `dir`.
///
/// Missing files are skipped; the evaluator reports the gap as missing data.
/// Fails if no file at all is present.
pub fn load_snapshot(dir: &Path) -> Result<MarketSnapshot, LoadError> {
    let mut snapshot = MarketSnapshot::new();
    for timeframe in Timeframe::ALL {
        let path = dir.join(file_name(timeframe));
        if !path.is_file() {
            debug!(path = %path.display(), "no candle file");
            continue;
        }
        snapshot.insert(load_series(&path, timeframe)?);
    }
    if snapshot.timeframes().next().is_none() {
        return Err(LoadError::NoData(dir.to_path_buf()));
    }
    Ok(snapshot)
}

/// Load one timeframe's candles and indicator columns from `path`.
pub fn load_series(path: &Path, timeframe: Timeframe) -> Result<CandleSeries, LoadError> {
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let headers = reader.headers().map_err(csv_error)?.clone();
    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingHeader {
                path: path.to_path_buf(),
                column: name,
            })
    };
    let mut fields = [0usize; REQUIRED.len()];
    for (slot, name) in fields.iter_mut().zip(REQUIRED) {
        *slot = position(name)?;
    }
    let [ts_at, open_at, high_at, low_at, close_at, volume_at] = fields;
    let confirmed_at = headers.iter().position(|h| h == "confirmed");
    let indicator_at: Vec<(Column, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.parse::<Column>().ok().map(|c| (c, i)))
        .collect();

    let mut candles = Vec::new();
    let mut columns: BTreeMap<Column, Vec<f64>> = BTreeMap::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let row = row + 1;
        let cell = |i: usize| record.get(i).unwrap_or("");
        let invalid = |field: &str, value: &str| LoadError::InvalidValue {
            path: path.to_path_buf(),
            row,
            field: field.to_string(),
            value: value.to_string(),
        };
        let number = |field: &'static str, i: usize| {
            cell(i).parse::<f64>().map_err(|_| invalid(field, cell(i)))
        };

        let timestamp = parse_timestamp(cell(ts_at)).ok_or_else(|| invalid("timestamp", cell(ts_at)))?;
        let confirmed = match confirmed_at.map(cell) {
            None | Some("") => true,
            Some(v) => parse_flag(v).ok_or_else(|| invalid("confirmed", v))?,
        };
        candles.push(Candle {
            timestamp,
            open: number("open", open_at)?,
            high: number("high", high_at)?,
            low: number("low", low_at)?,
            close: number("close", close_at)?,
            volume: number("volume", volume_at)?,
            confirmed,
        });

        for &(column, i) in &indicator_at {
            let value = match cell(i) {
                "" => f64::NAN,
                v => v.parse::<f64>().map_err(|_| invalid(column.name(), v))?,
            };
            columns.entry(column).or_default().push(value);
        }
    }

    let mut indicators = IndicatorValues::new();
    for (column, values) in columns {
        indicators.insert(column, values);
    }
    debug!(
        path = %path.display(),
        %timeframe,
        candles = candles.len(),
        columns = indicators.len(),
        "loaded candle series"
    );
    CandleSeries::new(timeframe, candles, indicators).map_err(|source| LoadError::Series {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let secs = s.parse::<i64>().ok()?;
    Utc.timestamp_opt(secs, 0).single()
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn reads_candles_indicators_and_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "5m.csv",
            "timestamp,open,high,low,close,volume,confirmed,ema5,rsi6,note\n\
             1704067200,100,101,99,100.5,1000,true,,55.5,x\n\
             1704067500,100.5,102,100,101.5,1200,0,100.7,58.0,y\n",
        );
        let series = load_series(&path, Timeframe::M5).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.candles()[0].confirmed);
        assert!(!series.candles()[1].confirmed);
        assert_eq!(series.candles()[1].close, 101.5);
        assert_eq!(series.column(Column::Rsi6), Some(&[55.5, 58.0][..]));
        let ema = series.column(Column::Ema5).unwrap();
        assert!(ema[0].is_nan());
        assert_eq!(ema[1], 100.7);
        assert!(!series.has_column(Column::Atr14));
    }

    #[test]
    fn missing_required_header_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "5m.csv", "timestamp,open,high,low,close\n1,1,1,1,1\n");
        let err = load_series(&path, Timeframe::M5).unwrap_err();
        assert!(matches!(err, LoadError::MissingHeader { column: "volume", .. }));
    }

    #[test]
    fn bad_number_names_row_and_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "5m.csv",
            "timestamp,open,high,low,close,volume\n1704067200,1,1,1,abc,1\n",
        );
        let err = load_series(&path, Timeframe::M5).unwrap_err();
        match err {
            LoadError::InvalidValue { row, field, .. } => {
                assert_eq!(row, 1);
                assert_eq!(field, "close");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unordered_timestamps_are_a_series_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "5m.csv",
            "timestamp,open,high,low,close,volume\n\
             1704067500,1,1,1,1,1\n\
             1704067200,1,1,1,1,1\n",
        );
        assert!(matches!(
            load_series(&path, Timeframe::M5),
            Err(LoadError::Series { .. })
        ));
    }

    #[test]
    fn snapshot_skips_missing_timeframes() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "15m.csv",
            "timestamp,open,high,low,close,volume\n1704067200,1,1,1,1,1\n",
        );
        let snapshot = load_snapshot(dir.path()).unwrap();
        assert!(snapshot.get(Timeframe::M15).is_some());
        assert!(snapshot.get(Timeframe::M5).is_none());
    }

    #[test]
    fn empty_directory_has_no_data() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load_snapshot(dir.path()), Err(LoadError::NoData(_))));
    }
}
