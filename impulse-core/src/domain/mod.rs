//! Domain types for the impulse pipeline

pub mod candle;
pub mod direction;
pub mod timeframe;

pub use candle::{Candle, CandleSeries, Column, IndicatorValues, SeriesError};
pub use direction::{CrossDirection, Direction, Sided};
pub use timeframe::{MarketSnapshot, SnapshotError, Timeframe};
