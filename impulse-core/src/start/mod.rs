//! Start detection (condition 1), the one stateful component.
//!
//! Per direction, a two-phase machine over the base timeframe:
//!
//! - `idle`: look for a fresh fast/slow EMA cross among recent closed candles.
//!   Finding one moves to `waiting` and the waiting phase is evaluated in the
//!   same cycle.
//! - `waiting`: give up after `timeout_bars` candles; otherwise inspect only
//!   the newest closed candle for the medium/slow EMA cross. A confirmed cross
//!   emits the start index once; the same confirming candle is never emitted
//!   twice.

pub mod state;

pub use state::{DetectorState, DirectionState, Phase};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::StartConfig;
use crate::cross::{classify_cross, cross_position, find_cross, CrossKind};
use crate::domain::{CandleSeries, Column, Direction};

pub const FAST_EMA: Column = Column::Ema5;
pub const MEDIUM_EMA: Column = Column::Ema10;
pub const SLOW_EMA: Column = Column::Ema21;

/// Fewer closed base candles than this is "insufficient data".
pub const MIN_CLOSED_CANDLES: usize = 3;

/// Data problems that prevent start detection altogether.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("insufficient data: base series lacks column {0}")]
    MissingColumn(Column),

    #[error("insufficient data: {closed} closed base candles, need {MIN_CLOSED_CANDLES}")]
    InsufficientData { closed: usize },
}

/// Result of one detector step for one direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StartOutcome {
    /// Medium/slow cross confirmed on `start_index`; emitted for the first time.
    Confirmed {
        start_index: usize,
        trigger_index: usize,
    },
    /// Trigger seen, confirmation not yet. `touch` marks a near-equal
    /// medium/slow on the newest candle.
    Waiting {
        trigger_index: usize,
        elapsed: usize,
        touch: bool,
    },
    /// No fast/slow trigger within the lookback.
    NoTrigger,
    /// No confirmation within the window; detector returned to idle.
    TimedOut {
        trigger_time: DateTime<Utc>,
        elapsed: Option<usize>,
    },
    /// Confirmation on a candle that was already emitted.
    Duplicate { start_index: usize },
}

impl StartOutcome {
    pub fn start_index(&self) -> Option<usize> {
        match self {
            StartOutcome::Confirmed { start_index, .. } => Some(*start_index),
            _ => None,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, StartOutcome::Confirmed { .. })
    }

    /// Human-readable reason.
    pub fn describe(&self) -> String {
        match self {
            StartOutcome::Confirmed {
                start_index,
                trigger_index,
            } => format!(
                "start confirmed at {start_index} (fast/slow trigger at {trigger_index})"
            ),
            StartOutcome::Waiting {
                trigger_index,
                elapsed,
                touch: true,
            } => format!(
                "waiting: medium/slow EMA touch, not yet a cross ({elapsed} candles since trigger at {trigger_index})"
            ),
            StartOutcome::Waiting {
                trigger_index,
                elapsed,
                touch: false,
            } => format!(
                "waiting: no medium/slow EMA cross yet ({elapsed} candles since trigger at {trigger_index})"
            ),
            StartOutcome::NoTrigger => "no fast/slow EMA cross".to_string(),
            StartOutcome::TimedOut {
                trigger_time,
                elapsed: Some(elapsed),
            } => format!(
                "timeout: no confirming cross within window ({elapsed} candles since trigger at {trigger_time})"
            ),
            StartOutcome::TimedOut {
                trigger_time,
                elapsed: None,
            } => format!("timeout: trigger at {trigger_time} is no longer in the series"),
            StartOutcome::Duplicate { start_index } => {
                format!("duplicate: start at {start_index} already signaled")
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StartDetector {
    config: StartConfig,
}

impl StartDetector {
    pub fn new(config: StartConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StartConfig {
        &self.config
    }

    /// Advance the `direction` slot of `state` against `base`.
    ///
    /// Fails only on data problems; every trading outcome is a `StartOutcome`.
    /// On error, `state` is left untouched.
    pub fn detect(
        &self,
        base: &CandleSeries,
        direction: Direction,
        state: &mut DetectorState,
    ) -> Result<StartOutcome, StartError> {
        let fast = column(base, FAST_EMA)?;
        let medium = column(base, MEDIUM_EMA)?;
        let slow = column(base, SLOW_EMA)?;

        let latest = base
            .latest_closed()
            .ok_or(StartError::InsufficientData { closed: 0 })?;
        if latest + 1 < MIN_CLOSED_CANDLES {
            return Err(StartError::InsufficientData { closed: latest + 1 });
        }
        let (fast, medium, slow) = (&fast[..=latest], &medium[..=latest], &slow[..=latest]);
        let timestamp = |i: usize| base.candles()[i].timestamp;

        let slot = state.slot_mut(direction);

        let trigger_time = match slot.phase {
            Phase::Waiting { trigger_time } => trigger_time,
            Phase::Idle => {
                let Some(offset) =
                    find_cross(fast, slow, direction.cross(), self.config.trigger_lookback)
                else {
                    return Ok(StartOutcome::NoTrigger);
                };
                let trigger_time = timestamp(cross_position(fast.len(), offset));
                debug!(%direction, %trigger_time, "fast/slow trigger, waiting for confirmation");
                trigger_time
            }
        };

        let elapsed = base
            .position_of(trigger_time)
            .and_then(|trigger| latest.checked_sub(trigger).map(|e| (trigger, e)));
        let Some((trigger_index, elapsed)) = elapsed else {
            slot.phase = Phase::Idle;
            debug!(%direction, %trigger_time, "trigger left the series, back to idle");
            return Ok(StartOutcome::TimedOut {
                trigger_time,
                elapsed: None,
            });
        };

        if elapsed >= self.config.timeout_bars {
            slot.phase = Phase::Idle;
            debug!(%direction, elapsed, "confirmation window expired, back to idle");
            return Ok(StartOutcome::TimedOut {
                trigger_time,
                elapsed: Some(elapsed),
            });
        }

        slot.phase = Phase::Waiting { trigger_time };
        match classify_cross(medium, slow, latest, direction.cross()) {
            CrossKind::Touch => Ok(StartOutcome::Waiting {
                trigger_index,
                elapsed,
                touch: true,
            }),
            CrossKind::None => Ok(StartOutcome::Waiting {
                trigger_index,
                elapsed,
                touch: false,
            }),
            CrossKind::Cross => {
                let confirm_time = timestamp(latest);
                slot.phase = Phase::Idle;
                if slot.last_signal_time == Some(confirm_time) {
                    debug!(%direction, start_index = latest, "duplicate confirmation suppressed");
                    return Ok(StartOutcome::Duplicate {
                        start_index: latest,
                    });
                }
                slot.last_signal_time = Some(confirm_time);
                debug!(%direction, start_index = latest, "start confirmed");
                Ok(StartOutcome::Confirmed {
                    start_index: latest,
                    trigger_index,
                })
            }
        }
    }
}

fn column(base: &CandleSeries, column: Column) -> Result<&[f64], StartError> {
    base.column(column).ok_or(StartError::MissingColumn(column))
}

/// Pick the direction whose confirmed start is the more recent one.
///
/// Both confirmed: larger start index wins, ties go to long.
pub fn resolve_direction(long: &StartOutcome, short: &StartOutcome) -> Option<(Direction, usize)> {
    match (long.start_index(), short.start_index()) {
        (Some(l), Some(s)) if s > l => Some((Direction::Short, s)),
        (Some(l), _) => Some((Direction::Long, l)),
        (None, Some(s)) => Some((Direction::Short, s)),
        (None, None) => None,
    }
}
