//! Persisted start detector state.
//!
//! Positions are stored as candle timestamps: the exchange window slides by
//! one candle per period, so an absolute index saved in one cycle points at a
//! different candle in the next. The detector re-resolves timestamps against
//! the current base series every cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Direction;

/// Detector phase for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// A fast/slow trigger closed at `trigger_time`; waiting for the
    /// medium/slow confirmation.
    Waiting { trigger_time: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DirectionState {
    #[serde(default)]
    pub phase: Phase,
    /// Confirming candle of the last emitted start in this direction.
    #[serde(default)]
    pub last_signal_time: Option<DateTime<Utc>>,
}

impl DirectionState {
    pub fn is_waiting(&self) -> bool {
        matches!(self.phase, Phase::Waiting { .. })
    }
}

/// Both directions' state; long and short run independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorState {
    #[serde(default)]
    pub long: DirectionState,
    #[serde(default)]
    pub short: DirectionState,
}

impl DetectorState {
    pub fn slot(&self, direction: Direction) -> &DirectionState {
        match direction {
            Direction::Long => &self.long,
            Direction::Short => &self.short,
        }
    }

    pub fn slot_mut(&mut self, direction: Direction) -> &mut DirectionState {
        match direction {
            Direction::Long => &mut self.long,
            Direction::Short => &mut self.short,
        }
    }
}
