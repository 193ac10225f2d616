//! Signal direction and the sign conventions it fixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional intent of an impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

/// Orientation of a crossing: `Up` is negative → positive difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossDirection {
    Up,
    Down,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Long, Direction::Short];

    pub fn cross(self) -> CrossDirection {
        match self {
            Direction::Long => CrossDirection::Up,
            Direction::Short => CrossDirection::Down,
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// Signed distance by which `a` is ahead of `b` in this direction.
    ///
    /// Long: `a - b`. Short: `b - a`. Every ordering and headroom rule is
    /// written in terms of this so each rule exists once for both sides.
    pub fn lead(self, a: f64, b: f64) -> f64 {
        self.sign() * (a - b)
    }

    /// Strict ordering `a > b > c` (long) or `a < b < c` (short).
    pub fn ordered(self, a: f64, b: f64, c: f64) -> bool {
        self.lead(a, b) > 0.0 && self.lead(b, c) > 0.0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold that differs between long and short.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sided<T> {
    pub long: T,
    pub short: T,
}

impl<T: Copy> Sided<T> {
    pub const fn new(long: T, short: T) -> Self {
        Self { long, short }
    }

    pub fn get(&self, direction: Direction) -> T {
        match direction {
            Direction::Long => self.long,
            Direction::Short => self.short,
        }
    }
}
