//! Series cross detection.
//!
//! This module is the only place where "offset from the newest element" is
//! used. Everything else in the crate works in absolute positions (0 = oldest)
//! and converts with [`cross_position`] at this boundary.

use crate::domain::CrossDirection;

/// Absolute floor of the touch band.
pub const CROSS_ABS_EPSILON: f64 = 1e-9;

/// Relative width of the touch band, as a fraction of the larger magnitude.
pub const CROSS_REL_EPSILON: f64 = 1e-6;

/// What happened between candle `i-1` and candle `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossKind {
    /// Strict sign change in the requested orientation.
    Cross,
    /// One of the two endpoints is within the touch band.
    Touch,
    /// No crossing (same sign, wrong orientation, or unusable values).
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Below,
    Above,
    Touch,
}

fn side(a: f64, b: f64) -> Option<Side> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let diff = a - b;
    let epsilon = CROSS_ABS_EPSILON.max(CROSS_REL_EPSILON * a.abs().max(b.abs()));
    Some(if diff.abs() <= epsilon {
        Side::Touch
    } else if diff > 0.0 {
        Side::Above
    } else {
        Side::Below
    })
}

/// Classify the transition into candle `i` of `a` relative to `b`.
pub fn classify_cross(a: &[f64], b: &[f64], i: usize, direction: CrossDirection) -> CrossKind {
    let n = a.len().min(b.len());
    if i == 0 || i >= n {
        return CrossKind::None;
    }
    let (Some(prev), Some(cur)) = (side(a[i - 1], b[i - 1]), side(a[i], b[i])) else {
        return CrossKind::None;
    };
    match (prev, cur, direction) {
        (Side::Touch, _, _) | (_, Side::Touch, _) => CrossKind::Touch,
        (Side::Below, Side::Above, CrossDirection::Up) => CrossKind::Cross,
        (Side::Above, Side::Below, CrossDirection::Down) => CrossKind::Cross,
        _ => CrossKind::None,
    }
}

/// Most recent crossing of `a` over `b` within `lookback` candles.
///
/// Returns the offset counted back from the newest element (0 = the newest
/// candle itself closed the cross). Offsets `0..=lookback` are scanned.
/// Touches are skipped and the scan continues, so a touch adjacent to a real
/// cross never hides it.
pub fn find_cross(
    a: &[f64],
    b: &[f64],
    direction: CrossDirection,
    lookback: usize,
) -> Option<usize> {
    let n = a.len().min(b.len());
    (0..=lookback)
        .take_while(|offset| offset + 1 < n)
        .find(|&offset| classify_cross(a, b, n - 1 - offset, direction) == CrossKind::Cross)
}

/// Absolute position of a cross found at `offset` in a slice of length `len`.
pub fn cross_position(len: usize, offset: usize) -> usize {
    len - 1 - offset
}

/// Offset from the newest element of a slice of length `len`.
pub fn cross_offset(len: usize, position: usize) -> usize {
    len - 1 - position
}
