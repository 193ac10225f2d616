//! Condition 11: looser 30m confirmation used after a timeframe transfer.
//!
//! The long and short rules are not mirror images of each other, so each
//! side is written out on its own.

use crate::domain::{Column, Direction, Sided, Timeframe};

use super::{columns, Check, Condition, ConditionError, ConditionId, Diagnostic, EvalContext};

pub const MIN_HISTORY: usize = 6;
/// Prior candles searched for the RSI setup.
pub const RSI_PRIOR_WINDOW: usize = 5;
/// Prior candles searched for the opposite KDJ ordering.
pub const KDJ_PRIOR_WINDOW_LONG: usize = 12;
pub const KDJ_PRIOR_WINDOW_SHORT: usize = 11;

/// RSI21 bound for the fully ordered RSI clause.
pub const RSI21_ORDERED_BOUND: Sided<f64> = Sided::new(63.0, 37.0);
/// RSI21 bound for the fallback clause, where RSI9 may lag RSI21.
pub const RSI21_FALLBACK_BOUND: Sided<f64> = Sided::new(58.0, 48.0);
pub const RSI9_FALLBACK_SLACK: Sided<f64> = Sided::new(5.0, 6.0);

/// Prior-candle bunching: RSI6 within this of RSI9.
pub const RSI6_PRIOR_GAP: Sided<f64> = Sided::new(2.0, 1.0);
/// Prior-candle bunching: RSI9 within this of RSI21.
pub const RSI9_PRIOR_GAP: Sided<f64> = Sided::new(2.5, 1.0);

pub const KDJ_D_LIMIT: Sided<f64> = Sided::new(82.0, 30.0);
/// Unordered KDJ still passes when |J - K| and |K - D| are this tight.
pub const KDJ_JK_BUNCH: Sided<f64> = Sided::new(10.0, 8.0);
pub const KDJ_KD_BUNCH: Sided<f64> = Sided::new(4.0, 5.0);

pub const SRSI_D_LIMIT: Sided<f64> = Sided::new(89.5, 23.0);
/// Stoch-RSI K may trail D by this much.
pub const SRSI_SLACK: Sided<f64> = Sided::new(7.0, 8.0);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    r6: f64,
    r9: f64,
    r21: f64,
    j: f64,
    k: f64,
    d: f64,
    sk: f64,
    sd: f64,
}

fn rsi_now(dir: Direction, p: &Point) -> bool {
    let Point { r6, r9, r21, .. } = *p;
    let ordered = RSI21_ORDERED_BOUND.get(dir);
    let fallback = RSI21_FALLBACK_BOUND.get(dir);
    let slack = RSI9_FALLBACK_SLACK.get(dir);
    match dir {
        Direction::Long => {
            (r21 < ordered && r6 > r9 && r9 > r21)
                || (r21 < fallback && r6 > r9 && r9 >= r21 - slack)
        }
        Direction::Short => {
            (r21 > ordered && r6 < r9 && r9 < r21)
                || (r21 > ordered && r6 <= r9 && r9 < r21)
                || (r21 > fallback && r6 < r9 && r9 <= r21 + slack)
        }
    }
}

/// RSI lines were bunched together on a prior candle.
fn rsi_prior(dir: Direction, r6: f64, r9: f64, r21: f64) -> bool {
    let gap6 = RSI6_PRIOR_GAP.get(dir);
    let gap9 = RSI9_PRIOR_GAP.get(dir);
    match dir {
        Direction::Long => r6 <= r9 + gap6 && r9 <= r21 + gap9,
        Direction::Short => r6 >= r9 - gap6 && r9 >= r21 - gap9,
    }
}

fn kdj_now(dir: Direction, p: &Point) -> bool {
    let Point { j, k, d, .. } = *p;
    let bunched = (j - k).abs() <= KDJ_JK_BUNCH.get(dir) && (k - d).abs() <= KDJ_KD_BUNCH.get(dir);
    dir.lead(KDJ_D_LIMIT.get(dir), d) > 0.0 && (dir.ordered(j, k, d) || bunched)
}

fn srsi_now(dir: Direction, p: &Point) -> bool {
    dir.lead(SRSI_D_LIMIT.get(dir), p.sd) > 0.0 && dir.lead(p.sk, p.sd) >= -SRSI_SLACK.get(dir)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RelaxedConfirmation;

impl Condition for RelaxedConfirmation {
    fn id(&self) -> ConditionId {
        ConditionId::RelaxedConfirmation
    }

    fn required_columns(&self) -> Vec<(Timeframe, Column)> {
        columns(
            Timeframe::M30,
            &[
                Column::Rsi6,
                Column::Rsi9,
                Column::Rsi21,
                Column::KdjJ,
                Column::KdjK,
                Column::KdjD,
                Column::SrsiK,
                Column::SrsiD,
            ],
        )
    }

    fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Check, ConditionError> {
        let dir = ctx.direction;
        let (frame, i) = ctx.project(Timeframe::M30, ctx.start_index)?;
        frame.require_history(i, MIN_HISTORY)?;

        let p = Point {
            r6: frame.value(Column::Rsi6, i)?,
            r9: frame.value(Column::Rsi9, i)?,
            r21: frame.value(Column::Rsi21, i)?,
            j: frame.value(Column::KdjJ, i)?,
            k: frame.value(Column::KdjK, i)?,
            d: frame.value(Column::KdjD, i)?,
            sk: frame.value(Column::SrsiK, i)?,
            sd: frame.value(Column::SrsiD, i)?,
        };
        let diag = Diagnostic::new()
            .value("index", i as f64)
            .value("rsi6", p.r6)
            .value("rsi9", p.r9)
            .value("rsi21", p.r21)
            .value("kdj_j", p.j)
            .value("kdj_k", p.k)
            .value("kdj_d", p.d)
            .value("srsi_k", p.sk)
            .value("srsi_d", p.sd);

        let r6 = frame.upto(Column::Rsi6, i)?;
        let r9 = frame.upto(Column::Rsi9, i)?;
        let r21 = frame.upto(Column::Rsi21, i)?;
        let rsi_setup = (i.saturating_sub(RSI_PRIOR_WINDOW)..i)
            .any(|b| rsi_prior(dir, r6[b], r9[b], r21[b]));
        if !(rsi_now(dir, &p) && rsi_setup) {
            return Ok(Check::fail(diag, format!("30m relaxed RSI check failed for {dir}")));
        }

        let j = frame.upto(Column::KdjJ, i)?;
        let k = frame.upto(Column::KdjK, i)?;
        let d = frame.upto(Column::KdjD, i)?;
        let (window, opposite) = match dir {
            Direction::Long => (KDJ_PRIOR_WINDOW_LONG, Direction::Short),
            Direction::Short => (KDJ_PRIOR_WINDOW_SHORT, Direction::Long),
        };
        let kdj_setup = (i.saturating_sub(window)..i).any(|b| opposite.ordered(j[b], k[b], d[b]));
        if !(kdj_now(dir, &p) && kdj_setup) {
            return Ok(Check::fail(diag, format!("30m relaxed KDJ check failed for {dir}")));
        }

        if !srsi_now(dir, &p) {
            return Ok(Check::fail(
                diag,
                format!("30m relaxed Stoch-RSI check failed for {dir}"),
            ));
        }
        Ok(Check::pass(diag))
    }
}
