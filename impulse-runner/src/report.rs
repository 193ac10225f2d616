//! Plain-text signal report: per-condition summary plus price levels.

use impulse_core::conditions::{ConditionId, Outcome};
use impulse_core::domain::{CandleSeries, Column, MarketSnapshot, Timeframe};
use impulse_core::Verdict;

/// Support/resistance levels around the newest closed base candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceLevels {
    /// Lowest low over the swing window.
    pub swing_support: f64,
    /// Highest high over the swing window.
    pub swing_resistance: f64,
    /// `close - multiplier * atr14`.
    pub atr_support: f64,
    /// `close + multiplier * atr14`.
    pub atr_resistance: f64,
}

impl PriceLevels {
    /// Levels for the `lookback` closed candles ending at the newest closed
    /// candle of `base`. A forming candle is left out.
    ///
    /// `None` when no candle is closed or the newest closed candle has no
    /// finite ATR14 value.
    pub fn compute(base: &CandleSeries, lookback: usize, atr_multiplier: f64) -> Option<Self> {
        let last = base.latest_closed()?;
        let end = last + 1;
        let window = &base.candles()[end.saturating_sub(lookback.max(1))..end];
        let swing_support = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
        let swing_resistance = window
            .iter()
            .map(|c| c.high)
            .fold(f64::NEG_INFINITY, f64::max);

        let close = base.candles()[last].close;
        let atr = base
            .indicators()
            .get(Column::Atr14, last)
            .filter(|v| v.is_finite())?;
        Some(Self {
            swing_support,
            swing_resistance,
            atr_support: close - atr_multiplier * atr,
            atr_resistance: close + atr_multiplier * atr,
        })
    }
}

/// Report layout knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportOptions {
    pub swing_lookback: usize,
    pub atr_multiplier: f64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            swing_lookback: 20,
            atr_multiplier: 1.0,
        }
    }
}

fn status(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Passed { .. } => "PASS",
        Outcome::Failed { .. } => "FAIL",
        Outcome::Errored { .. } => "ERROR",
        Outcome::Skipped { .. } => "SKIP",
        Outcome::Disabled => "OFF",
    }
}

/// Render `verdict` for a human reader.
pub fn render_report(verdict: &Verdict, snapshot: &MarketSnapshot, options: &ReportOptions) -> String {
    let mut report = String::new();
    let direction = verdict
        .direction
        .map_or("?".to_string(), |d| d.as_str().to_uppercase());
    let impulse = verdict.impulse_timeframe.map_or("-", |tf| tf.label());
    report.push_str(&format!("Impulse {direction} | impulse timeframe: {impulse}\n"));
    report.push_str(&format!("Summary: {}\n", verdict.summary));

    let base = snapshot.get(Timeframe::BASE);
    if let Some(candle) = base.and_then(|b| b.candles().last()) {
        report.push_str(&format!("Price: {:.2}\n", candle.close));
    }
    if let Some(start) = verdict.start_time {
        report.push_str(&format!("Start candle: {}\n", start.to_rfc3339()));
    }

    report.push_str("\nConditions (1..11):\n");
    for id in ConditionId::ALL {
        let Some(result) = verdict.condition(id) else {
            continue;
        };
        report.push_str(&format!(
            "  [{}] {:>2} {}",
            status(&result.outcome),
            id.number(),
            id.label()
        ));
        match result.reason() {
            Some(reason) if !result.passed() => report.push_str(&format!(": {reason}\n")),
            _ => report.push('\n'),
        }
    }

    if let Some(levels) =
        base.and_then(|b| PriceLevels::compute(b, options.swing_lookback, options.atr_multiplier))
    {
        report.push_str("\nSupport / resistance:\n");
        report.push_str(&format!(
            "  swings({}):  support ~ {:.2} | resistance ~ {:.2}\n",
            options.swing_lookback, levels.swing_support, levels.swing_resistance
        ));
        report.push_str(&format!(
            "  ATR14 x{}:  support ~ {:.2} | resistance ~ {:.2}\n",
            options.atr_multiplier, levels.atr_support, levels.atr_resistance
        ));
    }
    report
}
