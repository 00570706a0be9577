//! Entry and exit signal detection.
//!
//! Entry: a run of candles closing inside the VWAP/EMA band, then a close
//! below both lines. Exit: a 15-minute higher high after a run of lower
//! highs since entry (reverse swing).

use crate::domain::candle::Candle;
use crate::domain::indicator::IndicatorUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    None,
    EntrySell,
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Consecutive in-band candles required before a breakdown counts.
    pub consolidation_window: usize,
    /// Points the band is widened by on each side.
    pub band_tolerance: f64,
    /// Lower 15-minute highs required before a higher high is a reverse swing.
    pub min_lower_highs: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            consolidation_window: 3,
            band_tolerance: 0.0,
            min_lower_highs: 1,
        }
    }
}

pub fn in_consolidation_band(close: f64, vwap: f64, ema: f64, tolerance: f64) -> bool {
    let lower = vwap.min(ema) - tolerance;
    let upper = vwap.max(ema) + tolerance;
    close >= lower && close <= upper
}

pub fn breaks_below_both(close: f64, vwap: f64, ema: f64) -> bool {
    close < vwap && close < ema
}

/// Run of consecutive in-band closes.
#[derive(Debug, Clone)]
pub struct ConsolidationWindow {
    required: usize,
    streak: usize,
}

impl ConsolidationWindow {
    pub fn new(required: usize) -> Self {
        ConsolidationWindow {
            required,
            streak: 0,
        }
    }

    pub fn extend(&mut self) {
        self.streak += 1;
    }

    pub fn is_ready(&self) -> bool {
        self.streak >= self.required
    }

    pub fn streak(&self) -> usize {
        self.streak
    }

    pub fn reset(&mut self) {
        self.streak = 0;
    }
}

/// Sequence of completed 15-minute highs since entry.
#[derive(Debug, Clone)]
pub struct SwingTracker {
    min_lower_highs: usize,
    prev_high: Option<f64>,
    lower_highs: usize,
}

impl SwingTracker {
    pub fn new(min_lower_highs: usize) -> Self {
        SwingTracker {
            min_lower_highs,
            prev_high: None,
            lower_highs: 0,
        }
    }

    /// Start a fresh sequence, optionally anchored on a prior bar's high.
    pub fn reset(&mut self, anchor: Option<f64>) {
        self.prev_high = anchor;
        self.lower_highs = 0;
    }

    pub fn lower_highs(&self) -> usize {
        self.lower_highs
    }

    /// Record a completed bar's high; true when it is a reverse swing.
    pub fn observe(&mut self, high: f64) -> bool {
        let Some(prev) = self.prev_high.replace(high) else {
            return false;
        };
        if high < prev {
            self.lower_highs += 1;
            false
        } else if high > prev {
            let downtrend = self.lower_highs >= self.min_lower_highs;
            self.lower_highs = 0;
            downtrend
        } else {
            false
        }
    }
}

pub struct SignalDetector {
    config: DetectorConfig,
    window: ConsolidationWindow,
    swing: SwingTracker,
    last_bar_high: Option<f64>,
    position_open: bool,
}

impl SignalDetector {
    pub fn new(config: DetectorConfig) -> Self {
        SignalDetector {
            window: ConsolidationWindow::new(config.consolidation_window),
            swing: SwingTracker::new(config.min_lower_highs),
            config,
            last_bar_high: None,
            position_open: false,
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn window(&self) -> &ConsolidationWindow {
        &self.window
    }

    pub fn is_position_open(&self) -> bool {
        self.position_open
    }

    /// Produce the signal for `candle`, given the indicator update for it.
    pub fn evaluate(&mut self, candle: &Candle, update: &IndicatorUpdate) -> Signal {
        let completed_high = update.completed_bar.as_ref().map(|bar| bar.high);

        if self.position_open {
            let swing = completed_high.is_some_and(|high| self.swing.observe(high));
            if let Some(high) = completed_high {
                self.last_bar_high = Some(high);
            }
            return if swing { Signal::Exit } else { Signal::None };
        }

        if let Some(high) = completed_high {
            self.last_bar_high = Some(high);
        }

        let snapshot = &update.snapshot;
        let Some(ema) = snapshot.ema15 else {
            self.window.reset();
            return Signal::None;
        };

        if breaks_below_both(candle.close, snapshot.vwap, ema) {
            let ready = self.window.is_ready();
            self.window.reset();
            if ready {
                return Signal::EntrySell;
            }
        } else if in_consolidation_band(candle.close, snapshot.vwap, ema, self.config.band_tolerance)
        {
            self.window.extend();
        } else {
            self.window.reset();
        }
        Signal::None
    }

    /// A position was opened on the last evaluated candle.
    pub fn on_position_opened(&mut self) {
        self.position_open = true;
        self.window.reset();
        self.swing.reset(self.last_bar_high);
    }

    /// The open position was closed.
    pub fn on_position_closed(&mut self) {
        self.position_open = false;
        self.window.reset();
        self.swing.reset(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::IndicatorSnapshot;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 3)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
            + Duration::minutes(5 * i as i64)
    }

    fn candle(i: usize, high: f64, close: f64) -> Candle {
        Candle {
            timestamp: ts(i),
            open: close,
            high,
            low: close.min(high),
            close,
            volume: 100,
        }
    }

    fn update(i: usize, vwap: f64, ema: Option<f64>, bar_high: Option<f64>) -> IndicatorUpdate {
        IndicatorUpdate {
            snapshot: IndicatorSnapshot {
                timestamp: ts(i),
                vwap,
                ema15: ema,
            },
            completed_bar: bar_high.map(|h| candle(i, h, h)),
        }
    }

    fn feed_consolidation(detector: &mut SignalDetector, closes: &[f64]) {
        for (i, &close) in closes.iter().enumerate() {
            let signal = detector.evaluate(&candle(i, close, close), &update(i, 100.0, Some(98.0), None));
            assert_eq!(signal, Signal::None);
        }
    }

    #[test]
    fn band_predicates() {
        assert!(in_consolidation_band(99.0, 100.0, 98.0, 0.0));
        assert!(in_consolidation_band(98.0, 100.0, 98.0, 0.0));
        assert!(in_consolidation_band(100.0, 98.0, 100.0, 0.0));
        assert!(!in_consolidation_band(97.9, 100.0, 98.0, 0.0));
        assert!(in_consolidation_band(97.9, 100.0, 98.0, 0.5));
        assert!(breaks_below_both(97.0, 100.0, 98.0));
        assert!(!breaks_below_both(98.0, 100.0, 98.0));
    }

    #[test]
    fn entry_after_consolidation_breakdown() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        feed_consolidation(&mut d, &[99.0, 99.5, 98.5]);
        assert!(d.window().is_ready());
        let signal = d.evaluate(&candle(3, 97.0, 97.0), &update(3, 100.0, Some(98.0), None));
        assert_eq!(signal, Signal::EntrySell);
        assert_eq!(d.window().streak(), 0);
    }

    #[test]
    fn gap_below_without_consolidation_is_ignored() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        feed_consolidation(&mut d, &[99.0, 99.0]);
        let signal = d.evaluate(&candle(2, 95.0, 95.0), &update(2, 100.0, Some(98.0), None));
        assert_eq!(signal, Signal::None);
        // The failed breakdown consumed the window.
        let signal = d.evaluate(&candle(3, 94.0, 94.0), &update(3, 100.0, Some(98.0), None));
        assert_eq!(signal, Signal::None);
    }

    #[test]
    fn candle_outside_band_resets_window() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        feed_consolidation(&mut d, &[99.0, 99.0, 101.0, 99.0, 99.0]);
        assert_eq!(d.window().streak(), 2);
        let signal = d.evaluate(&candle(5, 97.0, 97.0), &update(5, 100.0, Some(98.0), None));
        assert_eq!(signal, Signal::None);
    }

    #[test]
    fn no_signal_before_ema_is_seeded() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        for i in 0..3 {
            d.evaluate(&candle(i, 99.0, 99.0), &update(i, 100.0, None, None));
        }
        assert_eq!(d.window().streak(), 0);
    }

    #[test]
    fn no_entry_while_position_open() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        d.on_position_opened();
        for i in 0..3 {
            d.evaluate(&candle(i, 99.0, 99.0), &update(i, 100.0, Some(98.0), None));
        }
        let signal = d.evaluate(&candle(3, 97.0, 97.0), &update(3, 100.0, Some(98.0), None));
        assert_eq!(signal, Signal::None);
        assert!(d.is_position_open());
    }

    #[test]
    fn reverse_swing_after_lower_high() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        d.evaluate(&candle(0, 99.0, 99.0), &update(0, 100.0, Some(98.0), Some(99.0)));
        d.on_position_opened();

        let s = d.evaluate(&candle(1, 60.0, 55.0), &update(1, 100.0, Some(98.0), Some(60.0)));
        assert_eq!(s, Signal::None);
        let s = d.evaluate(&candle(2, 61.0, 58.0), &update(2, 100.0, Some(98.0), None));
        assert_eq!(s, Signal::None);
        let s = d.evaluate(&candle(3, 65.0, 63.0), &update(3, 100.0, Some(98.0), Some(65.0)));
        assert_eq!(s, Signal::Exit);
    }

    #[test]
    fn higher_high_without_downtrend_is_not_a_swing() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        d.evaluate(&candle(0, 90.0, 90.0), &update(0, 100.0, Some(98.0), Some(90.0)));
        d.on_position_opened();
        let s = d.evaluate(&candle(1, 95.0, 95.0), &update(1, 100.0, Some(98.0), Some(95.0)));
        assert_eq!(s, Signal::None);
    }

    #[test]
    fn zero_lower_highs_exits_on_any_higher_high() {
        let config = DetectorConfig {
            min_lower_highs: 0,
            ..Default::default()
        };
        let mut d = SignalDetector::new(config);
        d.evaluate(&candle(0, 90.0, 90.0), &update(0, 100.0, Some(98.0), Some(90.0)));
        d.on_position_opened();
        let s = d.evaluate(&candle(1, 95.0, 95.0), &update(1, 100.0, Some(98.0), Some(95.0)));
        assert_eq!(s, Signal::Exit);
    }

    #[test]
    fn exit_only_on_bar_completion() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        d.evaluate(&candle(0, 99.0, 99.0), &update(0, 100.0, Some(98.0), Some(99.0)));
        d.on_position_opened();
        d.evaluate(&candle(1, 60.0, 55.0), &update(1, 100.0, Some(98.0), Some(60.0)));
        // A 5-minute candle above the last bar high is not a signal by itself.
        let s = d.evaluate(&candle(2, 80.0, 75.0), &update(2, 100.0, Some(98.0), None));
        assert_eq!(s, Signal::None);
    }

    #[test]
    fn swing_tracker_counts_and_resets() {
        let mut t = SwingTracker::new(2);
        t.reset(Some(100.0));
        assert!(!t.observe(95.0));
        assert!(!t.observe(95.0));
        assert_eq!(t.lower_highs(), 1);
        assert!(!t.observe(97.0));
        assert_eq!(t.lower_highs(), 0);
        assert!(!t.observe(90.0));
        assert!(!t.observe(85.0));
        assert!(t.observe(86.0));
    }

    #[test]
    fn position_closed_resets_state() {
        let mut d = SignalDetector::new(DetectorConfig::default());
        d.on_position_opened();
        d.on_position_closed();
        assert!(!d.is_position_open());
        feed_consolidation(&mut d, &[99.0, 99.0, 99.0]);
        let signal = d.evaluate(&candle(3, 97.0, 97.0), &update(3, 100.0, Some(98.0), None));
        assert_eq!(signal, Signal::EntrySell);
    }
}
