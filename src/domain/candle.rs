//! Intraday OHLCV candle representation.

use chrono::{NaiveDateTime, Timelike};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Fold a later candle into this one: keep open, widen the range,
    /// take the later close and add the volume.
    pub fn absorb(&mut self, later: &Candle) {
        self.high = self.high.max(later.high);
        self.low = self.low.min(later.low);
        self.close = later.close;
        self.volume += later.volume;
    }
}

/// Candle interval understood by the data port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    FiveMinute,
    FifteenMinute,
}

impl Interval {
    pub fn minutes(self) -> u32 {
        match self {
            Interval::FiveMinute => 5,
            Interval::FifteenMinute => 15,
        }
    }

    /// Start of the clock-aligned bucket of this interval containing `ts`.
    pub fn bucket_start(self, ts: NaiveDateTime) -> NaiveDateTime {
        let minutes = self.minutes();
        let minute = ts.minute() - ts.minute() % minutes;
        ts.date()
            .and_hms_opt(ts.hour(), minute, 0)
            .unwrap_or(ts)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.minutes())
    }
}
