//! Indicator engine: session VWAP on 5-minute candles and a 25-period EMA
//! on the derived 15-minute chart.
//!
//! - `IndicatorSnapshot`: VWAP and EMA in effect for one 5-minute candle
//! - `IndicatorUpdate`: the snapshot plus any 15-minute bar that just closed
//! - `IndicatorEngine`: running state, fed one candle at a time

pub mod ema;
pub mod resample;
pub mod vwap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::candle::Candle;
use ema::Ema;
use resample::BarAggregator;
use vwap::SessionVwap;

/// Maps a timestamp to the trading session it belongs to.
pub trait SessionCalendar {
    fn session_of(&self, timestamp: NaiveDateTime) -> NaiveDate;
}

/// One session per calendar day.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarDay;

impl SessionCalendar for CalendarDay {
    fn session_of(&self, timestamp: NaiveDateTime) -> NaiveDate {
        timestamp.date()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub timestamp: NaiveDateTime,
    pub vwap: f64,
    /// `None` until enough 15-minute bars have closed to seed the EMA.
    pub ema15: Option<f64>,
}

impl IndicatorSnapshot {
    /// (lower, upper) of the VWAP/EMA band, once the EMA exists.
    pub fn band(&self) -> Option<(f64, f64)> {
        self.ema15
            .map(|ema| (self.vwap.min(ema), self.vwap.max(ema)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorUpdate {
    pub snapshot: IndicatorSnapshot,
    pub completed_bar: Option<Candle>,
}

pub struct IndicatorEngine<S: SessionCalendar = CalendarDay> {
    sessions: S,
    vwap: SessionVwap,
    ema: Ema,
    aggregator: BarAggregator,
    last_timestamp: Option<NaiveDateTime>,
    session: Option<NaiveDate>,
}

impl IndicatorEngine<CalendarDay> {
    pub fn new(ema_period: usize) -> Self {
        Self::with_sessions(ema_period, CalendarDay)
    }
}

impl<S: SessionCalendar> IndicatorEngine<S> {
    pub fn with_sessions(ema_period: usize, sessions: S) -> Self {
        IndicatorEngine {
            sessions,
            vwap: SessionVwap::new(),
            ema: Ema::new(ema_period),
            aggregator: BarAggregator::new(),
            last_timestamp: None,
            session: None,
        }
    }

    pub fn ema_period(&self) -> usize {
        self.ema.period()
    }

    pub fn session_vwap(&self) -> &SessionVwap {
        &self.vwap
    }

    /// Session the given timestamp belongs to, per this engine's calendar.
    pub fn session_of(&self, timestamp: NaiveDateTime) -> NaiveDate {
        self.sessions.session_of(timestamp)
    }

    /// Feed the next 5-minute candle.
    ///
    /// # Panics
    ///
    /// Panics if `candle` is not strictly later than the previous candle.
    pub fn update(&mut self, candle: &Candle) -> IndicatorUpdate {
        if let Some(last) = self.last_timestamp {
            assert!(
                candle.timestamp > last,
                "candles out of order: {} after {}",
                candle.timestamp,
                last
            );
        }
        self.last_timestamp = Some(candle.timestamp);

        let session = self.sessions.session_of(candle.timestamp);
        if self.session != Some(session) {
            if let Some(previous) = self.session {
                tracing::debug!(
                    session = %previous,
                    volume = self.vwap.cumulative_volume(),
                    turnover = self.vwap.cumulative_pv(),
                    "session vwap closed"
                );
            }
            self.vwap.reset();
            self.session = Some(session);
        }
        let vwap = self.vwap.update(candle);

        let step = self.aggregator.push(candle);
        if let Some(bar) = &step.flushed {
            self.ema.update(bar.close);
        }

        // Read before this candle's bucket can complete, so all three
        // candles of a bar see the same value.
        let ema15 = self.ema.value();

        if let Some(bar) = &step.completed {
            self.ema.update(bar.close);
        }

        IndicatorUpdate {
            snapshot: IndicatorSnapshot {
                timestamp: candle.timestamp,
                vwap,
                ema15,
            },
            completed_bar: step.completed.or(step.flushed),
        }
    }
}
