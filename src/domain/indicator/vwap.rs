//! Session-anchored Volume Weighted Average Price.
//!
//! VWAP = Σ(typical price × volume) / Σ(volume), reset at each session start.

use crate::domain::candle::Candle;

#[derive(Debug, Clone, Default)]
pub struct SessionVwap {
    cum_pv: f64,
    cum_volume: f64,
}

impl SessionVwap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.cum_pv = 0.0;
        self.cum_volume = 0.0;
    }

    /// Cumulative price × volume since the session start.
    pub fn cumulative_pv(&self) -> f64 {
        self.cum_pv
    }

    /// Cumulative volume since the session start.
    pub fn cumulative_volume(&self) -> f64 {
        self.cum_volume
    }

    /// Accumulate a candle and return the VWAP in effect after it.
    ///
    /// With no volume traded yet in the session the typical price stands in.
    pub fn update(&mut self, candle: &Candle) -> f64 {
        let typical = candle.typical_price();
        let volume = candle.volume.max(0) as f64;
        self.cum_pv += typical * volume;
        self.cum_volume += volume;
        if self.cum_volume > 0.0 {
            self.cum_pv / self.cum_volume
        } else {
            typical
        }
    }
}
