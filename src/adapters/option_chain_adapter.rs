//! Strike-grid option chain.
//!
//! Lists strikes on a fixed step around the spot price for each configured
//! expiry. Stands in for a broker instrument dump in backtests and paper runs.

use crate::domain::error::TraderError;
use crate::domain::instrument::{OptionInstrument, OptionKind, select_atm_strike};
use crate::ports::instrument_port::InstrumentPort;
use chrono::NaiveDate;

/// Strikes listed on each side of the spot.
const STRIKES_EACH_SIDE: i64 = 20;

pub struct StrikeGridChain {
    underlying: String,
    lot_size: u32,
    strike_step: f64,
    expiries: Vec<NaiveDate>,
}

impl StrikeGridChain {
    pub fn new(underlying: &str, lot_size: u32, strike_step: f64, expiries: Vec<NaiveDate>) -> Self {
        Self {
            underlying: underlying.to_string(),
            lot_size,
            strike_step,
            expiries,
        }
    }

    fn strikes_around(&self, spot: f64) -> Vec<f64> {
        if self.strike_step.is_nan() || self.strike_step <= 0.0 || !spot.is_finite() {
            return Vec::new();
        }
        let centre = (spot / self.strike_step).floor() as i64;
        (centre - STRIKES_EACH_SIDE..=centre + STRIKES_EACH_SIDE)
            .filter(|&k| k > 0)
            .map(|k| k as f64 * self.strike_step)
            .collect()
    }
}

impl InstrumentPort for StrikeGridChain {
    fn resolve_atm(
        &self,
        underlying: &str,
        spot: f64,
        expiry: NaiveDate,
        kind: OptionKind,
    ) -> Result<OptionInstrument, TraderError> {
        let no_match = || TraderError::NoMatchingInstrument {
            underlying: underlying.to_string(),
            spot,
            expiry,
        };

        if underlying != self.underlying || !self.expiries.contains(&expiry) {
            return Err(no_match());
        }
        let strike = select_atm_strike(spot, &self.strikes_around(spot)).ok_or_else(no_match)?;
        tracing::debug!(underlying, spot, strike, %kind, "atm strike selected");
        Ok(OptionInstrument::new(
            underlying,
            expiry,
            strike,
            kind,
            self.lot_size,
        ))
    }
}
