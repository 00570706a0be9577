//! Derivative instrument lookup port trait.

use crate::domain::error::TraderError;
use crate::domain::instrument::{OptionInstrument, OptionKind};
use chrono::NaiveDate;

pub trait InstrumentPort {
    /// The at-the-money option on `underlying` for `expiry`.
    ///
    /// Fails with `NoMatchingInstrument` when no contract fits.
    fn resolve_atm(
        &self,
        underlying: &str,
        spot: f64,
        expiry: NaiveDate,
        kind: OptionKind,
    ) -> Result<OptionInstrument, TraderError>;
}
