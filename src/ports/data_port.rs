//! Market data port trait.

use crate::domain::candle::{Candle, Interval};
use crate::domain::error::TraderError;
use chrono::NaiveDate;

pub trait DataPort {
    /// Ordered candles for `symbol` from `start` to `end` inclusive.
    ///
    /// Fails with `DataUnavailable` when the range holds no candles.
    fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Candle>, TraderError>;
}
