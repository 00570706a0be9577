#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
pub use vwaptrader::domain::backtest::BacktestConfig;
pub use vwaptrader::domain::candle::{Candle, Interval};
use vwaptrader::domain::error::TraderError;
pub use vwaptrader::domain::risk::CapitalContext;
pub use vwaptrader::domain::strategy::StrategyParams;
use vwaptrader::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.data.insert(symbol.to_string(), candles);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Candle>, TraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TraderError::DataSource {
                reason: reason.clone(),
            });
        }
        let candles: Vec<Candle> = self
            .data
            .get(symbol)
            .map(|all| {
                all.iter()
                    .filter(|c| c.timestamp.date() >= start && c.timestamp.date() <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if candles.is_empty() {
            return Err(TraderError::DataUnavailable {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                start,
                end,
            });
        }
        Ok(candles)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 09:15 on the given January 2023 day, plus `slot` five-minute steps.
pub fn at(day: u32, slot: i64) -> NaiveDateTime {
    date(2023, 1, day).and_hms_opt(9, 15, 0).unwrap() + Duration::minutes(5 * slot)
}

pub fn candle(ts: NaiveDateTime, open: f64, high: f64, low: f64, close: f64, volume: i64) -> Candle {
    Candle {
        timestamp: ts,
        open,
        high,
        low,
        close,
        volume,
    }
}

pub fn flat(ts: NaiveDateTime, price: f64, volume: i64) -> Candle {
    candle(ts, price, price, price, price, volume)
}

/// A full session (09:15 to 15:25) of flat candles: 75 candles, 25 bars.
pub fn flat_session(day: u32, price: f64) -> Vec<Candle> {
    (0..75).map(|i| flat(at(day, i), price, 1000)).collect()
}

/// Day one warms the EMA up at 98. Day two opens with a heavy print at 100,
/// consolidates at 99 between VWAP and EMA, then closes at 97 below both
/// on the sixth candle (09:40), which is the entry.
pub fn breakdown_setup() -> Vec<Candle> {
    let mut candles = flat_session(2, 98.0);
    candles.push(flat(at(3, 0), 100.0, 1_000_000));
    for slot in 1..=4 {
        candles.push(flat(at(3, slot), 99.0, 1));
    }
    candles.push(candle(at(3, 5), 97.5, 97.5, 97.0, 97.0, 1));
    candles
}

/// Breakdown, 1:1 reached (low 46.9), then price returns to entry.
pub fn breakeven_scenario() -> Vec<Candle> {
    let mut candles = breakdown_setup();
    candles.push(candle(at(3, 6), 96.0, 97.0, 46.9, 50.0, 1));
    candles.push(candle(at(3, 7), 50.0, 97.0, 50.0, 96.0, 1));
    candles
}

/// Breakdown, then the next candle trades through the 147 stop.
pub fn loss_scenario() -> Vec<Candle> {
    let mut candles = breakdown_setup();
    candles.push(candle(at(3, 6), 97.0, 150.0, 96.0, 149.0, 1));
    candles
}

/// Breakdown, 1:1 reached, one lower 15-minute high (60 after 99),
/// then a higher high (65) closing the trade at 63.
pub fn profit_scenario() -> Vec<Candle> {
    let mut candles = breakdown_setup();
    candles.push(candle(at(3, 6), 60.0, 60.0, 46.9, 50.0, 1));
    candles.push(candle(at(3, 7), 50.0, 60.0, 48.0, 55.0, 1));
    candles.push(candle(at(3, 8), 55.0, 58.0, 50.0, 52.0, 1));
    candles.push(candle(at(3, 9), 52.0, 55.0, 51.0, 53.0, 1));
    candles.push(candle(at(3, 10), 53.0, 58.0, 52.0, 56.0, 1));
    candles.push(candle(at(3, 11), 56.0, 65.0, 55.0, 63.0, 1));
    candles
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        symbol: "BANKNIFTY".into(),
        start_date: date(2023, 1, 2),
        end_date: date(2023, 1, 3),
        capital: CapitalContext {
            total_capital: 100_000.0,
            max_loss_fraction: 0.008,
        },
        params: StrategyParams::default(),
        lot_size: 15,
        square_off_at_session_end: true,
    }
}
