//! CSV file candle adapter.
//!
//! One file per symbol and interval, `{SYMBOL}_{interval}.csv`, with the
//! header `timestamp,open,high,low,close,volume` and timestamps formatted
//! `%Y-%m-%d %H:%M:%S`.

use crate::domain::candle::{Candle, Interval};
use crate::domain::error::TraderError;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.base_path.join(format!("{}_{}.csv", symbol, interval))
    }
}

fn column<T: FromStr>(record: &StringRecord, idx: usize, name: &str) -> Result<T, TraderError>
where
    T::Err: std::fmt::Display,
{
    let raw = record.get(idx).ok_or_else(|| TraderError::DataSource {
        reason: format!("missing {} column", name),
    })?;
    raw.trim().parse().map_err(|e| TraderError::DataSource {
        reason: format!("invalid {} value '{}': {}", name, raw, e),
    })
}

fn parse_candle(record: &StringRecord) -> Result<Candle, TraderError> {
    let ts_str = record.get(0).ok_or_else(|| TraderError::DataSource {
        reason: "missing timestamp column".into(),
    })?;
    let timestamp = NaiveDateTime::parse_from_str(ts_str.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        TraderError::DataSource {
            reason: format!("invalid timestamp '{}': {}", ts_str, e),
        }
    })?;

    Ok(Candle {
        timestamp,
        open: column(record, 1, "open")?,
        high: column(record, 2, "high")?,
        low: column(record, 3, "low")?,
        close: column(record, 4, "close")?,
        volume: column(record, 5, "volume")?,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_candles(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Candle>, TraderError> {
        let path = self.csv_path(symbol, interval);
        let content = fs::read_to_string(&path).map_err(|e| TraderError::DataSource {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TraderError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;
            let candle = parse_candle(&record)?;
            let day = candle.timestamp.date();
            if day < start || day > end {
                continue;
            }
            candles.push(candle);
        }

        if candles.is_empty() {
            return Err(TraderError::DataUnavailable {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
                start,
                end,
            });
        }

        candles.sort_by_key(|c| c.timestamp);
        if let Some(pair) = candles.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(TraderError::DataSource {
                reason: format!(
                    "duplicate candle at {} in {}",
                    pair[0].timestamp,
                    path.display()
                ),
            });
        }
        tracing::debug!(
            symbol,
            %interval,
            count = candles.len(),
            file = %path.display(),
            "candles loaded"
        );
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        // deliberately out of order across days
        let csv_content = "timestamp,open,high,low,close,volume\n\
            2023-01-03 09:15:00,43000.0,43050.0,42980.0,43010.0,1200\n\
            2023-01-02 09:20:00,42900.0,42950.0,42880.0,42940.0,900\n\
            2023-01-02 09:15:00,42850.0,42920.0,42840.0,42900.0,1500\n";

        fs::write(path.join("BANKNIFTY_5m.csv"), csv_content).unwrap();
        fs::write(
            path.join("FINNIFTY_5m.csv"),
            "timestamp,open,high,low,close,volume\n\
             2023-01-02 09:20:00,1,1,1,1,1\n\
             2023-01-02 09:15:00,1,1,1,1,1\n\
             2023-01-02 09:20:00,2,2,2,2,2\n",
        )
        .unwrap();
        fs::write(
            path.join("NIFTY_5m.csv"),
            "timestamp,open,high,low,close,volume\n2023-01-02 09:15:00,abc,1,1,1,1\n",
        )
        .unwrap();

        (dir, path)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap()
    }

    #[test]
    fn fetch_candles_returns_sorted_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let candles = adapter
            .fetch_candles("BANKNIFTY", day(1), day(31), Interval::FiveMinute)
            .unwrap();

        assert_eq!(candles.len(), 3);
        assert_eq!(
            candles[0].timestamp,
            day(2).and_hms_opt(9, 15, 0).unwrap()
        );
        assert_eq!(candles[0].open, 42850.0);
        assert_eq!(candles[0].high, 42920.0);
        assert_eq!(candles[0].low, 42840.0);
        assert_eq!(candles[0].close, 42900.0);
        assert_eq!(candles[0].volume, 1500);
        assert!(candles.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn fetch_candles_filters_by_session_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let candles = adapter
            .fetch_candles("BANKNIFTY", day(3), day(3), Interval::FiveMinute)
            .unwrap();

        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 43010.0);
    }

    #[test]
    fn empty_range_is_data_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter
            .fetch_candles("BANKNIFTY", day(10), day(12), Interval::FiveMinute)
            .unwrap_err();
        assert!(matches!(err, TraderError::DataUnavailable { ref interval, .. } if interval == "5m"));
    }

    #[test]
    fn missing_file_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter
            .fetch_candles("BANKNIFTY", day(1), day(31), Interval::FifteenMinute)
            .unwrap_err();
        assert!(matches!(err, TraderError::DataSource { .. }));
    }

    #[test]
    fn malformed_value_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter
            .fetch_candles("NIFTY", day(1), day(31), Interval::FiveMinute)
            .unwrap_err();
        match err {
            TraderError::DataSource { reason } => assert!(reason.contains("open")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_timestamp_is_data_source_error() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let err = adapter
            .fetch_candles("FINNIFTY", day(1), day(31), Interval::FiveMinute)
            .unwrap_err();
        match err {
            TraderError::DataSource { reason } => {
                assert!(reason.contains("duplicate candle at 2023-01-02 09:20:00"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
