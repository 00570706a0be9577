//! CSV trade journal implementing ReportPort.

use crate::adapters::csv_adapter::TIMESTAMP_FORMAT;
use crate::domain::error::TraderError;
use crate::domain::metrics::Metrics;
use crate::domain::position::ClosedTrade;
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const HEADER: [&str; 9] = [
    "entry_timestamp",
    "exit_timestamp",
    "entry_price",
    "exit_price",
    "lots",
    "lot_size",
    "outcome",
    "pnl",
    "holding_minutes",
];

/// Writes one row per closed trade, flushed on `finish`.
pub struct CsvTradeReport<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvTradeReport<File> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, TraderError> {
        let path = path.as_ref();
        let writer = csv::Writer::from_path(path).map_err(|e| TraderError::Report {
            reason: format!("cannot create {}: {}", path.display(), e),
        })?;
        Self::with_writer(writer)
    }
}

impl<W: Write> CsvTradeReport<W> {
    pub fn from_writer(inner: W) -> Result<Self, TraderError> {
        Self::with_writer(csv::Writer::from_writer(inner))
    }

    fn with_writer(mut writer: csv::Writer<W>) -> Result<Self, TraderError> {
        writer.write_record(HEADER).map_err(report_error)?;
        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, TraderError> {
        self.writer.into_inner().map_err(|e| TraderError::Report {
            reason: e.to_string(),
        })
    }
}

fn report_error(e: csv::Error) -> TraderError {
    TraderError::Report {
        reason: e.to_string(),
    }
}

impl<W: Write> ReportPort for CsvTradeReport<W> {
    fn record_trade(&mut self, trade: &ClosedTrade) -> Result<(), TraderError> {
        self.writer
            .write_record([
                trade.entry_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                trade.exit_timestamp.format(TIMESTAMP_FORMAT).to_string(),
                format!("{:.2}", trade.entry_price),
                format!("{:.2}", trade.exit_price),
                trade.quantity.to_string(),
                trade.lot_size.to_string(),
                trade.outcome.to_string(),
                format!("{:.2}", trade.pnl),
                trade.holding_minutes().to_string(),
            ])
            .map_err(report_error)
    }

    fn finish(&mut self, metrics: &Metrics) -> Result<(), TraderError> {
        self.writer.flush()?;
        tracing::debug!(trades = metrics.total_trades, "trade journal flushed");
        Ok(())
    }
}
