//! Report sink port trait.

use crate::domain::error::TraderError;
use crate::domain::metrics::Metrics;
use crate::domain::position::ClosedTrade;

/// Receives closed trades as they happen and the summary at the end of a run.
pub trait ReportPort {
    fn record_trade(&mut self, trade: &ClosedTrade) -> Result<(), TraderError>;

    /// Default implementation: nothing to flush.
    fn finish(&mut self, metrics: &Metrics) -> Result<(), TraderError> {
        let _ = metrics;
        Ok(())
    }
}

/// In-memory sink.
impl ReportPort for Vec<ClosedTrade> {
    fn record_trade(&mut self, trade: &ClosedTrade) -> Result<(), TraderError> {
        self.push(trade.clone());
        Ok(())
    }
}
