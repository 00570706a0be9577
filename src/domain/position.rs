//! Open short position and closed-trade record.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Open,
    BreakevenArmed,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_price: f64,
    /// Lots sold.
    pub quantity: u32,
    pub lot_size: u32,
    pub stop_loss: f64,
    pub entry_timestamp: NaiveDateTime,
    pub state: PositionState,
}

impl Position {
    /// Units sold across all lots.
    pub fn units(&self) -> u64 {
        self.quantity as u64 * self.lot_size as u64
    }

    /// A short is stopped once price trades at or above the stop.
    pub fn should_stop_loss(&self, high: f64) -> bool {
        high >= self.stop_loss
    }

    /// 1:1 reward reached for a stop `sl_points` away.
    pub fn reached_one_to_one(&self, low: f64, sl_points: f64) -> bool {
        low <= self.entry_price - sl_points
    }

    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        (self.entry_price - exit_price) * self.units() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    Loss,
    Breakeven,
    Profit,
    /// Closed by an external flatten command or session square-off.
    Flattened,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeOutcome::Loss => "LOSS",
            TradeOutcome::Breakeven => "BREAKEVEN",
            TradeOutcome::Profit => "PROFIT",
            TradeOutcome::Flattened => "FLATTENED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u32,
    pub lot_size: u32,
    pub entry_timestamp: NaiveDateTime,
    pub exit_timestamp: NaiveDateTime,
    pub outcome: TradeOutcome,
    pub pnl: f64,
}

impl ClosedTrade {
    pub fn holding_minutes(&self) -> i64 {
        (self.exit_timestamp - self.entry_timestamp).num_minutes()
    }
}
