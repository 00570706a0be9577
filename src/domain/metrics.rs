//! Summary statistics over closed trades.

use super::position::{ClosedTrade, TradeOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_trades: usize,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub trades_breakeven: usize,
    pub trades_flattened: usize,
    /// Share of trades with positive PnL.
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub avg_holding_minutes: f64,
}

impl Metrics {
    pub fn compute(trades: &[ClosedTrade]) -> Self {
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut trades_breakeven = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;
        let mut total_minutes = 0i64;

        for trade in trades {
            let pnl = trade.pnl;
            if pnl > 0.0 {
                trades_won += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            } else {
                trades_breakeven += 1;
            }
            total_minutes += trade.holding_minutes();
        }

        let total_trades = trades.len();
        let total_pnl = total_wins - total_losses;
        let trades_flattened = trades
            .iter()
            .filter(|t| t.outcome == TradeOutcome::Flattened)
            .count();

        let ratio = |num: f64, den: usize| if den > 0 { num / den as f64 } else { 0.0 };

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        Metrics {
            total_trades,
            total_pnl,
            avg_pnl: ratio(total_pnl, total_trades),
            trades_won,
            trades_lost,
            trades_breakeven,
            trades_flattened,
            win_rate: ratio(trades_won as f64, total_trades),
            profit_factor,
            avg_win: ratio(total_wins, trades_won),
            avg_loss: ratio(total_losses, trades_lost),
            largest_win,
            largest_loss,
            avg_holding_minutes: ratio(total_minutes as f64, total_trades),
        }
    }
}
