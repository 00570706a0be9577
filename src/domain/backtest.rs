//! Backtest replay loop.
//!
//! Candles flow through the indicator engine, the signal detector, the risk
//! sizer and the trade state machine in timestamp order. Closed trades are
//! handed to the report sink as they happen.

use chrono::NaiveDate;

use super::candle::Candle;
use super::error::TraderError;
use super::indicator::IndicatorEngine;
use super::indicator::ema::calculate_ema;
use super::indicator::resample::aggregate_candles;
use super::position::ClosedTrade;
use super::risk::{CapitalContext, RiskSizer};
use super::signal::{Signal, SignalDetector};
use super::strategy::StrategyParams;
use super::trade_machine::{EntryOutcome, TradeStateMachine};
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capital: CapitalContext,
    pub params: StrategyParams,
    pub lot_size: u32,
    /// Flatten any open position on the last candle of each session.
    pub square_off_at_session_end: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub trades: Vec<ClosedTrade>,
    /// Entry signals dropped because sizing came out at zero lots.
    pub skipped_entries: usize,
    pub candles_processed: usize,
}

pub fn run_backtest(
    candles: &[Candle],
    config: &BacktestConfig,
    sink: &mut dyn ReportPort,
) -> Result<BacktestResult, TraderError> {
    let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
        return Err(TraderError::DataUnavailable {
            symbol: config.symbol.clone(),
            interval: "5m".into(),
            start: config.start_date,
            end: config.end_date,
        });
    };

    let bars = check_warm_up(candles, &config.symbol, config.params.ema_period)?;

    tracing::info!(
        symbol = %config.symbol,
        from = %first.timestamp,
        to = %last.timestamp,
        candles = candles.len(),
        bars,
        "starting backtest"
    );

    let mut engine = IndicatorEngine::new(config.params.ema_period);
    let mut detector = SignalDetector::new(config.params.detector_config());
    let mut machine = TradeStateMachine::new(config.params.sl_points);
    let sizer = RiskSizer::new(config.capital, config.params.sl_points);

    let mut trades = Vec::new();
    let mut skipped_entries = 0usize;

    for (i, candle) in candles.iter().enumerate() {
        let update = engine.update(candle);
        let signal = detector.evaluate(candle, &update);

        if machine.is_idle() {
            if signal == Signal::EntrySell {
                let sizing = sizer.size(candle.close, config.lot_size);
                match machine.open(candle, sizing) {
                    EntryOutcome::Opened(pos) => {
                        detector.on_position_opened();
                        tracing::info!(
                            at = %pos.entry_timestamp,
                            entry = pos.entry_price,
                            stop = pos.stop_loss,
                            lots = pos.quantity,
                            "short opened"
                        );
                    }
                    EntryOutcome::ZeroPositionSize => {
                        skipped_entries += 1;
                        tracing::warn!(at = %candle.timestamp, "position size zero, entry skipped");
                    }
                    EntryOutcome::AlreadyOpen => {}
                }
            }
        } else {
            let before = machine.state();
            if let Some(trade) = machine.on_candle(candle, signal) {
                detector.on_position_closed();
                record(trade, sink, &mut trades)?;
            } else if machine.state() != before {
                tracing::info!(at = %candle.timestamp, "stop moved to breakeven");
            }
        }

        let session_ends = candles
            .get(i + 1)
            .is_none_or(|next| engine.session_of(next.timestamp) != engine.session_of(candle.timestamp));
        if config.square_off_at_session_end && session_ends && !machine.is_idle() {
            if let Some(trade) = machine.flatten(candle.close, candle.timestamp) {
                detector.on_position_closed();
                tracing::info!(at = %candle.timestamp, price = candle.close, "session square-off");
                record(trade, sink, &mut trades)?;
            }
        }
    }

    Ok(BacktestResult {
        trades,
        skipped_entries,
        candles_processed: candles.len(),
    })
}

/// Ensure at least one candle follows the 15-minute bar that seeds the EMA.
///
/// Returns the number of bars in the series.
pub fn check_warm_up(
    candles: &[Candle],
    symbol: &str,
    ema_period: usize,
) -> Result<usize, TraderError> {
    let bars = aggregate_candles(candles);
    let ema = calculate_ema(&bars, ema_period);
    // The last bar's own EMA is never visible to any candle.
    let seeded_before_last = ema.iter().rev().skip(1).any(Option::is_some);
    if !seeded_before_last {
        return Err(TraderError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            minimum: ema_period + 1,
        });
    }
    Ok(bars.len())
}

fn record(
    trade: ClosedTrade,
    sink: &mut dyn ReportPort,
    trades: &mut Vec<ClosedTrade>,
) -> Result<(), TraderError> {
    tracing::info!(
        at = %trade.exit_timestamp,
        exit = trade.exit_price,
        outcome = %trade.outcome,
        pnl = trade.pnl,
        "trade closed"
    );
    sink.record_trade(&trade)?;
    trades.push(trade);
    Ok(())
}
