//! Event-driven trading session.
//!
//! Runs the same indicator/detector/sizer/state-machine pipeline as the
//! backtest, one candle event at a time, and routes the option legs through
//! the broker port. Orders are placed before the state machine commits, so
//! a rejected order leaves the machine where it was.

use chrono::{NaiveDate, NaiveDateTime};

use super::backtest::check_warm_up;
use super::candle::Candle;
use super::error::TraderError;
use super::indicator::IndicatorEngine;
use super::instrument::{OptionInstrument, OptionKind};
use super::order::{Fill, OrderRequest, OrderType, Side};
use super::position::ClosedTrade;
use super::risk::{CapitalContext, RiskSizer, SizingOutcome};
use super::signal::{Signal, SignalDetector};
use super::strategy::StrategyParams;
use super::trade_machine::{EntryOutcome, MachineState, TradeStateMachine, Transition};
use crate::ports::instrument_port::InstrumentPort;
use crate::ports::order_port::OrderPort;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone)]
pub struct LiveConfig {
    pub underlying: String,
    pub expiry: NaiveDate,
    pub option_kind: OptionKind,
    pub capital: CapitalContext,
    pub params: StrategyParams,
}

pub struct LiveTrader<'a> {
    config: LiveConfig,
    engine: IndicatorEngine,
    detector: SignalDetector,
    machine: TradeStateMachine,
    sizer: RiskSizer,
    instruments: &'a dyn InstrumentPort,
    orders: &'a mut dyn OrderPort,
    instrument: Option<OptionInstrument>,
    fills: Vec<Fill>,
}

impl<'a> LiveTrader<'a> {
    pub fn new(
        config: LiveConfig,
        instruments: &'a dyn InstrumentPort,
        orders: &'a mut dyn OrderPort,
    ) -> Self {
        LiveTrader {
            engine: IndicatorEngine::new(config.params.ema_period),
            detector: SignalDetector::new(config.params.detector_config()),
            machine: TradeStateMachine::new(config.params.sl_points),
            sizer: RiskSizer::new(config.capital, config.params.sl_points),
            config,
            instruments,
            orders,
            instrument: None,
            fills: Vec::new(),
        }
    }

    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    pub fn state(&self) -> MachineState {
        self.machine.state()
    }

    /// Option currently sold, if a position is open.
    pub fn instrument(&self) -> Option<&OptionInstrument> {
        self.instrument.as_ref()
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn session_of(&self, timestamp: NaiveDateTime) -> NaiveDate {
        self.engine.session_of(timestamp)
    }

    /// Process the next closed candle of the underlying.
    pub fn on_candle(&mut self, candle: &Candle) -> Result<Option<ClosedTrade>, TraderError> {
        let update = self.engine.update(candle);
        let signal = self.detector.evaluate(candle, &update);

        if self.machine.is_idle() {
            if signal == Signal::EntrySell {
                self.enter(candle)?;
            }
            return Ok(None);
        }

        match self.machine.evaluate(candle, signal) {
            Transition::Hold => Ok(None),
            Transition::PromoteBreakeven => {
                self.machine
                    .apply(Transition::PromoteBreakeven, candle.timestamp);
                tracing::info!(at = %candle.timestamp, "stop moved to breakeven");
                Ok(None)
            }
            close @ Transition::Close { price, .. } => {
                self.cover(price, candle.timestamp)?;
                Ok(self.commit_close(close, candle.timestamp))
            }
        }
    }

    /// Buy back the open leg now and close the position at `price`.
    pub fn flatten(
        &mut self,
        price: f64,
        timestamp: NaiveDateTime,
    ) -> Result<Option<ClosedTrade>, TraderError> {
        if self.machine.is_idle() {
            return Ok(None);
        }
        self.cover(price, timestamp)?;
        let trade = self.machine.flatten(price, timestamp);
        self.detector.on_position_closed();
        self.instrument = None;
        if let Some(t) = &trade {
            tracing::info!(at = %timestamp, price, pnl = t.pnl, "position flattened");
        }
        Ok(trade)
    }

    fn enter(&mut self, candle: &Candle) -> Result<(), TraderError> {
        let instrument = self.instruments.resolve_atm(
            &self.config.underlying,
            candle.close,
            self.config.expiry,
            self.config.option_kind,
        )?;

        let plan = match self.sizer.size(candle.close, instrument.lot_size) {
            SizingOutcome::Sized(plan) => plan,
            SizingOutcome::ZeroPositionSize => {
                tracing::warn!(at = %candle.timestamp, "position size zero, entry skipped");
                return Ok(());
            }
        };

        let fill = self.orders.place_order(&OrderRequest {
            instrument: instrument.trading_symbol.clone(),
            side: Side::Sell,
            quantity: plan.quantity as u64 * plan.lot_size as u64,
            order_type: OrderType::Market,
            reference_price: candle.close,
            timestamp: candle.timestamp,
        })?;
        tracing::info!(
            instrument = %fill.instrument,
            units = fill.quantity,
            price = fill.price,
            "sell filled"
        );
        self.fills.push(fill);

        if let EntryOutcome::Opened(pos) = self.machine.open(candle, SizingOutcome::Sized(plan)) {
            self.detector.on_position_opened();
            tracing::info!(
                at = %pos.entry_timestamp,
                entry = pos.entry_price,
                stop = pos.stop_loss,
                lots = pos.quantity,
                "short opened"
            );
        }
        self.instrument = Some(instrument);
        Ok(())
    }

    fn cover(&mut self, reference_price: f64, timestamp: NaiveDateTime) -> Result<(), TraderError> {
        let (Some(instrument), Some(pos)) = (self.instrument.as_ref(), self.machine.position())
        else {
            return Ok(());
        };
        let fill = self.orders.place_order(&OrderRequest {
            instrument: instrument.trading_symbol.clone(),
            side: Side::Buy,
            quantity: pos.units(),
            order_type: OrderType::Market,
            reference_price,
            timestamp,
        })?;
        tracing::info!(
            instrument = %fill.instrument,
            units = fill.quantity,
            price = fill.price,
            "buy filled"
        );
        self.fills.push(fill);
        Ok(())
    }

    fn commit_close(&mut self, close: Transition, timestamp: NaiveDateTime) -> Option<ClosedTrade> {
        let trade = self.machine.apply(close, timestamp);
        self.detector.on_position_closed();
        self.instrument = None;
        if let Some(t) = &trade {
            tracing::info!(
                at = %t.exit_timestamp,
                exit = t.exit_price,
                outcome = %t.outcome,
                pnl = t.pnl,
                "trade closed"
            );
        }
        trade
    }
}

/// Feed a recorded candle series through `trader` as if it were live.
///
/// With `square_off` set, an open position is flattened at the close of the
/// last candle of each session. Fails with `InsufficientData` when the series
/// is too short to seed the EMA before its final bar.
pub fn replay(
    trader: &mut LiveTrader<'_>,
    candles: &[Candle],
    square_off: bool,
    sink: &mut dyn ReportPort,
) -> Result<Vec<ClosedTrade>, TraderError> {
    let config = trader.config();
    check_warm_up(candles, &config.underlying, config.params.ema_period)?;

    let mut trades = Vec::new();
    for (i, candle) in candles.iter().enumerate() {
        if let Some(trade) = trader.on_candle(candle)? {
            sink.record_trade(&trade)?;
            trades.push(trade);
        }
        let session_ends = candles.get(i + 1).is_none_or(|next| {
            trader.session_of(next.timestamp) != trader.session_of(candle.timestamp)
        });
        if square_off && session_ends {
            if let Some(trade) = trader.flatten(candle.close, candle.timestamp)? {
                sink.record_trade(&trade)?;
                trades.push(trade);
            }
        }
    }
    Ok(trades)
}
