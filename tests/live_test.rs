//! Event-driven trader against the paper broker and strike-grid chain.

mod common;

use approx::assert_relative_eq;
use common::*;
use vwaptrader::adapters::option_chain_adapter::StrikeGridChain;
use vwaptrader::adapters::paper_broker::PaperBroker;
use vwaptrader::domain::error::TraderError;
use vwaptrader::domain::instrument::OptionKind;
use vwaptrader::domain::live::{self, LiveConfig, LiveTrader};
use vwaptrader::domain::order::Side;
use vwaptrader::domain::position::{ClosedTrade, TradeOutcome};
use vwaptrader::domain::trade_machine::MachineState;

fn expiry() -> chrono::NaiveDate {
    date(2023, 1, 25)
}

fn live_config() -> LiveConfig {
    LiveConfig {
        underlying: "BANKNIFTY".into(),
        expiry: expiry(),
        option_kind: OptionKind::Put,
        capital: CapitalContext {
            total_capital: 100_000.0,
            max_loss_fraction: 0.008,
        },
        params: StrategyParams::default(),
    }
}

fn chain() -> StrikeGridChain {
    StrikeGridChain::new("BANKNIFTY", 15, 100.0, vec![expiry()])
}

mod order_routing {
    use super::*;

    #[test]
    fn entry_sells_atm_option_then_stop_buys_it_back() {
        let chain = chain();
        let mut broker = PaperBroker::new();
        let mut trades = Vec::new();
        {
            let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
            for c in breakdown_setup() {
                assert!(trader.on_candle(&c).unwrap().is_none());
            }
            assert_eq!(trader.state(), MachineState::Open);
            let inst = trader.instrument().unwrap();
            assert_eq!(inst.strike, 100.0);
            assert_eq!(inst.trading_symbol, "BANKNIFTY_2023-01-25_100_PE");

            let last = loss_scenario().pop().unwrap();
            trades.extend(trader.on_candle(&last).unwrap());
            assert_eq!(trader.state(), MachineState::Idle);
            assert!(trader.instrument().is_none());
            assert_eq!(trader.fills().len(), 2);
        }

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].outcome, TradeOutcome::Loss);
        assert_relative_eq!(trades[0].pnl, -750.0);

        let orders = broker.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].side, Side::Sell);
        assert_eq!(orders[0].quantity, 15);
        assert_eq!(orders[1].side, Side::Buy);
        assert_relative_eq!(orders[1].reference_price, trades[0].exit_price);
        assert_relative_eq!(orders[1].reference_price, 147.0);
        assert_eq!(broker.net_units(), 0);
    }

    #[test]
    fn breakeven_promotion_places_no_order() {
        let chain = chain();
        let mut broker = PaperBroker::new();
        let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
        let candles = breakeven_scenario();
        let (last, head) = candles.split_last().unwrap();
        for c in head {
            trader.on_candle(c).unwrap();
        }
        assert_eq!(trader.state(), MachineState::BreakevenArmed);
        assert_eq!(trader.fills().len(), 1);

        let trade = trader.on_candle(last).unwrap().unwrap();
        assert_eq!(trade.outcome, TradeOutcome::Breakeven);
        assert_eq!(trader.fills().len(), 2);
        assert_relative_eq!(trader.fills()[1].price, trade.exit_price);
        drop(trader);

        let buy = &broker.orders()[1];
        assert_eq!(buy.side, Side::Buy);
        assert_relative_eq!(buy.reference_price, trade.exit_price);
        assert_relative_eq!(buy.reference_price, 97.0);
    }

    #[test]
    fn flatten_covers_open_position() {
        let chain = chain();
        let mut broker = PaperBroker::new();
        let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
        for c in breakdown_setup() {
            trader.on_candle(&c).unwrap();
        }
        let trade = trader.flatten(95.0, at(3, 6)).unwrap().unwrap();
        assert_eq!(trade.outcome, TradeOutcome::Flattened);
        assert_relative_eq!(trade.pnl, 30.0);
        assert_eq!(trader.state(), MachineState::Idle);

        assert!(trader.flatten(95.0, at(3, 7)).unwrap().is_none());
    }
}

mod failures {
    use super::*;

    #[test]
    fn rejected_entry_leaves_machine_idle() {
        let chain = chain();
        let mut broker = PaperBroker::rejecting();
        let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
        let candles = breakdown_setup();
        let (entry, head) = candles.split_last().unwrap();
        for c in head {
            trader.on_candle(c).unwrap();
        }

        let err = trader.on_candle(entry).unwrap_err();
        assert!(matches!(err, TraderError::OrderRejected { .. }));
        assert_eq!(trader.state(), MachineState::Idle);
        assert!(trader.instrument().is_none());
    }

    #[test]
    fn missing_expiry_is_no_matching_instrument() {
        let chain = StrikeGridChain::new("BANKNIFTY", 15, 100.0, vec![date(2023, 2, 23)]);
        let mut broker = PaperBroker::new();
        let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
        let candles = breakdown_setup();
        let (entry, head) = candles.split_last().unwrap();
        for c in head {
            trader.on_candle(c).unwrap();
        }

        let err = trader.on_candle(entry).unwrap_err();
        assert!(matches!(err, TraderError::NoMatchingInstrument { .. }));
        assert_eq!(trader.state(), MachineState::Idle);
        drop(trader);
        assert!(broker.orders().is_empty());
    }

    #[test]
    fn zero_size_places_no_order() {
        let chain = chain();
        let mut broker = PaperBroker::new();
        let mut config = live_config();
        config.capital.total_capital = 1_000.0;
        {
            let mut trader = LiveTrader::new(config, &chain, &mut broker);
            for c in loss_scenario() {
                assert!(trader.on_candle(&c).unwrap().is_none());
            }
            assert_eq!(trader.state(), MachineState::Idle);
        }
        assert!(broker.orders().is_empty());
    }
}

mod replay {
    use super::*;

    #[test]
    fn replay_matches_backtest_outcome() {
        let chain = chain();
        let mut broker = PaperBroker::new();
        let mut sink: Vec<ClosedTrade> = Vec::new();
        let trades = {
            let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
            live::replay(&mut trader, &profit_scenario(), true, &mut sink).unwrap()
        };

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].outcome, TradeOutcome::Profit);
        assert_relative_eq!(trades[0].pnl, 510.0);
        assert_eq!(sink, trades);
        assert_eq!(broker.net_units(), 0);
    }

    #[test]
    fn replay_without_seeded_ema_is_insufficient() {
        let chain = chain();
        let mut broker = PaperBroker::new();
        let mut sink: Vec<ClosedTrade> = Vec::new();
        let err = {
            let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
            live::replay(&mut trader, &flat_session(2, 98.0), true, &mut sink).unwrap_err()
        };

        assert!(matches!(
            err,
            TraderError::InsufficientData {
                bars: 25,
                minimum: 26,
                ..
            }
        ));
        assert!(sink.is_empty());
        assert!(broker.orders().is_empty());
    }

    #[test]
    fn replay_squares_off_at_session_end() {
        let mut candles = breakdown_setup();
        candles.push(candle(at(3, 6), 97.0, 98.0, 95.0, 96.0, 1));

        let chain = chain();
        let mut broker = PaperBroker::new();
        let mut sink: Vec<ClosedTrade> = Vec::new();
        let mut trader = LiveTrader::new(live_config(), &chain, &mut broker);
        let trades = live::replay(&mut trader, &candles, true, &mut sink).unwrap();

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].outcome, TradeOutcome::Flattened);
        assert_eq!(trader.state(), MachineState::Idle);
    }
}
