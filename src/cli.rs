//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvTradeReport;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::option_chain_adapter::StrikeGridChain;
use crate::adapters::paper_broker::PaperBroker;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::candle::Interval;
use crate::domain::config_validation::{required_date, validate_all};
use crate::domain::error::TraderError;
use crate::domain::instrument::OptionKind;
use crate::domain::live::{self, LiveConfig, LiveTrader};
use crate::domain::metrics::Metrics;
use crate::domain::position::ClosedTrade;
use crate::domain::risk::CapitalContext;
use crate::domain::strategy::StrategyParams;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;
use crate::telemetry;

#[derive(Parser, Debug)]
#[command(name = "vwaptrader", about = "VWAP/EMA breakdown option-selling trader")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay historical candles through the strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long)]
        capital: Option<f64>,
        #[arg(long)]
        max_loss_fraction: Option<f64>,
        #[arg(long)]
        sl_points: Option<f64>,
        #[arg(long)]
        lot_size: Option<u32>,
        /// Trade journal CSV (overrides [report] trades_csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Paper-trade recorded candles against a simulated broker and option chain
    Paper {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub symbol: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub capital: Option<f64>,
    pub max_loss_fraction: Option<f64>,
    pub sl_points: Option<f64>,
    pub lot_size: Option<u32>,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            start_date,
            end_date,
            capital,
            max_loss_fraction,
            sl_points,
            lot_size,
            output,
        } => {
            let overrides = Overrides {
                symbol,
                start_date,
                end_date,
                capital,
                max_loss_fraction,
                sl_points,
                lot_size,
            };
            run_backtest(&config, &overrides, output.as_deref())
        }
        Command::Paper { config, symbol } => run_paper(&config, symbol),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn load_config(path: &Path) -> Result<FileConfigAdapter, TraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    let level = adapter
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    if let Err(e) = telemetry::init_logging(&level) {
        eprintln!("warning: {e}");
    }
    Ok(adapter)
}

fn run_backtest(
    config_path: &Path,
    overrides: &Overrides,
    output: Option<&Path>,
) -> Result<(), TraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    let bt_config = build_backtest_config(&adapter, overrides)?;
    let data_port = CsvAdapter::new(csv_dir(&adapter));

    let output = output
        .map(Path::to_path_buf)
        .or_else(|| adapter.get_string("report", "trades_csv").map(PathBuf::from));

    let metrics = run_backtest_pipeline(&data_port, &bt_config, output.as_deref())?;
    print_summary(&bt_config.symbol, &metrics);
    Ok(())
}

/// Fetch candles, run the backtest, and write the trade journal if asked.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    config: &BacktestConfig,
    output: Option<&Path>,
) -> Result<Metrics, TraderError> {
    let candles = data_port.fetch_candles(
        &config.symbol,
        config.start_date,
        config.end_date,
        Interval::FiveMinute,
    )?;
    eprintln!(
        "Backtesting {}: {} candles from {} to {}",
        config.symbol,
        candles.len(),
        config.start_date,
        config.end_date
    );

    let mut sink = open_sink(output)?;
    let result = backtest_engine::run_backtest(&candles, config, sink.as_mut())?;
    let metrics = Metrics::compute(&result.trades);
    sink.finish(&metrics)?;

    if result.skipped_entries > 0 {
        eprintln!(
            "Skipped {} entries (position size zero)",
            result.skipped_entries
        );
    }
    if let Some(path) = output {
        eprintln!("Trades written to: {}", path.display());
    }
    Ok(metrics)
}

fn run_paper(config_path: &Path, symbol: Option<String>) -> Result<(), TraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;

    let overrides = Overrides {
        symbol,
        ..Overrides::default()
    };
    let bt_config = build_backtest_config(&adapter, &overrides)?;
    let live_config = build_live_config(&adapter, &overrides)?;
    let chain = build_option_chain(&adapter, &live_config)?;

    let data_port = CsvAdapter::new(csv_dir(&adapter));
    let candles = data_port.fetch_candles(
        &live_config.underlying,
        bt_config.start_date,
        bt_config.end_date,
        Interval::FiveMinute,
    )?;
    eprintln!(
        "Paper trading {} {} options expiring {}: {} candles",
        live_config.underlying,
        live_config.option_kind,
        live_config.expiry,
        candles.len()
    );

    backtest_engine::check_warm_up(
        &candles,
        &live_config.underlying,
        live_config.params.ema_period,
    )?;

    let output = adapter.get_string("report", "trades_csv").map(PathBuf::from);
    let mut sink = open_sink(output.as_deref())?;
    let mut broker = PaperBroker::new();
    let trades = {
        let mut trader = LiveTrader::new(live_config.clone(), &chain, &mut broker);
        live::replay(
            &mut trader,
            &candles,
            bt_config.square_off_at_session_end,
            sink.as_mut(),
        )?
    };

    let metrics = Metrics::compute(&trades);
    sink.finish(&metrics)?;
    if let Some(path) = &output {
        eprintln!("Trades written to: {}", path.display());
    }
    eprintln!("Orders filled:    {}", broker.orders().len());
    print_summary(&live_config.underlying, &metrics);
    Ok(())
}

/// Trade journal at `output`, or an in-memory sink when none is configured.
fn open_sink(output: Option<&Path>) -> Result<Box<dyn ReportPort>, TraderError> {
    let sink: Box<dyn ReportPort> = match output {
        Some(path) => Box::new(CsvTradeReport::create(path)?),
        None => Box::new(Vec::<ClosedTrade>::new()),
    };
    Ok(sink)
}

fn run_validate(config_path: &Path) -> Result<(), TraderError> {
    let adapter = load_config(config_path)?;
    validate_all(&adapter)?;
    let bt = build_backtest_config(&adapter, &Overrides::default())?;

    eprintln!("\nInstrument:");
    eprintln!("  symbol:   {}", bt.symbol);
    eprintln!("  lot size: {}", bt.lot_size);
    eprintln!("\nCapital:");
    eprintln!("  total:          {:.2}", bt.capital.total_capital);
    eprintln!("  max loss/trade: {:.2}", bt.capital.max_allowed_loss());
    eprintln!("\nStrategy:");
    eprintln!("  ema period:           {}", bt.params.ema_period);
    eprintln!("  sl points:            {}", bt.params.sl_points);
    eprintln!("  consolidation window: {}", bt.params.consolidation_window);
    eprintln!("  band tolerance:       {}", bt.params.band_tolerance);
    eprintln!("  min lower highs:      {}", bt.params.min_lower_highs);
    eprintln!("\nRange: {} to {}", bt.start_date, bt.end_date);
    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn print_summary(symbol: &str, metrics: &Metrics) {
    eprintln!("\n=== Results: {} ===", symbol);
    eprintln!("Total Trades:     {}", metrics.total_trades);
    eprintln!(
        "Won/Lost/BE/Flat: {}/{}/{}/{}",
        metrics.trades_won, metrics.trades_lost, metrics.trades_breakeven, metrics.trades_flattened
    );
    eprintln!("Total PnL:        {:.2}", metrics.total_pnl);
    eprintln!("Average PnL:      {:.2}", metrics.avg_pnl);
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", metrics.profit_factor);
    eprintln!("Largest Win:      {:.2}", metrics.largest_win);
    eprintln!("Largest Loss:     {:.2}", metrics.largest_loss);
    eprintln!("Avg Holding:      {:.0} min", metrics.avg_holding_minutes);
}

fn csv_dir(adapter: &dyn ConfigPort) -> PathBuf {
    PathBuf::from(
        adapter
            .get_string("data", "csv_dir")
            .unwrap_or_else(|| "data".to_string()),
    )
}

fn cli_invalid(key: &str, reason: &str) -> TraderError {
    TraderError::ConfigInvalid {
        section: "cli".into(),
        key: key.into(),
        reason: reason.into(),
    }
}

fn to_usize(adapter: &dyn ConfigPort, key: &str, default: i64) -> Result<usize, TraderError> {
    usize::try_from(adapter.get_int("strategy", key, default)).map_err(|_| {
        TraderError::ConfigInvalid {
            section: "strategy".into(),
            key: key.into(),
            reason: "must be a non-negative integer".into(),
        }
    })
}

pub fn build_capital(
    adapter: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<CapitalContext, TraderError> {
    let defaults = CapitalContext::default();
    let capital = CapitalContext {
        total_capital: overrides.capital.unwrap_or_else(|| {
            adapter.get_double("capital", "total_capital", defaults.total_capital)
        }),
        max_loss_fraction: overrides.max_loss_fraction.unwrap_or_else(|| {
            adapter.get_double("capital", "max_loss_fraction", defaults.max_loss_fraction)
        }),
    };
    if !(capital.total_capital.is_finite() && capital.total_capital > 0.0) {
        return Err(cli_invalid("capital", "capital must be positive"));
    }
    if !(capital.max_loss_fraction > 0.0 && capital.max_loss_fraction <= 1.0) {
        return Err(cli_invalid("max-loss-fraction", "must be in (0, 1]"));
    }
    Ok(capital)
}

pub fn build_strategy_params(
    adapter: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<StrategyParams, TraderError> {
    let defaults = StrategyParams::default();
    let sl_points = overrides
        .sl_points
        .unwrap_or_else(|| adapter.get_double("strategy", "sl_points", defaults.sl_points));
    if !(sl_points.is_finite() && sl_points > 0.0) {
        return Err(cli_invalid("sl-points", "sl points must be positive"));
    }
    Ok(StrategyParams {
        ema_period: to_usize(adapter, "ema_period", defaults.ema_period as i64)?,
        sl_points,
        consolidation_window: to_usize(
            adapter,
            "consolidation_window",
            defaults.consolidation_window as i64,
        )?,
        band_tolerance: adapter.get_double("strategy", "band_tolerance", defaults.band_tolerance),
        min_lower_highs: to_usize(adapter, "min_lower_highs", defaults.min_lower_highs as i64)?,
    })
}

fn symbol(adapter: &dyn ConfigPort, overrides: &Overrides) -> Result<String, TraderError> {
    overrides
        .symbol
        .clone()
        .or_else(|| adapter.get_string("instrument", "symbol"))
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| TraderError::ConfigMissing {
            section: "instrument".into(),
            key: "symbol".into(),
        })
}

fn lot_size(adapter: &dyn ConfigPort, overrides: &Overrides) -> Result<u32, TraderError> {
    let lot = match overrides.lot_size {
        Some(lot) => lot,
        None => u32::try_from(adapter.get_int("instrument", "lot_size", 15)).map_err(|_| {
            TraderError::ConfigInvalid {
                section: "instrument".into(),
                key: "lot_size".into(),
                reason: "lot_size must be a positive integer".into(),
            }
        })?,
    };
    if lot == 0 {
        return Err(cli_invalid("lot-size", "lot size must be positive"));
    }
    Ok(lot)
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<BacktestConfig, TraderError> {
    let start_date = match overrides.start_date {
        Some(d) => d,
        None => required_date(adapter, "backtest", "start_date")?,
    };
    let end_date = match overrides.end_date {
        Some(d) => d,
        None => required_date(adapter, "backtest", "end_date")?,
    };
    if start_date > end_date {
        return Err(cli_invalid("start-date", "start date must not be after end date"));
    }

    Ok(BacktestConfig {
        symbol: symbol(adapter, overrides)?,
        start_date,
        end_date,
        capital: build_capital(adapter, overrides)?,
        params: build_strategy_params(adapter, overrides)?,
        lot_size: lot_size(adapter, overrides)?,
        square_off_at_session_end: adapter.get_bool("backtest", "square_off_at_session_end", true),
    })
}

pub fn build_live_config(
    adapter: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<LiveConfig, TraderError> {
    let option_kind = match adapter.get_string("instrument", "option_kind") {
        Some(raw) => raw
            .parse::<OptionKind>()
            .map_err(|reason| TraderError::ConfigInvalid {
                section: "instrument".into(),
                key: "option_kind".into(),
                reason,
            })?,
        None => OptionKind::Put,
    };

    Ok(LiveConfig {
        underlying: symbol(adapter, overrides)?,
        expiry: required_date(adapter, "instrument", "expiry")?,
        option_kind,
        capital: build_capital(adapter, overrides)?,
        params: build_strategy_params(adapter, overrides)?,
    })
}

pub fn build_option_chain(
    adapter: &dyn ConfigPort,
    live_config: &LiveConfig,
) -> Result<StrikeGridChain, TraderError> {
    Ok(StrikeGridChain::new(
        &live_config.underlying,
        lot_size(adapter, &Overrides::default())?,
        adapter.get_double("instrument", "strike_step", 100.0),
        vec![live_config.expiry],
    ))
}
