//! Configuration validation.
//!
//! Each section is checked before a run so bad values surface as
//! `ConfigMissing`/`ConfigInvalid` rather than as odd trading behaviour.

use crate::domain::error::TraderError;
use crate::domain::instrument::OptionKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

fn invalid(section: &str, key: &str, reason: &str) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> TraderError {
    TraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

pub fn validate_capital_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let capital = config.get_double("capital", "total_capital", 100_000.0);
    if !(capital.is_finite() && capital > 0.0) {
        return Err(invalid("capital", "total_capital", "total_capital must be positive"));
    }
    let fraction = config.get_double("capital", "max_loss_fraction", 0.008);
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(invalid(
            "capital",
            "max_loss_fraction",
            "max_loss_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    if config.get_int("strategy", "ema_period", 25) < 1 {
        return Err(invalid("strategy", "ema_period", "ema_period must be at least 1"));
    }
    let sl = config.get_double("strategy", "sl_points", 50.0);
    if !(sl.is_finite() && sl > 0.0) {
        return Err(invalid("strategy", "sl_points", "sl_points must be positive"));
    }
    if config.get_int("strategy", "consolidation_window", 3) < 1 {
        return Err(invalid(
            "strategy",
            "consolidation_window",
            "consolidation_window must be at least 1",
        ));
    }
    let tol = config.get_double("strategy", "band_tolerance", 0.0);
    if !(tol.is_finite() && tol >= 0.0) {
        return Err(invalid(
            "strategy",
            "band_tolerance",
            "band_tolerance must be non-negative",
        ));
    }
    if config.get_int("strategy", "min_lower_highs", 1) < 0 {
        return Err(invalid(
            "strategy",
            "min_lower_highs",
            "min_lower_highs must be non-negative",
        ));
    }
    Ok(())
}

pub fn validate_instrument_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    match config.get_string("instrument", "symbol") {
        Some(s) if !s.trim().is_empty() => {}
        _ => return Err(missing("instrument", "symbol")),
    }
    let lot = config.get_int("instrument", "lot_size", 15);
    if lot < 1 || lot > u32::MAX as i64 {
        return Err(invalid("instrument", "lot_size", "lot_size must be a positive integer"));
    }
    if let Some(kind) = config.get_string("instrument", "option_kind") {
        kind.parse::<OptionKind>()
            .map_err(|reason| invalid("instrument", "option_kind", &reason))?;
    }
    let step = config.get_double("instrument", "strike_step", 100.0);
    if !(step.is_finite() && step > 0.0) {
        return Err(invalid("instrument", "strike_step", "strike_step must be positive"));
    }
    if let Some(Err(_)) = config.get_date("instrument", "expiry") {
        return Err(invalid(
            "instrument",
            "expiry",
            "invalid expiry format, expected YYYY-MM-DD",
        ));
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), TraderError> {
    let start = required_date(config, "backtest", "start_date")?;
    let end = required_date(config, "backtest", "end_date")?;
    if start > end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

/// Every section a backtest or paper run reads.
pub fn validate_all(config: &dyn ConfigPort) -> Result<(), TraderError> {
    validate_capital_config(config)?;
    validate_strategy_config(config)?;
    validate_instrument_config(config)?;
    validate_backtest_config(config)
}

pub fn required_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, TraderError> {
    match config.get_date(section, key) {
        None => Err(missing(section, key)),
        Some(Ok(date)) => Ok(date),
        Some(Err(_)) => Err(invalid(
            section,
            key,
            &format!("invalid {} format, expected YYYY-MM-DD", key),
        )),
    }
}
