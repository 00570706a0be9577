//! Option instruments and at-the-money strike selection.

use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Call,
    Put,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::Call => f.write_str("CE"),
            OptionKind::Put => f.write_str("PE"),
        }
    }
}

impl FromStr for OptionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CE" | "CALL" => Ok(OptionKind::Call),
            "PE" | "PUT" => Ok(OptionKind::Put),
            other => Err(format!("unknown option kind '{other}', expected CE or PE")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionInstrument {
    pub trading_symbol: String,
    pub underlying: String,
    pub expiry: NaiveDate,
    pub strike: f64,
    pub kind: OptionKind,
    pub lot_size: u32,
}

impl OptionInstrument {
    pub fn new(
        underlying: &str,
        expiry: NaiveDate,
        strike: f64,
        kind: OptionKind,
        lot_size: u32,
    ) -> Self {
        OptionInstrument {
            trading_symbol: trading_symbol(underlying, expiry, strike, kind),
            underlying: underlying.to_string(),
            expiry,
            strike,
            kind,
            lot_size,
        }
    }
}

/// `{UNDERLYING}_{YYYY-MM-DD}_{STRIKE}_{CE|PE}`
pub fn trading_symbol(underlying: &str, expiry: NaiveDate, strike: f64, kind: OptionKind) -> String {
    format!("{}_{}_{}_{}", underlying, expiry.format("%Y-%m-%d"), strike, kind)
}

/// Strike closest to `spot`; the lower strike wins a tie.
pub fn select_atm_strike(spot: f64, strikes: &[f64]) -> Option<f64> {
    strikes
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .min_by(|a, b| {
            (a - spot)
                .abs()
                .total_cmp(&(b - spot).abs())
                .then(a.total_cmp(b))
        })
}
