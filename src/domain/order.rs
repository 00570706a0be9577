//! Order and fill types exchanged with the broker port.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderType {
    Market,
    Limit(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: Side,
    /// Units, not lots.
    pub quantity: u64,
    pub order_type: OrderType,
    /// Last underlying price when the order was raised.
    pub reference_price: f64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub order_id: u64,
    pub instrument: String,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    pub timestamp: NaiveDateTime,
}
