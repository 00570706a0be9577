//! Simulated broker that fills market orders at the reference price.

use crate::domain::error::TraderError;
use crate::domain::order::{Fill, OrderRequest, OrderType, Side};
use crate::ports::order_port::OrderPort;

#[derive(Debug, Default)]
pub struct PaperBroker {
    next_order_id: u64,
    reject_all: bool,
    orders: Vec<OrderRequest>,
}

impl PaperBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Broker that refuses every order, for exercising rejection paths.
    pub fn rejecting() -> Self {
        Self {
            reject_all: true,
            ..Self::default()
        }
    }

    /// Accepted orders, oldest first.
    pub fn orders(&self) -> &[OrderRequest] {
        &self.orders
    }

    /// Signed units currently held per the accepted orders (short is negative).
    pub fn net_units(&self) -> i64 {
        self.orders
            .iter()
            .map(|o| match o.side {
                Side::Buy => o.quantity as i64,
                Side::Sell => -(o.quantity as i64),
            })
            .sum()
    }
}

impl OrderPort for PaperBroker {
    fn place_order(&mut self, order: &OrderRequest) -> Result<Fill, TraderError> {
        let reject = |reason: &str| TraderError::OrderRejected {
            instrument: order.instrument.clone(),
            reason: reason.to_string(),
        };

        if self.reject_all {
            return Err(reject("paper broker configured to reject"));
        }
        if order.quantity == 0 {
            return Err(reject("zero quantity"));
        }
        let price = match order.order_type {
            OrderType::Market => order.reference_price,
            OrderType::Limit(limit) => limit,
        };

        self.next_order_id += 1;
        self.orders.push(order.clone());
        Ok(Fill {
            order_id: self.next_order_id,
            instrument: order.instrument.clone(),
            side: order.side,
            quantity: order.quantity,
            price,
            timestamp: order.timestamp,
        })
    }
}
