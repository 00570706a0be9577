//! Order execution port trait.

use crate::domain::error::TraderError;
use crate::domain::order::{Fill, OrderRequest};

pub trait OrderPort {
    /// Submit an order; fails with `OrderRejected` if the broker refuses it.
    fn place_order(&mut self, order: &OrderRequest) -> Result<Fill, TraderError>;
}
