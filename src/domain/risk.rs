//! Risk-based position sizing for short option entries.
//!
//! quantity (lots) = floor(capital × max_loss_fraction / (sl_points × lot_size))

/// Capital available to the strategy and the share of it one trade may lose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapitalContext {
    pub total_capital: f64,
    pub max_loss_fraction: f64,
}

impl Default for CapitalContext {
    fn default() -> Self {
        CapitalContext {
            total_capital: 100_000.0,
            max_loss_fraction: 0.008,
        }
    }
}

impl CapitalContext {
    pub fn max_allowed_loss(&self) -> f64 {
        self.total_capital * self.max_loss_fraction
    }
}

/// Quantity and initial stop for a new short position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionPlan {
    pub quantity: u32,
    pub lot_size: u32,
    pub stop_loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingOutcome {
    Sized(PositionPlan),
    ZeroPositionSize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskSizer {
    capital: CapitalContext,
    sl_points: f64,
}

impl RiskSizer {
    pub fn new(capital: CapitalContext, sl_points: f64) -> Self {
        RiskSizer { capital, sl_points }
    }

    pub fn capital(&self) -> &CapitalContext {
        &self.capital
    }

    pub fn sl_points(&self) -> f64 {
        self.sl_points
    }

    /// Size a short entered at `entry_price` on an instrument of `lot_size` units.
    pub fn size(&self, entry_price: f64, lot_size: u32) -> SizingOutcome {
        let risk_per_lot = self.sl_points * lot_size as f64;
        let allowance = self.capital.max_allowed_loss();
        if risk_per_lot <= 0.0 || !allowance.is_finite() || allowance <= 0.0 {
            return SizingOutcome::ZeroPositionSize;
        }

        let mut quantity = (allowance / risk_per_lot).floor().min(u32::MAX as f64) as u32;
        // Division can round up across an integer boundary.
        while quantity > 0 && quantity as f64 * risk_per_lot > allowance {
            quantity -= 1;
        }

        if quantity == 0 {
            return SizingOutcome::ZeroPositionSize;
        }

        SizingOutcome::Sized(PositionPlan {
            quantity,
            lot_size,
            stop_loss: entry_price + self.sl_points,
        })
    }
}
