//! Strategy parameters shared by the backtest and live drivers.

use super::signal::DetectorConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub ema_period: usize,
    pub sl_points: f64,
    pub consolidation_window: usize,
    pub band_tolerance: f64,
    pub min_lower_highs: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            ema_period: 25,
            sl_points: 50.0,
            consolidation_window: 3,
            band_tolerance: 0.0,
            min_lower_highs: 1,
        }
    }
}

impl StrategyParams {
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            consolidation_window: self.consolidation_window,
            band_tolerance: self.band_tolerance,
            min_lower_highs: self.min_lower_highs,
        }
    }
}
