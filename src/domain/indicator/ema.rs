//! Exponential Moving Average over 15-minute closes.
//!
//! k = 2/(n+1), seed with the SMA of the first n closes, then
//! EMA[i] = C[i]*k + EMA[i-1]*(1-k). The first (n-1) bars have no value.

use crate::domain::candle::Candle;

/// Streaming EMA fed one completed bar close at a time.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    k: f64,
    seed_sum: f64,
    seen: usize,
    value: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        Ema {
            period,
            k: 2.0 / (period as f64 + 1.0),
            seed_sum: 0.0,
            seen: 0,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        self.seen += 1;
        match self.value {
            Some(prev) => {
                self.value = Some(close * self.k + prev * (1.0 - self.k));
            }
            None => {
                self.seed_sum += close;
                if self.seen == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }
}

/// EMA of each bar's close; `None` during warm-up.
pub fn calculate_ema(bars: &[Candle], period: usize) -> Vec<Option<f64>> {
    let mut ema = Ema::new(period);
    bars.iter().map(|bar| ema.update(bar.close)).collect()
}
