//! 5-minute to 15-minute resampling.
//!
//! Candles are grouped into clock-aligned 15-minute buckets. A bucket is
//! complete on its third candle; a short bucket (session end) is completed
//! when the next candle falls into another bucket.

use crate::domain::candle::{Candle, Interval};

const CANDLES_PER_BAR: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct BarAggregator {
    pending: Option<Candle>,
    count: usize,
}

/// What happened to the aggregator when a candle was pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorStep {
    /// A short bucket closed because this candle opened a new one.
    pub flushed: Option<Candle>,
    /// The bucket this candle belongs to completed with this candle.
    pub completed: Option<Candle>,
}

impl BarAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candle: &Candle) -> AggregatorStep {
        let bucket = Interval::FifteenMinute.bucket_start(candle.timestamp);

        let flushed = match &self.pending {
            Some(bar) if bar.timestamp != bucket => {
                self.count = 0;
                self.pending.take()
            }
            _ => None,
        };

        match self.pending.as_mut() {
            Some(bar) => bar.absorb(candle),
            None => {
                self.pending = Some(Candle {
                    timestamp: bucket,
                    ..candle.clone()
                });
            }
        }
        self.count += 1;

        let completed = if self.count == CANDLES_PER_BAR {
            self.count = 0;
            self.pending.take()
        } else {
            None
        };

        AggregatorStep { flushed, completed }
    }

    /// Close out a short trailing bucket, if any.
    pub fn finish(&mut self) -> Option<Candle> {
        self.count = 0;
        self.pending.take()
    }
}

/// Build the full 15-minute series from 5-minute candles.
pub fn aggregate_candles(candles: &[Candle]) -> Vec<Candle> {
    let mut aggregator = BarAggregator::new();
    let mut bars = Vec::with_capacity(candles.len() / CANDLES_PER_BAR + 1);
    for candle in candles {
        let step = aggregator.push(candle);
        bars.extend(step.flushed);
        bars.extend(step.completed);
    }
    bars.extend(aggregator.finish());
    bars
}
