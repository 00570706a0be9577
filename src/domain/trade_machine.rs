//! Lifecycle of the single open short position.
//!
//! Idle -> Open -> BreakevenArmed -> (closed) -> Idle. While Open the stop
//! is checked before the 1:1 target; once BreakevenArmed the stop sits at
//! the entry price and a reverse-swing exit takes profit at the close.

use chrono::NaiveDateTime;

use super::candle::Candle;
use super::position::{ClosedTrade, Position, PositionState, TradeOutcome};
use super::risk::SizingOutcome;
use super::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineState {
    Idle,
    Open,
    BreakevenArmed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Opened(Position),
    ZeroPositionSize,
    AlreadyOpen,
}

/// Decision for one candle, computed without mutating the machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Hold,
    PromoteBreakeven,
    Close { price: f64, outcome: TradeOutcome },
}

#[derive(Debug, Clone)]
pub struct TradeStateMachine {
    sl_points: f64,
    position: Option<Position>,
}

impl TradeStateMachine {
    pub fn new(sl_points: f64) -> Self {
        TradeStateMachine {
            sl_points,
            position: None,
        }
    }

    pub fn state(&self) -> MachineState {
        match self.position.as_ref().map(|p| p.state) {
            None | Some(PositionState::Closed) => MachineState::Idle,
            Some(PositionState::Open) => MachineState::Open,
            Some(PositionState::BreakevenArmed) => MachineState::BreakevenArmed,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.state() == MachineState::Idle
    }

    /// Open a short at the candle close if idle and the plan has size.
    pub fn open(&mut self, candle: &Candle, sizing: SizingOutcome) -> EntryOutcome {
        if !self.is_idle() {
            return EntryOutcome::AlreadyOpen;
        }
        let plan = match sizing {
            SizingOutcome::Sized(plan) => plan,
            SizingOutcome::ZeroPositionSize => return EntryOutcome::ZeroPositionSize,
        };
        let position = Position {
            entry_price: candle.close,
            quantity: plan.quantity,
            lot_size: plan.lot_size,
            stop_loss: plan.stop_loss,
            entry_timestamp: candle.timestamp,
            state: PositionState::Open,
        };
        self.position = Some(position.clone());
        EntryOutcome::Opened(position)
    }

    /// What the candle (and detector signal) does to the open position.
    pub fn evaluate(&self, candle: &Candle, signal: Signal) -> Transition {
        let Some(pos) = self.position.as_ref() else {
            return Transition::Hold;
        };
        match pos.state {
            PositionState::Open => {
                if pos.should_stop_loss(candle.high) {
                    Transition::Close {
                        price: pos.stop_loss,
                        outcome: TradeOutcome::Loss,
                    }
                } else if pos.reached_one_to_one(candle.low, self.sl_points) {
                    Transition::PromoteBreakeven
                } else {
                    Transition::Hold
                }
            }
            PositionState::BreakevenArmed => {
                if pos.should_stop_loss(candle.high) {
                    Transition::Close {
                        price: pos.entry_price,
                        outcome: TradeOutcome::Breakeven,
                    }
                } else if signal == Signal::Exit {
                    Transition::Close {
                        price: candle.close,
                        outcome: TradeOutcome::Profit,
                    }
                } else {
                    Transition::Hold
                }
            }
            PositionState::Closed => Transition::Hold,
        }
    }

    /// Commit a transition produced by [`evaluate`](Self::evaluate).
    pub fn apply(&mut self, transition: Transition, timestamp: NaiveDateTime) -> Option<ClosedTrade> {
        match transition {
            Transition::Hold => None,
            Transition::PromoteBreakeven => {
                if let Some(pos) = self.position.as_mut() {
                    if pos.state == PositionState::Open {
                        pos.stop_loss = pos.entry_price;
                        pos.state = PositionState::BreakevenArmed;
                    }
                }
                None
            }
            Transition::Close { price, outcome } => self.close(price, timestamp, outcome),
        }
    }

    pub fn on_candle(&mut self, candle: &Candle, signal: Signal) -> Option<ClosedTrade> {
        let transition = self.evaluate(candle, signal);
        self.apply(transition, candle.timestamp)
    }

    /// Close immediately at `price`, regardless of state.
    pub fn flatten(&mut self, price: f64, timestamp: NaiveDateTime) -> Option<ClosedTrade> {
        self.close(price, timestamp, TradeOutcome::Flattened)
    }

    fn close(
        &mut self,
        exit_price: f64,
        exit_timestamp: NaiveDateTime,
        outcome: TradeOutcome,
    ) -> Option<ClosedTrade> {
        let mut pos = self.position.take()?;
        pos.state = PositionState::Closed;
        Some(ClosedTrade {
            entry_price: pos.entry_price,
            exit_price,
            quantity: pos.quantity,
            lot_size: pos.lot_size,
            entry_timestamp: pos.entry_timestamp,
            exit_timestamp,
            outcome,
            pnl: pos.pnl_at(exit_price),
        })
    }
}
