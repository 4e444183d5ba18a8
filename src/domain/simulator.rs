//! Trade simulator: at most one open position, an append-only ledger of
//! closed trades, and an audit trail of every trade request.
//!
//! Every mutation goes through [`TradeSimulator::apply_batch`]. A batch is
//! applied to a staged copy of the position and only committed if every
//! action in it succeeds, so a rejected request never leaves a partially
//! written ledger behind.

use chrono::NaiveDateTime;
use std::fmt;

use super::error::ReplayError;
use super::indicator::IndicatorSnapshot;
use super::policy::{AutoTradePolicy, PolicyContext};
use super::position::{Direction, Position, TradeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
    Close,
}

impl TradeAction {
    pub fn open(direction: Direction) -> TradeAction {
        match direction {
            Direction::Long => TradeAction::Buy,
            Direction::Short => TradeAction::Sell,
        }
    }

    fn name(self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Close => "close",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOrigin {
    Manual,
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Accepted,
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub time: NaiveDateTime,
    pub action: TradeAction,
    pub origin: TradeOrigin,
    pub price: f64,
    pub outcome: AuditOutcome,
}

/// Effect of an accepted action.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    Opened(Position),
    Closed(TradeRecord),
}

#[derive(Debug, Clone, Default)]
pub struct TradeSimulator {
    position: Option<Position>,
    ledger: Vec<TradeRecord>,
    audit: Vec<AuditEntry>,
    auto_trade: bool,
    last_acted: Option<usize>,
}

impl TradeSimulator {
    pub fn new(auto_trade: bool) -> Self {
        TradeSimulator {
            auto_trade,
            ..Default::default()
        }
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn ledger(&self) -> &[TradeRecord] {
        &self.ledger
    }

    pub fn audit(&self) -> &[AuditEntry] {
        &self.audit
    }

    pub fn auto_trade(&self) -> bool {
        self.auto_trade
    }

    pub fn set_auto_trade(&mut self, enabled: bool) {
        self.auto_trade = enabled;
    }

    /// Index of the most recent signal already acted on.
    pub fn last_acted(&self) -> Option<usize> {
        self.last_acted
    }

    /// Treat everything up to `index` as handled, e.g. after a manual trade.
    pub fn mark_acted(&mut self, index: usize) {
        self.last_acted = Some(self.last_acted.map_or(index, |l| l.max(index)));
    }

    /// Forget acted-on signals. Open position and ledger are kept.
    pub fn reset_signals(&mut self) {
        self.last_acted = None;
    }

    pub fn buy(&mut self, price: f64, time: NaiveDateTime) -> Result<Position, ReplayError> {
        self.open(TradeAction::Buy, price, time)
    }

    pub fn sell(&mut self, price: f64, time: NaiveDateTime) -> Result<Position, ReplayError> {
        self.open(TradeAction::Sell, price, time)
    }

    pub fn close(&mut self, price: f64, time: NaiveDateTime) -> Result<TradeRecord, ReplayError> {
        let events = self.apply_batch(&[TradeAction::Close], price, time, TradeOrigin::Manual)?;
        match events.into_iter().next() {
            Some(TradeEvent::Closed(record)) => Ok(record),
            _ => Err(ReplayError::invalid_state("close", "no trade recorded")),
        }
    }

    fn open(
        &mut self,
        action: TradeAction,
        price: f64,
        time: NaiveDateTime,
    ) -> Result<Position, ReplayError> {
        let events = self.apply_batch(&[action], price, time, TradeOrigin::Manual)?;
        match events.into_iter().next() {
            Some(TradeEvent::Opened(position)) => Ok(position),
            _ => Err(ReplayError::invalid_state(action.name(), "no position opened")),
        }
    }

    /// Apply `actions` in order at one price point, all or nothing.
    pub fn apply_batch(
        &mut self,
        actions: &[TradeAction],
        price: f64,
        time: NaiveDateTime,
        origin: TradeOrigin,
    ) -> Result<Vec<TradeEvent>, ReplayError> {
        let mut staged = self.position.clone();
        let mut events = Vec::with_capacity(actions.len());

        for &action in actions {
            match transition(&mut staged, action, price, time) {
                Ok(event) => events.push(event),
                Err(err) => {
                    tracing::warn!(%action, ?origin, %time, error = %err, "trade rejected");
                    self.audit.push(AuditEntry {
                        time,
                        action,
                        origin,
                        price,
                        outcome: AuditOutcome::Rejected(err.to_string()),
                    });
                    return Err(err);
                }
            }
        }

        self.position = staged;
        for (&action, event) in actions.iter().zip(&events) {
            match event {
                TradeEvent::Opened(p) => {
                    tracing::info!(direction = %p.direction, price, %time, ?origin, "position opened");
                }
                TradeEvent::Closed(r) => {
                    tracing::info!(direction = %r.direction, price, profit = r.profit, %time, ?origin, "position closed");
                    self.ledger.push(r.clone());
                }
            }
            self.audit.push(AuditEntry {
                time,
                action,
                origin,
                price,
                outcome: AuditOutcome::Accepted,
            });
        }
        Ok(events)
    }

    /// Ask `policy` for a decision and apply it.
    ///
    /// `current_index` and signal indices are relative to the visible
    /// prefix `indicators` was computed over. Signals at or before the last
    /// acted index are never acted on twice.
    pub fn auto_evaluate(
        &mut self,
        policy: &dyn AutoTradePolicy,
        indicators: &IndicatorSnapshot,
        price: f64,
        time: NaiveDateTime,
        current_index: usize,
    ) -> Result<Vec<TradeEvent>, ReplayError> {
        if !self.auto_trade {
            return Ok(Vec::new());
        }

        let ctx = PolicyContext {
            indicators,
            position: self.position.as_ref(),
            current_index,
            last_acted: self.last_acted,
        };
        let Some(decision) = policy.decide(&ctx) else {
            return Ok(Vec::new());
        };
        if self.last_acted.is_some_and(|l| decision.signal_index <= l) {
            tracing::debug!(
                policy = policy.name(),
                signal = decision.signal_index,
                "ignoring signal already acted on"
            );
            return Ok(Vec::new());
        }

        let events = self.apply_batch(&decision.actions, price, time, TradeOrigin::Auto)?;
        self.last_acted = Some(decision.signal_index);
        Ok(events)
    }
}

fn transition(
    position: &mut Option<Position>,
    action: TradeAction,
    price: f64,
    time: NaiveDateTime,
) -> Result<TradeEvent, ReplayError> {
    match action {
        TradeAction::Buy | TradeAction::Sell => {
            if let Some(open) = position {
                return Err(ReplayError::invalid_state(
                    action.name(),
                    format!("a {} position is already open", open.direction),
                ));
            }
            let direction = if action == TradeAction::Buy {
                Direction::Long
            } else {
                Direction::Short
            };
            let opened = Position {
                direction,
                entry_price: price,
                entry_time: time,
            };
            *position = Some(opened.clone());
            Ok(TradeEvent::Opened(opened))
        }
        TradeAction::Close => match position.as_ref() {
            None => Err(ReplayError::invalid_state("close", "no open position")),
            Some(open) if time < open.entry_time => Err(ReplayError::invalid_state(
                "close",
                format!("exit time {} is before entry time {}", time, open.entry_time),
            )),
            Some(open) => {
                let record = open.clone().close(price, time);
                *position = None;
                Ok(TradeEvent::Closed(record))
            }
        },
    }
}
