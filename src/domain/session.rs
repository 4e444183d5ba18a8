//! Replay session: owns the series, playback clock and trade simulator, and
//! drives them one tick at a time.
//!
//! Each tick advances the clock, recomputes indicators over the new visible
//! prefix, lets the auto-trade policy act, then hands a [`Snapshot`] back to
//! the caller and notifies every subscribed observer. Nothing in a session
//! can see past the clock's current index.

use std::sync::mpsc::Sender;

use super::error::ReplayError;
use super::indicator::{self, IndicatorConfig, IndicatorSnapshot};
use super::playback::{PlaybackClock, PlaybackPhase, PlaybackState};
use super::policy::{AutoTradePolicy, PeakValleyPolicy, DEFAULT_MAX_SIGNAL_AGE};
use super::position::{Position, TradeRecord};
use super::price::{PricePoint, Series, VisiblePrefix};
use super::simulator::{TradeAction, TradeEvent, TradeSimulator};
use super::summary::LedgerSummary;

pub const DEFAULT_LEDGER_TAIL: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub start_index: usize,
    /// Last index to replay; `None` means the end of the series.
    pub end_index: Option<usize>,
    pub step_size: usize,
    pub auto_trade: bool,
    pub max_signal_age: usize,
    /// How many recent trades a snapshot carries.
    pub ledger_tail: usize,
    pub indicators: IndicatorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            start_index: 0,
            end_index: None,
            step_size: 1,
            auto_trade: true,
            max_signal_age: DEFAULT_MAX_SIGNAL_AGE,
            ledger_tail: DEFAULT_LEDGER_TAIL,
            indicators: IndicatorConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn default_policy(&self) -> PeakValleyPolicy {
        PeakValleyPolicy {
            max_signal_age: self.max_signal_age,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PhaseChanged { phase: PlaybackPhase },
    Ticked { index: usize },
    PositionOpened(Position),
    PositionClosed(TradeRecord),
    TradeRejected { action: TradeAction, reason: String },
    PlaybackFinished { index: usize },
}

impl From<TradeEvent> for SessionEvent {
    fn from(event: TradeEvent) -> Self {
        match event {
            TradeEvent::Opened(position) => SessionEvent::PositionOpened(position),
            TradeEvent::Closed(record) => SessionEvent::PositionClosed(record),
        }
    }
}

pub trait SessionObserver: Send {
    fn notify(&self, event: &SessionEvent);
}

/// Forwards every event over a channel. A dropped receiver is ignored.
pub struct ChannelObserver {
    sender: Sender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<SessionEvent>) -> Self {
        ChannelObserver { sender }
    }
}

impl SessionObserver for ChannelObserver {
    fn notify(&self, event: &SessionEvent) {
        let _ = self.sender.send(event.clone());
    }
}

/// Everything a presentation layer needs to draw one frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub playback: PlaybackState,
    pub phase: PlaybackPhase,
    pub visible: VisiblePrefix,
    pub indicators: IndicatorSnapshot,
    pub position: Option<Position>,
    pub ledger_tail: Vec<TradeRecord>,
    pub ledger_len: usize,
    /// Events raised by the call that produced this snapshot.
    pub events: Vec<SessionEvent>,
}

impl Snapshot {
    pub fn current(&self) -> &PricePoint {
        self.visible.latest()
    }

    pub fn unrealized_profit(&self) -> Option<f64> {
        self.position
            .as_ref()
            .map(|p| p.unrealized_profit(self.current().close))
    }
}

pub struct Session {
    series: Series,
    config: SessionConfig,
    clock: PlaybackClock,
    simulator: TradeSimulator,
    policy: Box<dyn AutoTradePolicy>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl Session {
    pub fn new(
        series: Series,
        config: SessionConfig,
        policy: Box<dyn AutoTradePolicy>,
    ) -> Result<Self, ReplayError> {
        let last = series.len().saturating_sub(1);
        let end_index = config.end_index.unwrap_or(last);
        let clock = PlaybackClock::new(series.len(), config.start_index, end_index, config.step_size)?;
        let simulator = TradeSimulator::new(config.auto_trade);

        tracing::debug!(
            points = series.len(),
            start = config.start_index,
            end = end_index,
            step = config.step_size,
            policy = policy.name(),
            "session created"
        );

        Ok(Session {
            series,
            config,
            clock,
            simulator,
            policy,
            observers: Vec::new(),
        })
    }

    /// Session driven by [`PeakValleyPolicy`] with the configured signal age.
    pub fn with_default_policy(series: Series, config: SessionConfig) -> Result<Self, ReplayError> {
        let policy = Box::new(config.default_policy());
        Session::new(series, config, policy)
    }

    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.clock.phase()
    }

    pub fn playback(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    pub fn position(&self) -> Option<&Position> {
        self.simulator.position()
    }

    pub fn ledger(&self) -> &[TradeRecord] {
        self.simulator.ledger()
    }

    pub fn simulator(&self) -> &TradeSimulator {
        &self.simulator
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary::compute(self.simulator.ledger())
    }

    pub fn set_auto_trade(&mut self, enabled: bool) {
        self.simulator.set_auto_trade(enabled);
    }

    pub fn start(&mut self) -> Result<Snapshot, ReplayError> {
        self.clock.start()?;
        tracing::info!(index = self.clock.current_index(), "playback started");

        let mut events = vec![SessionEvent::PhaseChanged {
            phase: self.clock.phase(),
        }];
        if self.clock.is_finished() {
            events.push(SessionEvent::PlaybackFinished {
                index: self.clock.current_index(),
            });
        }
        self.publish(events)
    }

    /// Advance one step. On `AlreadyFinished` or `InvalidState` from the
    /// clock nothing changes. A rejected auto-trade fails the tick with the
    /// position and ledger untouched; the clock step itself is kept.
    pub fn tick(&mut self) -> Result<Snapshot, ReplayError> {
        let state = self.clock.tick()?;
        let visible = self.series.prefix(self.clock.visible_range())?;
        let indicators = indicator::compute(&visible, &self.config.indicators);

        tracing::debug!(
            index = state.current_index,
            rsi = indicators.rsi,
            peaks = indicators.peaks.len(),
            valleys = indicators.valleys.len(),
            "tick"
        );

        let mut events = vec![SessionEvent::Ticked {
            index: state.current_index,
        }];
        let finished = self
            .clock
            .is_finished()
            .then_some(SessionEvent::PlaybackFinished {
                index: state.current_index,
            });

        let latest = visible.latest();
        let relative_index = visible.len() - 1;
        match self.simulator.auto_evaluate(
            self.policy.as_ref(),
            &indicators,
            latest.close,
            latest.timestamp,
            relative_index,
        ) {
            Ok(trades) => events.extend(trades.into_iter().map(SessionEvent::from)),
            Err(err) => {
                // the clock step is committed, so observers still hear about it
                events.extend(finished);
                self.broadcast(&events);
                self.notify_rejection(&err);
                return Err(err);
            }
        }

        if let Some(event) = finished {
            tracing::info!(index = state.current_index, trades = self.ledger().len(), "playback finished");
            events.push(event);
        }

        let snapshot = self.assemble(visible, indicators, events);
        self.broadcast(&snapshot.events);
        Ok(snapshot)
    }

    pub fn pause(&mut self) -> Result<Snapshot, ReplayError> {
        self.clock.pause()?;
        tracing::info!(index = self.clock.current_index(), "playback paused");
        self.publish(vec![SessionEvent::PhaseChanged {
            phase: PlaybackPhase::Paused,
        }])
    }

    pub fn resume(&mut self) -> Result<Snapshot, ReplayError> {
        self.clock.resume()?;
        tracing::info!(index = self.clock.current_index(), "playback resumed");
        self.publish(vec![SessionEvent::PhaseChanged {
            phase: PlaybackPhase::Running,
        }])
    }

    /// Rewind to the start. The ledger is kept.
    ///
    /// Rejected with `InvalidState` while a position is open: replaying from
    /// an earlier point could otherwise close it before it was entered.
    pub fn reset(&mut self) -> Result<Snapshot, ReplayError> {
        if let Some(position) = self.simulator.position() {
            return Err(ReplayError::invalid_state(
                "reset",
                format!("a {} position is open, close it first", position.direction),
            ));
        }
        self.clock.reset();
        self.simulator.reset_signals();
        tracing::info!("playback reset");
        self.publish(vec![SessionEvent::PhaseChanged {
            phase: PlaybackPhase::Idle,
        }])
    }

    pub fn buy(&mut self) -> Result<Snapshot, ReplayError> {
        self.manual(TradeAction::Buy)
    }

    pub fn sell(&mut self) -> Result<Snapshot, ReplayError> {
        self.manual(TradeAction::Sell)
    }

    pub fn close(&mut self) -> Result<Snapshot, ReplayError> {
        self.manual(TradeAction::Close)
    }

    /// Current frame without advancing.
    pub fn snapshot(&self) -> Result<Snapshot, ReplayError> {
        let visible = self.series.prefix(self.clock.visible_range())?;
        let indicators = indicator::compute(&visible, &self.config.indicators);
        Ok(self.assemble(visible, indicators, Vec::new()))
    }

    /// Play through to `end_index`, starting or resuming as needed.
    pub fn run_to_end(&mut self) -> Result<Snapshot, ReplayError> {
        match self.clock.phase() {
            PlaybackPhase::Idle => {
                self.start()?;
            }
            PlaybackPhase::Paused => {
                self.resume()?;
            }
            PlaybackPhase::Running | PlaybackPhase::Finished => {}
        }

        let mut last = None;
        while !self.clock.is_finished() {
            last = Some(self.tick()?);
        }
        match last {
            Some(snapshot) => Ok(snapshot),
            None => self.snapshot(),
        }
    }

    fn manual(&mut self, action: TradeAction) -> Result<Snapshot, ReplayError> {
        if self.clock.phase() == PlaybackPhase::Idle {
            let err = ReplayError::invalid_state(&action.to_string(), "playback not started");
            self.notify_rejection_for(action, &err);
            return Err(err);
        }

        let index = self.clock.current_index();
        let point = self
            .series
            .get(index)
            .cloned()
            .ok_or_else(|| ReplayError::out_of_range(format!("no point at index {}", index)))?;

        let result = match action {
            TradeAction::Buy => self
                .simulator
                .buy(point.close, point.timestamp)
                .map(SessionEvent::PositionOpened),
            TradeAction::Sell => self
                .simulator
                .sell(point.close, point.timestamp)
                .map(SessionEvent::PositionOpened),
            TradeAction::Close => self
                .simulator
                .close(point.close, point.timestamp)
                .map(SessionEvent::PositionClosed),
        };

        match result {
            Ok(event) => {
                self.simulator
                    .mark_acted(index - self.clock.state().start_index);
                self.publish(vec![event])
            }
            Err(err) => {
                self.notify_rejection_for(action, &err);
                Err(err)
            }
        }
    }

    fn publish(&self, events: Vec<SessionEvent>) -> Result<Snapshot, ReplayError> {
        let visible = self.series.prefix(self.clock.visible_range())?;
        let indicators = indicator::compute(&visible, &self.config.indicators);
        let snapshot = self.assemble(visible, indicators, events);
        self.broadcast(&snapshot.events);
        Ok(snapshot)
    }

    fn assemble(
        &self,
        visible: VisiblePrefix,
        indicators: IndicatorSnapshot,
        events: Vec<SessionEvent>,
    ) -> Snapshot {
        let ledger = self.simulator.ledger();
        let tail_start = ledger.len().saturating_sub(self.config.ledger_tail);
        Snapshot {
            playback: self.clock.state(),
            phase: self.clock.phase(),
            visible,
            indicators,
            position: self.simulator.position().cloned(),
            ledger_tail: ledger[tail_start..].to_vec(),
            ledger_len: ledger.len(),
            events,
        }
    }

    fn broadcast(&self, events: &[SessionEvent]) {
        for event in events {
            for observer in &self.observers {
                observer.notify(event);
            }
        }
    }

    fn notify_rejection(&self, err: &ReplayError) {
        if let Some(entry) = self.simulator.audit().last() {
            self.notify_rejection_for(entry.action, err);
        }
    }

    fn notify_rejection_for(&self, action: TradeAction, err: &ReplayError) {
        self.broadcast(&[SessionEvent::TradeRejected {
            action,
            reason: err.to_string(),
        }]);
    }
}
