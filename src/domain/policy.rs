//! Auto-trade policies.
//!
//! A policy looks at the indicators of the current visible prefix and the
//! open position, and proposes trade actions. It never mutates anything: the
//! trade simulator applies (or rejects) what the policy proposes.

use super::indicator::IndicatorSnapshot;
use super::position::{Direction, Position};
use super::simulator::TradeAction;

pub const DEFAULT_MAX_SIGNAL_AGE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Peak,
    Valley,
}

impl Signal {
    /// Direction a signal argues for: long off a valley, short off a peak.
    pub fn direction(self) -> Direction {
        match self {
            Signal::Valley => Direction::Long,
            Signal::Peak => Direction::Short,
        }
    }
}

/// What a policy is allowed to see. Indices are relative to the start of
/// the visible prefix.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub indicators: &'a IndicatorSnapshot,
    pub position: Option<&'a Position>,
    pub current_index: usize,
    pub last_acted: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDecision {
    /// Index of the signal being acted on; recorded so it is not acted on again.
    pub signal_index: usize,
    pub actions: Vec<TradeAction>,
}

pub trait AutoTradePolicy: Send + Sync {
    fn name(&self) -> &str;

    fn decide(&self, ctx: &PolicyContext<'_>) -> Option<PolicyDecision>;
}

/// Most recent peak or valley strictly after `after`.
pub fn latest_signal(
    indicators: &IndicatorSnapshot,
    after: Option<usize>,
) -> Option<(usize, Signal)> {
    let newer = |idx: &&usize| after.is_none_or(|a| **idx > a);
    let peak = indicators.peaks.iter().rev().find(newer).copied();
    let valley = indicators.valleys.iter().rev().find(newer).copied();

    match (peak, valley) {
        (Some(p), Some(v)) if p > v => Some((p, Signal::Peak)),
        (_, Some(v)) => Some((v, Signal::Valley)),
        (Some(p), None) => Some((p, Signal::Peak)),
        (None, None) => None,
    }
}

/// Trade reversals on peaks and valleys.
///
/// Opens long on a valley and short on a peak when the signal is at most
/// `max_signal_age` points old. An opposite signal closes the open position
/// and, if recent, opens the other side. A signal agreeing with the open
/// position is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakValleyPolicy {
    pub max_signal_age: usize,
}

impl Default for PeakValleyPolicy {
    fn default() -> Self {
        PeakValleyPolicy {
            max_signal_age: DEFAULT_MAX_SIGNAL_AGE,
        }
    }
}

impl AutoTradePolicy for PeakValleyPolicy {
    fn name(&self) -> &str {
        "peak-valley"
    }

    fn decide(&self, ctx: &PolicyContext<'_>) -> Option<PolicyDecision> {
        let (signal_index, signal) = latest_signal(ctx.indicators, ctx.last_acted)?;
        let recent = ctx.current_index.saturating_sub(signal_index) <= self.max_signal_age;
        let wanted = signal.direction();

        let actions = match ctx.position {
            Some(position) if position.direction == wanted => return None,
            Some(_) if recent => vec![TradeAction::Close, TradeAction::open(wanted)],
            Some(_) => vec![TradeAction::Close],
            None if recent => vec![TradeAction::open(wanted)],
            None => return None,
        };

        Some(PolicyDecision {
            signal_index,
            actions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{compute, IndicatorConfig};
    use crate::domain::indicator::test_support::{make_points, ts};

    fn indicators_with(peaks: &[usize], valleys: &[usize]) -> IndicatorSnapshot {
        let mut snap = compute(&make_points(&[1.0, 2.0, 3.0]), &IndicatorConfig::default());
        snap.peaks = peaks.iter().copied().collect();
        snap.valleys = valleys.iter().copied().collect();
        snap
    }

    fn ctx<'a>(
        indicators: &'a IndicatorSnapshot,
        position: Option<&'a Position>,
        current_index: usize,
        last_acted: Option<usize>,
    ) -> PolicyContext<'a> {
        PolicyContext {
            indicators,
            position,
            current_index,
            last_acted,
        }
    }

    fn position(direction: Direction) -> Position {
        Position {
            direction,
            entry_price: 1.25,
            entry_time: ts(0),
        }
    }

    #[test]
    fn latest_signal_prefers_most_recent() {
        let snap = indicators_with(&[10, 30], &[20]);
        assert_eq!(latest_signal(&snap, None), Some((30, Signal::Peak)));
        assert_eq!(latest_signal(&snap, Some(30)), None);

        let snap = indicators_with(&[10], &[20]);
        assert_eq!(latest_signal(&snap, None), Some((20, Signal::Valley)));
        assert_eq!(latest_signal(&snap, Some(5)), Some((20, Signal::Valley)));
    }

    #[test]
    fn latest_signal_skips_acted() {
        let snap = indicators_with(&[10, 30], &[20]);
        assert_eq!(latest_signal(&snap, Some(20)), Some((30, Signal::Peak)));
    }

    #[test]
    fn flat_opens_long_on_valley() {
        let snap = indicators_with(&[], &[20]);
        let decision = PeakValleyPolicy::default()
            .decide(&ctx(&snap, None, 25, None))
            .unwrap();
        assert_eq!(decision.signal_index, 20);
        assert_eq!(decision.actions, vec![TradeAction::Buy]);
    }

    #[test]
    fn flat_opens_short_on_peak() {
        let snap = indicators_with(&[20], &[]);
        let decision = PeakValleyPolicy::default()
            .decide(&ctx(&snap, None, 25, None))
            .unwrap();
        assert_eq!(decision.actions, vec![TradeAction::Sell]);
    }

    #[test]
    fn stale_signal_is_ignored_when_flat() {
        let snap = indicators_with(&[], &[20]);
        let policy = PeakValleyPolicy { max_signal_age: 3 };
        assert!(policy.decide(&ctx(&snap, None, 24, None)).is_none());
        assert!(policy.decide(&ctx(&snap, None, 23, None)).is_some());
    }

    #[test]
    fn same_direction_signal_is_ignored() {
        let snap = indicators_with(&[], &[20]);
        let long = position(Direction::Long);
        let decision = PeakValleyPolicy::default().decide(&ctx(&snap, Some(&long), 25, None));
        assert!(decision.is_none());
    }

    #[test]
    fn opposite_signal_reverses() {
        let snap = indicators_with(&[22], &[20]);
        let long = position(Direction::Long);
        let decision = PeakValleyPolicy::default()
            .decide(&ctx(&snap, Some(&long), 25, Some(20)))
            .unwrap();
        assert_eq!(decision.signal_index, 22);
        assert_eq!(decision.actions, vec![TradeAction::Close, TradeAction::Sell]);
    }

    #[test]
    fn stale_opposite_signal_only_closes() {
        let snap = indicators_with(&[22], &[]);
        let long = position(Direction::Long);
        let policy = PeakValleyPolicy { max_signal_age: 1 };
        let decision = policy.decide(&ctx(&snap, Some(&long), 30, None)).unwrap();
        assert_eq!(decision.actions, vec![TradeAction::Close]);
    }

    #[test]
    fn policy_name() {
        assert_eq!(PeakValleyPolicy::default().name(), "peak-valley");
    }
}
