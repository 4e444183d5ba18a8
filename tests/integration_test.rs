//! Integration tests for the replay core.
//!
//! Tests cover:
//! - Pinned scenarios (manual round trip, short-prefix RSI, flat stochastic)
//! - Playback monotonicity and idempotent finish
//! - Indicator determinism and no look-ahead across a whole replay
//! - Trade simulator round trips and rejected operations
//! - Ledger append-only behavior under auto trading
//! - Change notifications across threads

mod common;

use common::*;
use proptest::prelude::*;
use replaytrader::domain::error::ReplayError;
use replaytrader::domain::indicator::{compute, IndicatorConfig, RSI_NEUTRAL, STOCHASTIC_NEUTRAL};
use replaytrader::domain::playback::PlaybackPhase;
use replaytrader::domain::position::Direction;
use replaytrader::domain::price::Series;
use replaytrader::domain::session::{ChannelObserver, Session, SessionConfig, SessionEvent};
use replaytrader::domain::simulator::TradeSimulator;
use replaytrader::ports::data_port::DataPort;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

mod scenarios {
    use super::*;

    #[test]
    fn manual_buy_at_t1_close_at_t3() {
        let mut session = manual_session(&[100.0, 105.0, 95.0, 110.0]);
        session.start().unwrap();
        session.tick().unwrap();

        let opened = session.buy().unwrap();
        let position = opened.position.unwrap();
        assert_eq!(position.direction, Direction::Long);
        assert_eq!(position.entry_price, 105.0);
        assert_eq!(position.entry_time, ts(1));

        session.tick().unwrap();
        session.tick().unwrap();
        let closed = session.close().unwrap();
        assert!(closed.position.is_none());

        let ledger = session.ledger();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].profit, 5.0);
        assert_eq!(ledger[0].exit_time, ts(3));
        assert_eq!(ledger[0].exit_price, 110.0);
    }

    #[test]
    fn rsi_on_short_prefix_is_neutral() {
        let mut session = manual_session(&[100.0, 105.0, 95.0, 110.0]);
        session.start().unwrap();
        session.tick().unwrap();
        let snapshot = session.tick().unwrap();

        assert_eq!(snapshot.visible.len(), 3);
        assert_eq!(snapshot.indicators.rsi, RSI_NEUTRAL);
    }

    #[test]
    fn flat_stochastic_is_neutral() {
        let snapshot = compute(&make_points(&[1.0850; 30]), &IndicatorConfig::default());
        assert_eq!(snapshot.stochastic.k, STOCHASTIC_NEUTRAL);
        assert_eq!(snapshot.stochastic.d, STOCHASTIC_NEUTRAL);
    }
}

mod playback {
    use super::*;

    proptest! {
        #[test]
        fn ticks_increase_until_end_then_stop(len in 2usize..60, step in 1usize..10) {
            let closes: Vec<f64> = (0..len).map(|i| 1.0 + i as f64 * 0.001).collect();
            let config = SessionConfig { step_size: step, ..manual_config() };
            let mut session = Session::with_default_policy(make_series(&closes), config).unwrap();
            session.start().unwrap();

            let mut last = session.playback().current_index;
            while !session.is_finished() {
                let snapshot = session.tick().unwrap();
                prop_assert!(snapshot.playback.current_index > last);
                prop_assert!(snapshot.playback.current_index - last <= step);
                last = snapshot.playback.current_index;
            }
            prop_assert_eq!(last, len - 1);

            for _ in 0..3 {
                prop_assert_eq!(
                    session.tick().unwrap_err(),
                    ReplayError::AlreadyFinished { index: len - 1 }
                );
                prop_assert_eq!(session.playback().current_index, len - 1);
                prop_assert_eq!(session.phase(), PlaybackPhase::Finished);
            }
        }
    }

    #[test]
    fn window_limits_visible_prefix() {
        let config = SessionConfig {
            start_index: 5,
            end_index: Some(9),
            ..manual_config()
        };
        let mut session = Session::with_default_policy(make_series(&wave(20)), config).unwrap();
        let first = session.start().unwrap();
        assert_eq!(first.visible.start_index(), 5);
        assert_eq!(first.visible.len(), 1);

        let last = session.run_to_end().unwrap();
        assert_eq!(last.playback.current_index, 9);
        assert_eq!(last.visible.len(), 5);
        assert_eq!(last.current().timestamp, ts(9));
    }
}

mod indicators {
    use super::*;

    proptest! {
        #[test]
        fn prefix_indicators_ignore_future_points(
            closes in prop::collection::vec(1.0f64..2.0, 5..80),
            tail in prop::collection::vec(1.0f64..2.0, 1..20),
            cut in 1usize..80,
        ) {
            let n = cut.min(closes.len());
            let mut extended = closes.clone();
            extended.extend(&tail);

            let config = IndicatorConfig::default();
            let short = Series::new(make_points(&closes)).unwrap();
            let long = Series::new(make_points(&extended)).unwrap();

            let a = compute(&short.prefix(0..=n - 1).unwrap(), &config);
            let b = compute(&long.prefix(0..=n - 1).unwrap(), &config);
            let again = compute(&short.prefix(0..=n - 1).unwrap(), &config);

            prop_assert_eq!(&a, &b);
            prop_assert_eq!(&a, &again);
        }
    }

    #[test]
    fn session_snapshot_matches_direct_compute() {
        let closes = wave(80);
        let mut session = manual_session(&closes);
        session.start().unwrap();
        for n in 2..=closes.len() {
            let snapshot = session.tick().unwrap();
            let direct = compute(&make_points(&closes[..n]), &IndicatorConfig::default());
            assert_eq!(snapshot.indicators, direct);
        }
    }

    #[test]
    fn signals_stay_inside_prefix() {
        let closes = wave(120);
        let mut session = manual_session(&closes);
        session.start().unwrap();
        while !session.is_finished() {
            let snapshot = session.tick().unwrap();
            let len = snapshot.visible.len();
            assert!(snapshot.indicators.peaks.iter().all(|&i| i < len));
            assert!(snapshot.indicators.valleys.iter().all(|&i| i < len));
        }
    }
}

mod trading {
    use super::*;

    proptest! {
        #[test]
        fn round_trip_profit_is_exact(entry in 0.5f64..2.0, exit in 0.5f64..2.0) {
            let mut sim = TradeSimulator::new(false);
            sim.buy(entry, ts(0)).unwrap();
            let long = sim.close(exit, ts(1)).unwrap();
            prop_assert_eq!(long.profit, exit - entry);

            sim.sell(entry, ts(2)).unwrap();
            let short = sim.close(exit, ts(3)).unwrap();
            prop_assert_eq!(short.profit, entry - exit);
        }

        #[test]
        fn buy_while_open_is_rejected(entry in 0.5f64..2.0, again in 0.5f64..2.0, short in any::<bool>()) {
            let mut sim = TradeSimulator::new(false);
            if short {
                sim.sell(entry, ts(0)).unwrap();
            } else {
                sim.buy(entry, ts(0)).unwrap();
            }
            let before = sim.position().cloned();

            let err = sim.buy(again, ts(1)).unwrap_err();
            prop_assert!(
                matches!(err, ReplayError::InvalidState { .. }),
                "unexpected error {:?}",
                err
            );
            prop_assert_eq!(sim.position().cloned(), before);
            prop_assert!(sim.ledger().is_empty());
        }
    }

    #[test]
    fn ledger_is_append_only_under_auto_trading() {
        let mut session =
            Session::with_default_policy(make_series(&wave(300)), SessionConfig::default())
                .unwrap();
        session.start().unwrap();

        let mut seen = Vec::new();
        while !session.is_finished() {
            let snapshot = session.tick().unwrap();
            let ledger = session.ledger();
            assert!(ledger.len() >= seen.len());
            assert_eq!(&ledger[..seen.len()], seen.as_slice());
            assert_eq!(snapshot.ledger_len, ledger.len());
            seen = ledger.to_vec();
        }
        assert!(!seen.is_empty(), "expected the wave to trigger auto trades");
    }

    #[test]
    fn auto_and_manual_trades_share_the_position() {
        let mut session =
            Session::with_default_policy(make_series(&wave(300)), SessionConfig::default())
                .unwrap();
        session.start().unwrap();
        while session.position().is_none() && !session.is_finished() {
            session.tick().unwrap();
        }
        assert!(session.position().is_some());
        assert!(matches!(
            session.buy(),
            Err(ReplayError::InvalidState { .. })
        ));
        assert!(session.close().is_ok());
        assert!(session.position().is_none());
    }
}

mod notifications {
    use super::*;

    #[test]
    fn events_reach_another_thread() {
        let (tx, rx) = mpsc::channel();
        let closes = wave(50);
        let mut session = manual_session(&closes);
        session.subscribe(Box::new(ChannelObserver::new(tx)));

        let handle = thread::spawn(move || {
            session.run_to_end().unwrap();
            session
        });
        let session = handle.join().unwrap();
        drop(session);

        let events: Vec<SessionEvent> = rx.iter().collect();
        let ticks = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Ticked { .. }))
            .count();
        assert_eq!(ticks, closes.len() - 1);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::PlaybackFinished {
                index: closes.len() - 1
            })
        );
    }
}

mod data_port {
    use super::*;

    #[test]
    fn mock_port_feeds_a_session() {
        let port = MockDataPort::new().with_series("eur_usd.csv", make_series(&wave(30)));
        let series = port.load_series(Path::new("eur_usd.csv")).unwrap();
        let mut session = Session::with_default_policy(series, manual_config()).unwrap();
        let snapshot = session.run_to_end().unwrap();
        assert_eq!(snapshot.visible.len(), 30);

        assert!(matches!(
            port.load_series(Path::new("missing.csv")),
            Err(ReplayError::Data { .. })
        ));
    }
}
