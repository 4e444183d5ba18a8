//! Configuration validation.
//!
//! Checks every field before a session is built, so bad values surface as
//! `ConfigInvalid` / `ConfigMissing` instead of odd replay behavior.

use crate::domain::error::ReplayError;
use crate::domain::indicator::{macd, peaks, rsi, sma, stochastic};
use crate::domain::price::parse_timestamp;
use crate::ports::config_port::ConfigPort;

pub fn validate_replay_config(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    validate_window(config)?;
    validate_playback(config)?;
    validate_trading(config)?;
    validate_indicators(config)?;
    Ok(())
}

/// `[data] path` must name a file. Not required when the path comes from
/// the command line.
pub fn validate_data_path(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(ReplayError::ConfigMissing {
            section: "data".to_string(),
            key: "path".to_string(),
        }),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ReplayError {
    ReplayError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let start = optional_timestamp(config, "start")?;
    let end = optional_timestamp(config, "end")?;

    match (start, end) {
        (Some(start), Some(end)) if start > end => {
            Err(invalid("data", "start", "start must not be after end"))
        }
        _ => Ok(()),
    }
}

fn optional_timestamp(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<chrono::NaiveDateTime>, ReplayError> {
    match config.get_string("data", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s).map(Some).ok_or_else(|| {
            invalid(
                "data",
                key,
                format!("invalid {} format, expected YYYY-MM-DD [HH:MM[:SS]]", key),
            )
        }),
    }
}

/// A key that is present must hold a number; lookups with a default would
/// otherwise silently fall back.
fn require_numeric<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    keys: &[&str],
) -> Result<(), ReplayError> {
    for &key in keys {
        if let Some(raw) = config.get_string(section, key) {
            if raw.trim().parse::<T>().is_err() {
                return Err(invalid(section, key, format!("{:?} is not a valid number", raw)));
            }
        }
    }
    Ok(())
}

fn validate_playback(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    require_numeric::<i64>(config, "playback", &["step_size", "start_index", "end_index"])?;

    if config.get_int("playback", "step_size", 1) < 1 {
        return Err(invalid("playback", "step_size", "step_size must be at least 1"));
    }

    let start = config.get_int("playback", "start_index", 0);
    if start < 0 {
        return Err(invalid("playback", "start_index", "start_index must be non-negative"));
    }
    if config.get_string("playback", "end_index").is_some() {
        let end = config.get_int("playback", "end_index", -1);
        if end < 0 {
            return Err(invalid("playback", "end_index", "end_index must be non-negative"));
        }
        if end < start {
            return Err(invalid("playback", "end_index", "end_index must not be before start_index"));
        }
    }
    Ok(())
}

fn validate_trading(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    require_numeric::<i64>(config, "trading", &["max_signal_age", "ledger_tail"])?;
    if config.get_int("trading", "max_signal_age", 100) < 0 {
        return Err(invalid("trading", "max_signal_age", "max_signal_age must be non-negative"));
    }
    if config.get_int("trading", "ledger_tail", 10) < 0 {
        return Err(invalid("trading", "ledger_tail", "ledger_tail must be non-negative"));
    }
    Ok(())
}

fn validate_indicators(config: &dyn ConfigPort) -> Result<(), ReplayError> {
    let windows = [
        ("ma_period", sma::DEFAULT_PERIOD),
        ("rsi_period", rsi::DEFAULT_PERIOD),
        ("macd_fast", macd::DEFAULT_FAST),
        ("macd_slow", macd::DEFAULT_SLOW),
        ("macd_signal", macd::DEFAULT_SIGNAL),
        ("stoch_k", stochastic::DEFAULT_K_PERIOD),
        ("stoch_d", stochastic::DEFAULT_D_PERIOD),
        ("peak_distance", peaks::DEFAULT_DISTANCE),
    ];
    let keys: Vec<&str> = windows.iter().map(|(key, _)| *key).collect();
    require_numeric::<i64>(config, "indicators", &keys)?;
    require_numeric::<f64>(config, "indicators", &["peak_prominence"])?;

    for (key, default) in windows {
        if config.get_int("indicators", key, default as i64) < 1 {
            return Err(invalid("indicators", key, format!("{} must be at least 1", key)));
        }
    }

    let fast = config.get_int("indicators", "macd_fast", macd::DEFAULT_FAST as i64);
    let slow = config.get_int("indicators", "macd_slow", macd::DEFAULT_SLOW as i64);
    if fast >= slow {
        return Err(invalid("indicators", "macd_fast", "macd_fast must be less than macd_slow"));
    }

    let prominence = config.get_double("indicators", "peak_prominence", peaks::DEFAULT_PROMINENCE);
    if !(prominence > 0.0 && prominence <= 1.0) {
        return Err(invalid(
            "indicators",
            "peak_prominence",
            "peak_prominence must be in (0, 1]",
        ));
    }
    Ok(())
}
