//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values
//! - `IndicatorSnapshot`: latest readings over a visible prefix, see [`compute`]
//!
//! Every function here is pure: the output depends only on the points passed
//! in, so recomputing over an identical prefix yields identical values and no
//! value can depend on data beyond the end of the prefix.

pub mod ema;
pub mod macd;
pub mod peaks;
pub mod rsi;
pub mod sma;
pub mod stochastic;

pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stochastic::{calculate_stochastic, StochasticSignal};

use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::fmt;

use crate::domain::error::ReplayError;
use crate::domain::price::PricePoint;

/// RSI reported while fewer than `period` deltas are visible.
pub const RSI_NEUTRAL: f64 = 50.0;
/// %K reported when the lookback range is zero.
pub const STOCHASTIC_NEUTRAL: f64 = 50.0;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd { line: f64, signal: f64, histogram: f64 },
    Stochastic { k: f64, d: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Most recent point, if it is past warmup.
    pub fn latest_valid(&self) -> Option<&IndicatorPoint> {
        self.values.last().filter(|p| p.valid)
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
        }
    }
}

/// Window lengths and peak-detection thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub ma_period: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stoch_k: usize,
    pub stoch_d: usize,
    pub peak_distance: usize,
    pub peak_prominence: f64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            ma_period: sma::DEFAULT_PERIOD,
            rsi_period: rsi::DEFAULT_PERIOD,
            macd_fast: macd::DEFAULT_FAST,
            macd_slow: macd::DEFAULT_SLOW,
            macd_signal: macd::DEFAULT_SIGNAL,
            stoch_k: stochastic::DEFAULT_K_PERIOD,
            stoch_d: stochastic::DEFAULT_D_PERIOD,
            peak_distance: peaks::DEFAULT_DISTANCE,
            peak_prominence: peaks::DEFAULT_PROMINENCE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdReading {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticReading {
    pub k: f64,
    pub d: f64,
    /// %K crossed above %D since the previous point.
    pub crossed_up: bool,
    /// %K crossed below %D since the previous point.
    pub crossed_down: bool,
    pub signal: StochasticSignal,
}

/// Indicator readings for one visible prefix.
///
/// `peaks` and `valleys` hold indices relative to the start of the prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    /// `None` only for an empty prefix.
    pub moving_average: Option<f64>,
    pub rsi: f64,
    /// `None` until enough points are visible for the signal line.
    pub macd: Option<MacdReading>,
    pub stochastic: StochasticReading,
    pub peaks: BTreeSet<usize>,
    pub valleys: BTreeSet<usize>,
    /// Full per-point series for chart overlays.
    pub overlays: Vec<IndicatorSeries>,
}

impl IndicatorSnapshot {
    pub fn overlay(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.overlays
            .iter()
            .find(|s| &s.indicator_type == indicator_type)
    }
}

/// Latest valid value of `series`, or `InsufficientData` while it is
/// still warming up.
pub fn latest_value(
    series: &IndicatorSeries,
    need: usize,
) -> Result<&IndicatorValue, ReplayError> {
    series
        .latest_valid()
        .map(|p| &p.value)
        .ok_or_else(|| ReplayError::InsufficientData {
            indicator: series.indicator_type.to_string(),
            have: series.values.len(),
            need,
        })
}

/// Compute every indicator over `points`.
///
/// Never fails: indicators that lack data report their neutral or
/// unavailable value instead.
pub fn compute(points: &[PricePoint], config: &IndicatorConfig) -> IndicatorSnapshot {
    let moving_average = sma::moving_average(points, config.ma_period);
    let sma_series = calculate_sma(points, config.ma_period);

    let rsi_series = calculate_rsi(points, config.rsi_period);
    let rsi = match latest_value(&rsi_series, config.rsi_period + 1) {
        Ok(IndicatorValue::Simple(v)) => *v,
        _ => RSI_NEUTRAL,
    };

    let macd_series = calculate_macd(
        points,
        config.macd_fast,
        config.macd_slow,
        config.macd_signal,
    );
    let macd = match latest_value(&macd_series, config.macd_slow + config.macd_signal) {
        Ok(IndicatorValue::Macd {
            line,
            signal,
            histogram,
        }) => Some(MacdReading {
            line: *line,
            signal: *signal,
            histogram: *histogram,
        }),
        _ => None,
    };

    let stoch_series = calculate_stochastic(points, config.stoch_k, config.stoch_d);
    let stochastic = stochastic::latest_reading(&stoch_series);

    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let (peaks, valleys) =
        peaks::peaks_and_valleys(&closes, config.peak_distance, config.peak_prominence);

    IndicatorSnapshot {
        moving_average,
        rsi,
        macd,
        stochastic,
        peaks,
        valleys,
        overlays: vec![sma_series, rsi_series, macd_series, stoch_series],
    }
}
