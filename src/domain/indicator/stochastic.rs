//! Stochastic oscillator (%K / %D).
//!
//! %K = (close - lowest low) / (highest high - lowest low) * 100 over the last
//! `k_period` points, falling back to the closes when high/low are absent.
//! A zero range yields 50. %D is the mean of the last `d_period` %K values.
//!
//! Warmup: k_period + d_period - 2 points are invalid, but still carry values
//! computed over the points available so far.
//!
//! A crossover is %K moving from below %D to above it between two consecutive
//! points; a crossunder is the reverse. A crossover while %K is under
//! [`OVERSOLD`] is a buy signal, a crossunder while %K is over [`OVERBOUGHT`]
//! a sell signal.

use std::fmt;

use crate::domain::indicator::{
    IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue, StochasticReading,
    STOCHASTIC_NEUTRAL,
};
use crate::domain::price::PricePoint;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;
pub const OVERSOLD: f64 = 10.0;
pub const OVERBOUGHT: f64 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StochasticSignal {
    Buy,
    Sell,
    Neutral,
}

impl fmt::Display for StochasticSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StochasticSignal::Buy => "buy",
            StochasticSignal::Sell => "sell",
            StochasticSignal::Neutral => "neutral",
        };
        f.write_str(name)
    }
}

/// `(k, d)` went from `k < d` at `prev` to `k > d` at `current`.
pub fn crossed_up(prev: (f64, f64), current: (f64, f64)) -> bool {
    current.0 > current.1 && prev.0 < prev.1
}

/// `(k, d)` went from `k > d` at `prev` to `k < d` at `current`.
pub fn crossed_down(prev: (f64, f64), current: (f64, f64)) -> bool {
    current.0 < current.1 && prev.0 > prev.1
}

pub fn signal(k: f64, crossed_up: bool, crossed_down: bool) -> StochasticSignal {
    if k < OVERSOLD && crossed_up {
        StochasticSignal::Buy
    } else if k > OVERBOUGHT && crossed_down {
        StochasticSignal::Sell
    } else {
        StochasticSignal::Neutral
    }
}

/// Reading at the last point of `series`, with crossings measured against
/// the point before it. Neutral when the series is empty.
pub fn latest_reading(series: &IndicatorSeries) -> StochasticReading {
    let kd = |p: &IndicatorPoint| match p.value {
        IndicatorValue::Stochastic { k, d } => Some((k, d)),
        _ => None,
    };
    let mut recent = series.values.iter().rev().filter_map(kd);

    let Some(current) = recent.next() else {
        return StochasticReading {
            k: STOCHASTIC_NEUTRAL,
            d: STOCHASTIC_NEUTRAL,
            crossed_up: false,
            crossed_down: false,
            signal: StochasticSignal::Neutral,
        };
    };
    let (up, down) = match recent.next() {
        Some(prev) => (crossed_up(prev, current), crossed_down(prev, current)),
        None => (false, false),
    };

    StochasticReading {
        k: current.0,
        d: current.1,
        crossed_up: up,
        crossed_down: down,
        signal: signal(current.0, up, down),
    }
}

pub fn calculate_stochastic(
    points: &[PricePoint],
    k_period: usize,
    d_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let mut k_values: Vec<f64> = Vec::with_capacity(points.len());
    let mut values = Vec::with_capacity(points.len());

    for (i, point) in points.iter().enumerate() {
        let window = &points[(i + 1).saturating_sub(k_period)..=i];
        let k = percent_k(window, point.close);
        k_values.push(k);

        let d_window = &k_values[k_values.len().saturating_sub(d_period)..];
        let d = d_window.iter().sum::<f64>() / d_window.len() as f64;

        values.push(IndicatorPoint {
            timestamp: point.timestamp,
            valid: i + 1 >= k_period + d_period - 1,
            value: IndicatorValue::Stochastic { k, d },
        });
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn percent_k(window: &[PricePoint], close: f64) -> f64 {
    let lowest = window.iter().map(PricePoint::low).fold(f64::INFINITY, f64::min);
    let highest = window
        .iter()
        .map(PricePoint::high)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = highest - lowest;
    if range > 0.0 {
        (close - lowest) / range * 100.0
    } else {
        STOCHASTIC_NEUTRAL
    }
}
