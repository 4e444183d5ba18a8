//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded with the SMA of the first
//! `signal` line values after the slow EMA becomes available
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: slow + signal - 1 points (the first valid value needs slow + signal points)

use crate::domain::indicator::ema::ema_raw;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price::PricePoint;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    points: &[PricePoint],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    if points.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let ema_fast = ema_raw(&closes, fast);
    let ema_slow = ema_raw(&closes, slow);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f.unwrap_or(0.0) - s.unwrap_or(0.0))
        .collect();

    let k = 2.0 / (signal_period as f64 + 1.0);
    let mut signal_line: Vec<f64> = vec![0.0; points.len()];
    let macd_warmup = slow.max(fast) - 1;

    if macd_warmup + signal_period <= points.len() {
        let seed_end = macd_warmup + signal_period;
        let mut signal_ema =
            macd_line[macd_warmup..seed_end].iter().sum::<f64>() / signal_period as f64;
        signal_line[seed_end - 1] = signal_ema;

        for i in seed_end..points.len() {
            signal_ema = macd_line[i] * k + signal_ema * (1.0 - k);
            signal_line[i] = signal_ema;
        }
    }

    let signal_warmup = slow.max(fast) + signal_period - 1;

    let values = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            IndicatorPoint {
                timestamp: point.timestamp,
                valid: i >= signal_warmup,
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_points;

    fn default_macd(points: &[PricePoint]) -> IndicatorSeries {
        calculate_macd(points, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
    }

    fn trending(n: usize) -> Vec<PricePoint> {
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        make_points(&prices)
    }

    #[test]
    fn macd_warmup_default() {
        let series = default_macd(&trending(40));

        let warmup = DEFAULT_SLOW + DEFAULT_SIGNAL - 1;
        for i in 0..warmup {
            assert!(!series.values[i].valid, "Index {} should not be valid", i);
        }
        assert!(series.values[warmup].valid, "Index {} should be valid", warmup);
    }

    #[test]
    fn macd_histogram_equals_line_minus_signal() {
        let series = default_macd(&trending(40));

        for point in series.values.iter().filter(|p| p.valid) {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = point.value
            {
                assert!((histogram - (line - signal)).abs() < f64::EPSILON);
            }
        }
    }

    #[test]
    fn macd_indicator_type() {
        let series = calculate_macd(&make_points(&[100.0, 101.0, 102.0]), 5, 10, 3);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Macd {
                fast: 5,
                slow: 10,
                signal: 3
            }
        );
    }

    #[test]
    fn macd_empty_points() {
        assert!(default_macd(&[]).values.is_empty());
    }

    #[test]
    fn macd_zero_period() {
        let points = make_points(&[100.0, 101.0, 102.0]);
        assert!(calculate_macd(&points, 0, 26, 9).values.is_empty());
        assert!(calculate_macd(&points, 12, 0, 9).values.is_empty());
        assert!(calculate_macd(&points, 12, 26, 0).values.is_empty());
    }

    #[test]
    fn macd_line_is_ema_fast_minus_ema_slow() {
        let prices = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];
        let series = calculate_macd(&make_points(&prices), 3, 5, 2);

        let ema_fast = ema_raw(&prices, 3);
        let ema_slow = ema_raw(&prices, 5);

        for (i, point) in series.values.iter().enumerate().skip(4) {
            if let IndicatorValue::Macd { line, .. } = point.value {
                let expected = ema_fast[i].unwrap() - ema_slow[i].unwrap();
                assert!(
                    (line - expected).abs() < f64::EPSILON,
                    "MACD line mismatch at index {}",
                    i
                );
            }
        }
    }

    #[test]
    fn macd_constant_prices_are_zero() {
        let points = make_points(&[1.25; 40]);
        let series = default_macd(&points);
        let last = series.latest_valid().unwrap();
        if let IndicatorValue::Macd {
            line,
            signal,
            histogram,
        } = last.value
        {
            assert!(line.abs() < 1e-12);
            assert!(signal.abs() < 1e-12);
            assert!(histogram.abs() < 1e-12);
        } else {
            panic!("Expected Macd value");
        }
    }

    #[test]
    fn macd_custom_parameters() {
        let series = calculate_macd(&trending(20), 5, 10, 3);
        let warmup = 10 + 3 - 1;
        assert!(!series.values[warmup - 1].valid);
        assert!(series.values[warmup].valid);
    }
}
