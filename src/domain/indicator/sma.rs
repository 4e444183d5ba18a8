//! Simple moving average of closes.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::price::PricePoint;

pub const DEFAULT_PERIOD: usize = 50;

/// Rolling SMA. Warmup: first (n-1) points are invalid but still carry the
/// mean of the points seen so far.
pub fn calculate_sma(points: &[PricePoint], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let mut values = Vec::with_capacity(points.len());
    let mut sum = 0.0;

    for (i, point) in points.iter().enumerate() {
        sum += point.close;
        if i >= period {
            sum -= points[i - period].close;
        }
        let count = (i + 1).min(period);
        values.push(IndicatorPoint {
            timestamp: point.timestamp,
            valid: i + 1 >= period,
            value: IndicatorValue::Simple(sum / count as f64),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

/// Mean of the last `period` closes, or of every close when fewer are
/// available. `None` for an empty slice.
pub fn moving_average(points: &[PricePoint], period: usize) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let window = &points[points.len().saturating_sub(period.max(1))..];
    Some(window.iter().map(|p| p.close).sum::<f64>() / window.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_points;
    use approx::assert_relative_eq;

    #[test]
    fn moving_average_uses_available_points() {
        let points = make_points(&[1.0, 2.0, 3.0]);
        assert_relative_eq!(moving_average(&points, 50).unwrap(), 2.0);
    }

    #[test]
    fn moving_average_uses_last_window() {
        let points = make_points(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_relative_eq!(moving_average(&points, 2).unwrap(), 4.5);
    }

    #[test]
    fn moving_average_empty() {
        assert!(moving_average(&[], 50).is_none());
    }

    #[test]
    fn sma_series_warmup_and_values() {
        let series = calculate_sma(&make_points(&[2.0, 4.0, 6.0, 8.0]), 3);
        assert_eq!(series.indicator_type, IndicatorType::Sma(3));
        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert_eq!(series.values[2].value, IndicatorValue::Simple(4.0));
        assert_eq!(series.values[3].value, IndicatorValue::Simple(6.0));
    }

    #[test]
    fn sma_series_last_matches_moving_average() {
        let prices: Vec<f64> = (0..80).map(|i| 1.2 + i as f64 * 0.001).collect();
        let points = make_points(&prices);
        let series = calculate_sma(&points, DEFAULT_PERIOD);
        let last = match series.values.last().unwrap().value {
            IndicatorValue::Simple(v) => v,
            _ => unreachable!(),
        };
        assert_relative_eq!(
            last,
            moving_average(&points, DEFAULT_PERIOD).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn sma_zero_period() {
        assert!(calculate_sma(&make_points(&[1.0]), 0).values.is_empty());
    }
}
