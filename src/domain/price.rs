//! Price points, the loaded series, and the visible prefix view.

use chrono::{NaiveDate, NaiveDateTime};
use std::ops::{Deref, RangeInclusive};
use std::sync::Arc;

use super::error::ReplayError;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl PricePoint {
    pub fn new(timestamp: NaiveDateTime, close: f64) -> Self {
        PricePoint {
            timestamp,
            close,
            high: None,
            low: None,
        }
    }

    /// High of the period, or the close when only closes were loaded.
    pub fn high(&self) -> f64 {
        self.high.unwrap_or(self.close)
    }

    /// Low of the period, or the close when only closes were loaded.
    pub fn low(&self) -> f64 {
        self.low.unwrap_or(self.close)
    }
}

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp as written in data files and config. A bare date
/// means midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Ordered, immutable price history shared by everything in a session.
///
/// Cloning is cheap: the points live behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Series {
    points: Arc<[PricePoint]>,
}

impl Series {
    /// Build a series, rejecting duplicate or out-of-order timestamps and
    /// non-finite prices.
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ReplayError> {
        for (i, point) in points.iter().enumerate() {
            if !point.close.is_finite() {
                return Err(ReplayError::InvalidSeries {
                    reason: format!("non-finite close at index {}", i),
                });
            }
            if point.high.is_some_and(|h| !h.is_finite())
                || point.low.is_some_and(|l| !l.is_finite())
            {
                return Err(ReplayError::InvalidSeries {
                    reason: format!("non-finite high/low at index {}", i),
                });
            }
        }

        if let Some(i) = points
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(ReplayError::InvalidSeries {
                reason: format!(
                    "timestamps must be strictly increasing: {} follows {}",
                    points[i + 1].timestamp,
                    points[i].timestamp
                ),
            });
        }

        Ok(Series {
            points: points.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PricePoint> {
        self.points.get(index)
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|p| p.timestamp)
    }

    /// First index whose timestamp is at or after `ts`.
    pub fn index_at_or_after(&self, ts: NaiveDateTime) -> Option<usize> {
        let idx = self.points.partition_point(|p| p.timestamp < ts);
        (idx < self.points.len()).then_some(idx)
    }

    /// Last index whose timestamp is at or before `ts`.
    pub fn index_at_or_before(&self, ts: NaiveDateTime) -> Option<usize> {
        let idx = self.points.partition_point(|p| p.timestamp <= ts);
        idx.checked_sub(1)
    }

    /// View over `range` (inclusive). Errors instead of clamping.
    pub fn prefix(&self, range: RangeInclusive<usize>) -> Result<VisiblePrefix, ReplayError> {
        let (start, end) = (*range.start(), *range.end());
        if start > end || end >= self.points.len() {
            return Err(ReplayError::out_of_range(format!(
                "range {}..={} outside series of {} points",
                start,
                end,
                self.points.len()
            )));
        }
        Ok(VisiblePrefix {
            series: self.clone(),
            start,
            end,
        })
    }
}

/// The slice of a series the rest of the system may observe at a given
/// point in playback. Dereferences to `[PricePoint]`.
#[derive(Debug, Clone)]
pub struct VisiblePrefix {
    series: Series,
    start: usize,
    end: usize,
}

impl VisiblePrefix {
    /// Index in the underlying series of the first visible point.
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// Index in the underlying series of the last visible point.
    pub fn end_index(&self) -> usize {
        self.end
    }

    pub fn latest(&self) -> &PricePoint {
        &self.series.points[self.end]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.iter().map(|p| p.close).collect()
    }
}

impl Deref for VisiblePrefix {
    type Target = [PricePoint];

    fn deref(&self) -> &[PricePoint] {
        &self.series.points[self.start..=self.end]
    }
}
