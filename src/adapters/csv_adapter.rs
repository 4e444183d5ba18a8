//! CSV file data adapter.
//!
//! Expects a header row. Columns are matched by name, case-insensitively:
//! a time column (`time`, `timestamp` or `date`), a close column (`close` or
//! `mid_c`) and optionally `high`/`mid_h` and `low`/`mid_l`. Other columns
//! are ignored.

use crate::domain::error::ReplayError;
use crate::domain::price::{parse_timestamp, PricePoint, Series};
use crate::ports::data_port::DataPort;
use std::fs;
use std::path::Path;

const TIME_COLUMNS: [&str; 3] = ["time", "timestamp", "date"];
const CLOSE_COLUMNS: [&str; 2] = ["close", "mid_c"];
const HIGH_COLUMNS: [&str; 2] = ["high", "mid_h"];
const LOW_COLUMNS: [&str; 2] = ["low", "mid_l"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvAdapter;

impl CsvAdapter {
    pub fn new() -> Self {
        CsvAdapter
    }
}

struct Columns {
    time: usize,
    close: usize,
    high: Option<usize>,
    low: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ReplayError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let time = find(&TIME_COLUMNS).ok_or_else(|| ReplayError::Data {
            reason: "missing time column".into(),
        })?;
        let close = find(&CLOSE_COLUMNS).ok_or_else(|| ReplayError::Data {
            reason: "missing close column".into(),
        })?;

        Ok(Columns {
            time,
            close,
            high: find(&HIGH_COLUMNS),
            low: find(&LOW_COLUMNS),
        })
    }
}

fn parse_price(
    record: &csv::StringRecord,
    column: usize,
    name: &str,
    line: u64,
) -> Result<f64, ReplayError> {
    let raw = record.get(column).ok_or_else(|| ReplayError::Data {
        reason: format!("line {}: missing {} value", line, name),
    })?;
    raw.trim().parse().map_err(|e| ReplayError::Data {
        reason: format!("line {}: invalid {} value {:?}: {}", line, name, raw, e),
    })
}

fn parse_optional_price(
    record: &csv::StringRecord,
    column: Option<usize>,
    name: &str,
    line: u64,
) -> Result<Option<f64>, ReplayError> {
    match column {
        Some(c) if record.get(c).is_some_and(|v| !v.trim().is_empty()) => {
            parse_price(record, c, name, line).map(Some)
        }
        _ => Ok(None),
    }
}

impl DataPort for CsvAdapter {
    fn load_series(&self, path: &Path) -> Result<Series, ReplayError> {
        let content = fs::read_to_string(path).map_err(|e| ReplayError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().map_err(|e| ReplayError::Data {
            reason: format!("CSV header error: {}", e),
        })?;
        let columns = Columns::from_headers(headers)?;
        let mut points = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| ReplayError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;
            let line = record.position().map_or(0, |p| p.line());

            let time_str = record.get(columns.time).ok_or_else(|| ReplayError::Data {
                reason: format!("line {}: missing time value", line),
            })?;
            let timestamp = parse_timestamp(time_str).ok_or_else(|| ReplayError::Data {
                reason: format!("line {}: invalid time format {:?}", line, time_str),
            })?;

            points.push(PricePoint {
                timestamp,
                close: parse_price(&record, columns.close, "close", line)?,
                high: parse_optional_price(&record, columns.high, "high", line)?,
                low: parse_optional_price(&record, columns.low, "low", line)?,
            });
        }

        points.sort_by_key(|p| p.timestamp);
        tracing::info!(path = %path.display(), points = points.len(), "loaded price series");
        Series::new(points)
    }
}
