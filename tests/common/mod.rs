#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use replaytrader::domain::error::ReplayError;
use replaytrader::domain::price::{PricePoint, Series};
use replaytrader::domain::session::{Session, SessionConfig};
use replaytrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// In-memory data port keyed by path.
pub struct MockDataPort {
    pub series: HashMap<PathBuf, Series>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            series: HashMap::new(),
        }
    }

    pub fn with_series(mut self, path: &str, series: Series) -> Self {
        self.series.insert(PathBuf::from(path), series);
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(&self, path: &Path) -> Result<Series, ReplayError> {
        self.series
            .get(path)
            .cloned()
            .ok_or_else(|| ReplayError::Data {
                reason: format!("no series for {}", path.display()),
            })
    }
}

/// t0 = 2024-11-12 07:00, one point every 15 minutes.
pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 12)
        .unwrap()
        .and_hms_opt(7, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(15 * i as i64)
}

pub fn make_points(closes: &[f64]) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::new(ts(i), close))
        .collect()
}

pub fn make_series(closes: &[f64]) -> Series {
    Series::new(make_points(closes)).unwrap()
}

/// Smooth oscillation with enough swing to produce peaks and valleys.
pub fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 1.0800 + 0.0050 * (i as f64 * 0.3).sin() + 0.00005 * i as f64)
        .collect()
}

pub fn manual_config() -> SessionConfig {
    SessionConfig {
        auto_trade: false,
        ..SessionConfig::default()
    }
}

pub fn manual_session(closes: &[f64]) -> Session {
    Session::with_default_policy(make_series(closes), manual_config()).unwrap()
}

pub fn write_temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn prices_csv(closes: &[f64]) -> String {
    let mut csv = String::from("time,close\n");
    for (i, close) in closes.iter().enumerate() {
        csv.push_str(&format!("{},{}\n", ts(i).format("%Y-%m-%d %H:%M"), close));
    }
    csv
}
