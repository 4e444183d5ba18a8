//! CSV export of the closed-trade ledger.

use crate::domain::error::ReplayError;
use crate::domain::position::TradeRecord;
use crate::ports::ledger_export_port::LedgerExportPort;
use serde::Serialize;
use std::path::Path;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLedgerAdapter;

impl CsvLedgerAdapter {
    pub fn new() -> Self {
        CsvLedgerAdapter
    }
}

#[derive(Serialize)]
struct LedgerRow {
    direction: &'static str,
    entry_time: String,
    entry_price: f64,
    exit_time: String,
    exit_price: f64,
    profit: f64,
}

impl From<&TradeRecord> for LedgerRow {
    fn from(record: &TradeRecord) -> Self {
        LedgerRow {
            direction: record.direction.trade_type(),
            entry_time: record.entry_time.format(TIME_FORMAT).to_string(),
            entry_price: record.entry_price,
            exit_time: record.exit_time.format(TIME_FORMAT).to_string(),
            exit_price: record.exit_price,
            profit: record.profit,
        }
    }
}

fn export_error(path: &Path, err: impl std::fmt::Display) -> ReplayError {
    ReplayError::Export {
        reason: format!("failed to write {}: {}", path.display(), err),
    }
}

impl LedgerExportPort for CsvLedgerAdapter {
    fn export(&self, ledger: &[TradeRecord], path: &Path) -> Result<bool, ReplayError> {
        if ledger.is_empty() {
            tracing::info!("ledger is empty, nothing exported");
            return Ok(false);
        }

        let mut wtr = csv::Writer::from_path(path).map_err(|e| export_error(path, e))?;
        for record in ledger {
            wtr.serialize(LedgerRow::from(record))
                .map_err(|e| export_error(path, e))?;
        }
        wtr.flush().map_err(|e| export_error(path, e))?;

        tracing::info!(path = %path.display(), trades = ledger.len(), "ledger exported");
        Ok(true)
    }
}
