//! Trade ledger export port trait.

use crate::domain::error::ReplayError;
use crate::domain::position::TradeRecord;
use std::path::Path;

/// Port for writing the closed-trade ledger somewhere outside the session.
pub trait LedgerExportPort {
    /// Returns `Ok(false)` without writing anything when `ledger` is empty.
    fn export(&self, ledger: &[TradeRecord], path: &Path) -> Result<bool, ReplayError>;
}
