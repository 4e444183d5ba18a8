//! Data access port trait.

use crate::domain::error::ReplayError;
use crate::domain::price::Series;
use std::path::Path;

pub trait DataPort {
    /// Load a full, time-ordered series.
    fn load_series(&self, path: &Path) -> Result<Series, ReplayError>;
}
