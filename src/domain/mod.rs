//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod playback;
pub mod policy;
pub mod position;
pub mod price;
pub mod session;
pub mod simulator;
pub mod summary;
