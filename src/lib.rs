//! Harvest time balance library
//!
//! This library fetches tracked time entries from Harvest (or a local cache),
//! balances them against a contract quota that may change over time, and
//! reports the resulting over- or undertime.

pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use error::{BalanceError, Result};
pub use service::{BalanceConfig, BalanceService, EntrySource, HarvestCredentials};

// Re-export key types for convenience
pub use helpers::quota::QuotaSchedule;
pub use helpers::reconcile::WorkingHours;
pub use models::harvest::TimeEntry;
pub use models::report::{BalanceReport, Mode, Reconciliation};
