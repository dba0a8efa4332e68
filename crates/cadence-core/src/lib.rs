//! Cadence Core Library
//!
//! Shared functionality for the Cadence recurring spending detector:
//! - Database access and migrations
//! - CSV import of spending spreadsheets
//! - Recurring pattern detection and reconciliation
//! - Single-flight detection trigger
//! - Layered configuration

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod recurring;
pub mod trigger;

/// Shared test fixtures
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{AppConfig, DetectionConfig};
pub use db::{Database, ReconcileStats, RunTrigger, TransactionFilter};
pub use error::{Error, Result};
pub use import::{parse_csv, ParsedImport};
pub use recurring::{detect_candidates, DetectionResults, RecurringDetector};
pub use trigger::DetectionTrigger;
