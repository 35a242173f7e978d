//! # sqlkeeper-core
//!
//! Core library for sqlkeeper - maintenance toolkit for the SQLite files
//! behind a trading/reporting system.
//!
//! This library provides:
//! - Transactional schema mutation (column removal via copy-drop-rename)
//! - Fault-isolated write-ahead-log checkpointing across a directory tree
//! - Catalog introspection (tables, columns, row counts)
//! - Natural-key row editing for the reporting tables
//! - Configuration management and logging infrastructure
//!
//! Every operation opens its own scoped connection and releases it on every
//! exit path; no state is shared between invocations.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlkeeper_core::{fleet::Checkpointer, Config};
//! use std::path::Path;
//!
//! let config = Config::load().expect("failed to load config");
//! let sweep = Checkpointer::new(&config.fleet);
//! let summary = sweep.sweep(Path::new("db/")).expect("sweep failed");
//! println!("{} checkpointed, {} failed", summary.succeeded, summary.failed);
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::{CellValue, ColumnInfo, RowEdit, TableInfo};
pub use error::{Error, Result};
pub use fleet::{Checkpointer, MaintenanceOutcome, MaintenanceResult, SweepSummary};

// Public modules
pub mod config;
pub mod db;
pub mod error;
pub mod fleet;
pub mod logging;
