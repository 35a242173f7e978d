//! Error types for sqlkeeper-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the sqlkeeper-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Store-level error (I/O inside the engine, lock, corruption, syntax)
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Table missing from the catalog
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Column missing from a table's current columns
    #[error("column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Removing a table's only column would leave a zero-column table
    #[error("cannot remove '{column}': it is the only column of table '{table}'")]
    LastColumn { table: String, column: String },

    /// Row editor: a row with this natural key already exists
    #[error("row already exists in '{table}' for date {date}, account {account}")]
    DuplicateRow {
        table: String,
        date: String,
        account: String,
    },

    /// Row editor: no row with this natural key
    #[error("no row found in '{table}' for date {date}, account {account}")]
    RowNotFound {
        table: String,
        date: String,
        account: String,
    },

    /// Checkpoint could not complete because the log is locked
    #[error("checkpoint incomplete for {path}: write-ahead log locked by another connection")]
    CheckpointBusy { path: PathBuf },

    /// Sweep root unreadable or not a directory
    #[error("cannot traverse {root}: {message}")]
    Traversal { root: PathBuf, message: String },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for sqlkeeper-core
pub type Result<T> = std::result::Result<T, Error>;
