//! Database layer for sqlkeeper
//!
//! This module provides:
//! - Connection lifecycle (one scoped connection per operation)
//! - Catalog introspection (tables, columns, row counts)
//! - Transactional schema mutation (column removal)
//! - Natural-key row editing
//!
//! Every operation opens its own connection, does its work, and releases the
//! handle on every exit path. Nothing here keeps a connection alive between
//! calls.

pub mod catalog;
pub mod rows;
pub mod schema;

pub use catalog::{ColumnInfo, TableInfo};
pub use rows::{RowEdit, RowValues};

use crate::error::Result;
use rusqlite::{Connection, OpenFlags};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// How long a connection waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a connection to an existing database file.
///
/// Does not create the file: maintenance on a mistyped path must fail rather
/// than leave an empty database behind. The connection waits up to
/// [`BUSY_TIMEOUT`] on locks held by other processes.
pub fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Quote an identifier for splicing into DDL/DML.
///
/// Table and column names come from the catalog or from user arguments and
/// cannot be bound as statement parameters.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// An owned cell value, as read back from a row.
///
/// This is the shape the row editor reports rows in; it converts from the
/// store's dynamic value type and serializes naturally to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<rusqlite::types::Value> for CellValue {
    fn from(value: rusqlite::types::Value) -> Self {
        use rusqlite::types::Value;
        match value {
            Value::Null => CellValue::Null,
            Value::Integer(i) => CellValue::Integer(i),
            Value::Real(r) => CellValue::Real(r),
            Value::Text(s) => CellValue::Text(s),
            Value::Blob(b) => CellValue::Blob(b),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
        }
    }
}
