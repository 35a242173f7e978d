//! Catalog introspection
//!
//! Reads the store's self-describing metadata: table names, column
//! definitions in declared order, and row counts. Callers re-read the catalog
//! at the start of every operation; nothing here is cached.

use super::{open_connection, quote_ident};
use crate::error::{Error, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// One column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    /// Position within the table (0-based, catalog order)
    pub ordinal: i64,
    /// Column name (case-sensitive)
    pub name: String,
    /// Declared type, as written in the table definition
    pub decl_type: String,
}

/// One table with its columns and row count.
#[derive(Debug, Clone, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
}

/// List user tables, in name order. Internal `sqlite_*` tables are excluded.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;

    let tables = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(tables)
}

/// Columns of `table` in catalog order.
///
/// The catalog is read fresh on every call. A table unknown to the catalog
/// reports zero columns, which is how `TableNotFound` is detected (a real
/// table always has at least one).
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt =
        conn.prepare("SELECT cid, name, type FROM pragma_table_info(?1) ORDER BY cid")?;

    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo {
                ordinal: row.get(0)?,
                name: row.get(1)?,
                decl_type: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if columns.is_empty() {
        return Err(Error::TableNotFound(table.to_string()));
    }

    Ok(columns)
}

/// Row count of `table`.
pub fn table_row_count(conn: &Connection, table: &str) -> Result<i64> {
    // Existence check first, so a missing table reports TableNotFound rather
    // than a store syntax error.
    table_columns(conn, table)?;

    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Full overview of a database file: every user table with columns and row
/// count.
pub fn inspect(db_path: &Path) -> Result<Vec<TableInfo>> {
    let conn = open_connection(db_path)?;

    let mut tables = Vec::new();
    for name in list_tables(&conn)? {
        let columns = table_columns(&conn, &name)?;
        let row_count = table_row_count(&conn, &name)?;
        tables.push(TableInfo {
            name,
            columns,
            row_count,
        });
    }

    tracing::debug!(
        path = %db_path.display(),
        tables = tables.len(),
        "Inspected database"
    );

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE daily_reports (
                date         TEXT,
                account_name TEXT,
                equity       REAL,
                deposit      REAL
            );
            CREATE TABLE trades (id INTEGER PRIMARY KEY, pair TEXT);
            INSERT INTO daily_reports VALUES ('2024-01-01', 'a', 100.0, 50.0);
            INSERT INTO daily_reports VALUES ('2024-01-02', 'b', 200.0, 0.0);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_list_tables() {
        let conn = sample_conn();
        let tables = list_tables(&conn).unwrap();
        assert_eq!(tables, vec!["daily_reports", "trades"]);
    }

    #[test]
    fn test_list_tables_excludes_internal() {
        let conn = sample_conn();
        // AUTOINCREMENT forces the internal sqlite_sequence table into being
        conn.execute_batch("CREATE TABLE seq (id INTEGER PRIMARY KEY AUTOINCREMENT)")
            .unwrap();
        let tables = list_tables(&conn).unwrap();
        assert!(!tables.iter().any(|t| t.starts_with("sqlite_")));
        assert!(tables.contains(&"seq".to_string()));
    }

    #[test]
    fn test_table_columns_order() {
        let conn = sample_conn();
        let columns = table_columns(&conn, "daily_reports").unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["date", "account_name", "equity", "deposit"]);
        assert_eq!(columns[0].ordinal, 0);
        assert_eq!(columns[2].decl_type, "REAL");
    }

    #[test]
    fn test_table_columns_missing_table() {
        let conn = sample_conn();
        let err = table_columns(&conn, "nope").unwrap_err();
        assert!(matches!(err, Error::TableNotFound(t) if t == "nope"));
    }

    #[test]
    fn test_table_columns_case_sensitive_names() {
        let conn = sample_conn();
        let columns = table_columns(&conn, "daily_reports").unwrap();
        assert!(columns.iter().any(|c| c.name == "equity"));
        assert!(!columns.iter().any(|c| c.name == "Equity"));
    }

    #[test]
    fn test_row_count() {
        let conn = sample_conn();
        assert_eq!(table_row_count(&conn, "daily_reports").unwrap(), 2);
        assert_eq!(table_row_count(&conn, "trades").unwrap(), 0);
        assert!(table_row_count(&conn, "nope").is_err());
    }
}
